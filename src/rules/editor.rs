//! Rule collection edits: classic endpoint delivery policies and Front Door rules

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::action::{actions_from_existing, Action};
use super::condition::{conditions_from_existing, Condition};
use super::resource_id::ResourceScope;
use crate::error::CdnError;

/// SKUs whose rules may be unnamed
const PARTNER_SKUS: [&str; 4] = [
    "Premium_Verizon",
    "Custom_Verizon",
    "Standard_Akamai",
    "Standard_Verizon",
];

const DEFAULT_POLICY_DESCRIPTION: &str = "delivery_policy";
const RULE_NOT_FOUND: &str =
    "rule cannot be found. This command will be skipped. Please check the rule name";

pub fn is_partner_sku(sku: &str) -> bool {
    PARTNER_SKUS.contains(&sku)
}

/// Result of a lenient edit: a bad index or missing rule is not an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    Skipped(String),
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied)
    }
}

/// Pop `index` only if the list keeps at least one entry.
pub fn remove_at<T>(items: &mut Vec<T>, index: usize, kind: &str) -> EditOutcome {
    if items.len() > 1 && index < items.len() {
        items.remove(index);
        EditOutcome::Applied
    } else {
        EditOutcome::Skipped(format!(
            "Invalid {} index found. This command will be skipped. Please check the rule.",
            kind
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub order: i32,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryPolicy {
    pub description: String,
    pub rules: Vec<DeliveryRule>,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            description: DEFAULT_POLICY_DESCRIPTION.to_string(),
            rules: Vec::new(),
        }
    }
}

impl DeliveryPolicy {
    /// Rehydrate a stored `deliveryPolicy` object; `None`/null gives an empty policy.
    pub fn from_existing(value: Option<&Value>, scope: &ResourceScope) -> Result<Self, CdnError> {
        let Some(policy) = value.filter(|v| !v.is_null()) else {
            return Ok(DeliveryPolicy::default());
        };

        let description = policy
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_POLICY_DESCRIPTION)
            .to_string();

        let mut rules = Vec::new();
        for rule in policy
            .get("rules")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            rules.push(DeliveryRule {
                name: rule.get("name").and_then(Value::as_str).map(String::from),
                order: read_order(rule)?,
                conditions: conditions_from_existing(list_field(rule, "conditions"))?,
                actions: actions_from_existing(list_field(rule, "actions"), scope)?,
            });
        }

        debug!(rules = rules.len(), "rehydrated delivery policy");
        Ok(DeliveryPolicy { description, rules })
    }

    pub fn add_rule(
        &mut self,
        sku: &str,
        rule_name: Option<String>,
        order: i32,
        condition: Option<Condition>,
        action: Action,
    ) -> Result<(), CdnError> {
        if rule_name.is_none() && !is_partner_sku(sku) {
            return Err(CdnError::RuleNameRequired);
        }

        self.rules.push(DeliveryRule {
            name: rule_name,
            order,
            conditions: condition.into_iter().collect(),
            actions: vec![action],
        });
        Ok(())
    }

    /// Append to every rule named `rule_name`
    pub fn add_condition(&mut self, rule_name: &str, condition: Condition) -> EditOutcome {
        let mut touched = false;
        for rule in self.rules_named(rule_name) {
            rule.conditions.push(condition.clone());
            touched = true;
        }
        outcome(touched)
    }

    pub fn add_action(&mut self, rule_name: &str, action: Action) -> EditOutcome {
        let mut touched = false;
        for rule in self.rules_named(rule_name) {
            rule.actions.push(action.clone());
            touched = true;
        }
        outcome(touched)
    }

    /// Remove from every rule named `rule_name`, like the adds
    pub fn remove_condition(&mut self, rule_name: &str, index: usize) -> EditOutcome {
        let outcomes: Vec<_> = self
            .rules_named(rule_name)
            .map(|rule| remove_at(&mut rule.conditions, index, "condition"))
            .collect();
        combine(outcomes)
    }

    pub fn remove_action(&mut self, rule_name: &str, index: usize) -> EditOutcome {
        let outcomes: Vec<_> = self
            .rules_named(rule_name)
            .map(|rule| remove_at(&mut rule.actions, index, "action"))
            .collect();
        combine(outcomes)
    }

    /// Remove the first rule matching the name or the order.
    ///
    /// Rules ordered after the removed one move down by one so orders stay
    /// consecutive, unless the removed rule had order 0.
    pub fn remove_rule(
        &mut self,
        rule_name: Option<&str>,
        order: Option<i32>,
    ) -> Result<EditOutcome, CdnError> {
        if rule_name.is_none() && order.is_none() {
            return Err(CdnError::RuleSelectorRequired);
        }
        if order.is_some_and(|o| o < 0) {
            return Err(CdnError::NegativeOrder);
        }

        let position = self.rules.iter().position(|rule| {
            (rule_name.is_some() && rule.name.as_deref() == rule_name)
                || (order.is_some() && Some(rule.order) == order)
        });

        let Some(index) = position else {
            return Ok(EditOutcome::Skipped(RULE_NOT_FOUND.to_string()));
        };

        let removed = self.rules.remove(index);
        for rule in &mut self.rules {
            if rule.order > removed.order && removed.order != 0 {
                rule.order -= 1;
            }
        }
        debug!(order = removed.order, "removed delivery rule");
        Ok(EditOutcome::Applied)
    }

    fn rules_named<'a>(&'a mut self, rule_name: &'a str) -> impl Iterator<Item = &'a mut DeliveryRule> {
        self.rules
            .iter_mut()
            .filter(move |r| r.name.as_deref() == Some(rule_name))
    }
}

fn outcome(touched: bool) -> EditOutcome {
    if touched {
        EditOutcome::Applied
    } else {
        EditOutcome::Skipped(RULE_NOT_FOUND.to_string())
    }
}

/// Applied if any rule was edited, otherwise the first skip reason
fn combine(outcomes: Vec<EditOutcome>) -> EditOutcome {
    if outcomes.iter().any(EditOutcome::is_applied) {
        return EditOutcome::Applied;
    }
    outcomes
        .into_iter()
        .next()
        .unwrap_or_else(|| EditOutcome::Skipped(RULE_NOT_FOUND.to_string()))
}

fn list_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn read_order(rule: &Value) -> Result<i32, CdnError> {
    rule.get("order")
        .and_then(Value::as_i64)
        .and_then(|o| i32::try_from(o).ok())
        .ok_or_else(|| CdnError::InvalidArgument("stored rule has no valid order".to_string()))
}

/// Front Door rule (the `properties` of a rule-set rule resource)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AfdRule {
    pub order: i32,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_processing_behavior: Option<String>,
}

impl AfdRule {
    pub fn new(
        order: i32,
        condition: Option<Condition>,
        action: Action,
        match_processing_behavior: Option<String>,
    ) -> Self {
        Self {
            order,
            conditions: condition.into_iter().collect(),
            actions: vec![action],
            match_processing_behavior,
        }
    }

    /// Rehydrate from the `properties` object of a stored rule
    pub fn from_existing(properties: &Value, scope: &ResourceScope) -> Result<Self, CdnError> {
        Ok(Self {
            order: read_order(properties)?,
            conditions: conditions_from_existing(list_field(properties, "conditions"))?,
            actions: actions_from_existing(list_field(properties, "actions"), scope)?,
            match_processing_behavior: properties
                .get("matchProcessingBehavior")
                .and_then(Value::as_str)
                .map(String::from),
        })
    }

    pub fn remove_condition(&mut self, index: usize) -> EditOutcome {
        remove_at(&mut self.conditions, index, "condition")
    }

    pub fn remove_action(&mut self, index: usize) -> EditOutcome {
        remove_at(&mut self.actions, index, "action")
    }
}
