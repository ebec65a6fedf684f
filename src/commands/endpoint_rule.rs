//! Delivery rules on a classic CDN endpoint

use anyhow::{Context as _, Result};
use serde_json::{json, Value};
use tracing::debug;

use super::{properties, report, set_properties, Context};
use crate::arm::{not_found_as, update_resource, ResourceStore};
use crate::cli::{EndpointRuleAction, EndpointRuleCommand};
use crate::error::CdnError;
use crate::output::Output;
use crate::rules::{
    build_action, build_condition, Action, Condition, DeliveryPolicy, EditOutcome, ResourceScope,
};

pub async fn run(cmd: EndpointRuleCommand, ctx: &Context<'_>, out: &Output) -> Result<()> {
    match cmd.action {
        EndpointRuleAction::Add {
            target,
            rule_name,
            order,
            match_variable,
            condition,
            action,
        } => {
            let scope = ctx.endpoint_scope(&target);
            let condition = match match_variable {
                Some(variable) => Some(build_condition(&condition.to_spec(&variable))?),
                None => None,
            };
            let action = build_action(&action.action_name, &(&action).into(), &scope)?;

            out.log(
                "info",
                &format!("Adding rule to endpoint {}", target.endpoint_name),
            );
            let policy = add(ctx.store, &scope, rule_name, order, condition, action).await?;
            out.result(json!({
                "success": true,
                "endpoint": target.endpoint_name,
                "deliveryPolicy": policy
            }));
        }

        EndpointRuleAction::Remove {
            target,
            rule_name,
            order,
        } => {
            let scope = ctx.endpoint_scope(&target);
            let (policy, outcome) =
                edit_policy(ctx.store, &scope, |p| p.remove_rule(rule_name.as_deref(), order))
                    .await?;
            finish(&target.endpoint_name, policy, &outcome, out);
        }

        EndpointRuleAction::Show { target } => {
            let scope = ctx.endpoint_scope(&target);
            let policy = show(ctx.store, &scope).await?;
            out.result(json!({
                "endpoint": target.endpoint_name,
                "deliveryPolicy": policy
            }));
        }

        EndpointRuleAction::ConditionAdd {
            target,
            rule_name,
            match_variable,
            condition,
        } => {
            let scope = ctx.endpoint_scope(&target);
            let condition = build_condition(&condition.to_spec(&match_variable))?;
            let (policy, outcome) = edit_policy(ctx.store, &scope, |p| {
                Ok(p.add_condition(&rule_name, condition))
            })
            .await?;
            finish(&target.endpoint_name, policy, &outcome, out);
        }

        EndpointRuleAction::ConditionRemove {
            target,
            rule_name,
            index,
        } => {
            let scope = ctx.endpoint_scope(&target);
            let (policy, outcome) = edit_policy(ctx.store, &scope, |p| {
                Ok(p.remove_condition(&rule_name, index))
            })
            .await?;
            finish(&target.endpoint_name, policy, &outcome, out);
        }

        EndpointRuleAction::ActionAdd {
            target,
            rule_name,
            action,
        } => {
            let scope = ctx.endpoint_scope(&target);
            let action = build_action(&action.action_name, &(&action).into(), &scope)?;
            let (policy, outcome) =
                edit_policy(ctx.store, &scope, |p| Ok(p.add_action(&rule_name, action))).await?;
            finish(&target.endpoint_name, policy, &outcome, out);
        }

        EndpointRuleAction::ActionRemove {
            target,
            rule_name,
            index,
        } => {
            let scope = ctx.endpoint_scope(&target);
            let (policy, outcome) = edit_policy(ctx.store, &scope, |p| {
                Ok(p.remove_action(&rule_name, index))
            })
            .await?;
            finish(&target.endpoint_name, policy, &outcome, out);
        }
    }

    Ok(())
}

fn finish(endpoint: &str, policy: DeliveryPolicy, outcome: &EditOutcome, out: &Output) {
    let applied = report(outcome, out);
    out.result(json!({
        "success": true,
        "applied": applied,
        "endpoint": endpoint,
        "deliveryPolicy": policy
    }));
}

fn endpoint_id(scope: &ResourceScope) -> Result<String> {
    scope
        .endpoint_path()
        .context("endpoint name is required for delivery rule commands")
}

/// Add a rule; rule names are mandatory unless the profile runs on a partner SKU
pub async fn add(
    store: &dyn ResourceStore,
    scope: &ResourceScope,
    rule_name: Option<String>,
    order: i32,
    condition: Option<Condition>,
    action: Action,
) -> Result<DeliveryPolicy> {
    let profile = store
        .get(&scope.profile_path())
        .await
        .map_err(|e| not_found_as(e.into(), "Profile"))?;
    let sku = profile
        .pointer("/sku/name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    debug!(sku = %sku, "profile sku");

    let (policy, _) = edit_policy(store, scope, |policy| {
        policy.add_rule(&sku, rule_name, order, condition, action)?;
        Ok(EditOutcome::Applied)
    })
    .await?;
    Ok(policy)
}

pub async fn show(store: &dyn ResourceStore, scope: &ResourceScope) -> Result<DeliveryPolicy> {
    let id = endpoint_id(scope)?;
    let endpoint = store
        .get(&id)
        .await
        .map_err(|e| not_found_as(e.into(), "Endpoint"))?;
    Ok(DeliveryPolicy::from_existing(
        properties(&endpoint).get("deliveryPolicy"),
        scope,
    )?)
}

/// Read the endpoint's policy, apply `edit`, and write the endpoint back
pub async fn edit_policy<F>(
    store: &dyn ResourceStore,
    scope: &ResourceScope,
    edit: F,
) -> Result<(DeliveryPolicy, EditOutcome)>
where
    F: FnOnce(&mut DeliveryPolicy) -> Result<EditOutcome, CdnError>,
{
    let id = endpoint_id(scope)?;
    let (_, result) = update_resource(store, &id, |endpoint| {
        let mut policy =
            DeliveryPolicy::from_existing(properties(endpoint).get("deliveryPolicy"), scope)?;
        let outcome = edit(&mut policy)?;
        set_properties(endpoint, json!({ "deliveryPolicy": policy }))?;
        Ok((policy, outcome))
    })
    .await
    .map_err(|e| not_found_as(e, "Endpoint"))?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::LocalStore;
    use crate::rules::{ActionArgs, ConditionSpec};

    fn scope() -> ResourceScope {
        ResourceScope::profile("sub1", "rg1", "prof1").with_endpoint("ep1")
    }

    fn store_with(sku: &str, endpoint: Value) -> LocalStore {
        let store = LocalStore::in_memory();
        let scope = scope();
        store.insert(&scope.profile_path(), json!({"sku": {"name": sku}}));
        store.insert(&scope.endpoint_path().unwrap(), endpoint);
        store
    }

    fn cache_action() -> Action {
        let args = ActionArgs {
            cache_behavior: Some("Override".into()),
            cache_duration: Some("01:00:00".into()),
            ..Default::default()
        };
        build_action("CacheExpiration", &args, &scope()).unwrap()
    }

    fn scheme_condition() -> Condition {
        build_condition(&ConditionSpec {
            match_variable: "RequestScheme".into(),
            match_values: Some(vec!["HTTPS".into()]),
            ..Default::default()
        })
        .unwrap()
    }

    async fn stored_policy(store: &LocalStore) -> Value {
        let endpoint = store.get(&scope().endpoint_path().unwrap()).await.unwrap();
        endpoint["properties"]["deliveryPolicy"].clone()
    }

    #[tokio::test]
    async fn add_creates_policy_and_keeps_other_properties() {
        let store = store_with(
            "Standard_Microsoft",
            json!({"location": "global", "properties": {"originHostHeader": "www.contoso.com"}}),
        );

        let policy = add(
            &store,
            &scope(),
            Some("r1".into()),
            1,
            Some(scheme_condition()),
            cache_action(),
        )
        .await
        .unwrap();
        assert_eq!(policy.rules.len(), 1);

        let endpoint = store.get(&scope().endpoint_path().unwrap()).await.unwrap();
        assert_eq!(endpoint["properties"]["originHostHeader"], "www.contoso.com");
        let stored = &endpoint["properties"]["deliveryPolicy"];
        assert_eq!(stored["description"], "delivery_policy");
        assert_eq!(stored["rules"][0]["name"], "r1");
        assert_eq!(stored["rules"][0]["conditions"][0]["name"], "RequestScheme");
        assert_eq!(stored["rules"][0]["actions"][0]["name"], "CacheExpiration");
    }

    #[tokio::test]
    async fn microsoft_sku_requires_rule_name() {
        let store = store_with("Standard_Microsoft", json!({"properties": {}}));
        let err = add(&store, &scope(), None, 1, None, cache_action())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CdnError>(),
            Some(CdnError::RuleNameRequired)
        ));
        assert!(stored_policy(&store).await.is_null());
    }

    #[tokio::test]
    async fn partner_sku_allows_unnamed_rules() {
        let store = store_with("Standard_Verizon", json!({"properties": {}}));
        add(&store, &scope(), None, 1, None, cache_action())
            .await
            .unwrap();
        let stored = stored_policy(&store).await;
        assert!(stored["rules"][0].get("name").is_none());
    }

    #[tokio::test]
    async fn missing_endpoint_is_reported_by_name() {
        let store = LocalStore::in_memory();
        let err = show(&store, &scope()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "Endpoint not found. Please verify the resource(s) exist: {}",
                scope().endpoint_path().unwrap()
            )
        );
    }

    #[tokio::test]
    async fn remove_by_order_renumbers_later_rules() {
        let store = store_with("Standard_Microsoft", json!({"properties": {}}));
        for (name, order) in [("r1", 1), ("r2", 2), ("r3", 3)] {
            add(&store, &scope(), Some(name.into()), order, None, cache_action())
                .await
                .unwrap();
        }

        let (policy, outcome) = edit_policy(&store, &scope(), |p| p.remove_rule(None, Some(2)))
            .await
            .unwrap();
        assert!(outcome.is_applied());
        let orders: Vec<_> = policy
            .rules
            .iter()
            .map(|r| (r.name.clone().unwrap(), r.order))
            .collect();
        assert_eq!(orders, vec![("r1".to_string(), 1), ("r3".to_string(), 2)]);
    }

    #[tokio::test]
    async fn removing_the_last_condition_is_skipped() {
        let store = store_with("Standard_Microsoft", json!({"properties": {}}));
        add(
            &store,
            &scope(),
            Some("r1".into()),
            1,
            Some(scheme_condition()),
            cache_action(),
        )
        .await
        .unwrap();

        let (policy, outcome) =
            edit_policy(&store, &scope(), |p| Ok(p.remove_condition("r1", 0)))
                .await
                .unwrap();
        assert!(!outcome.is_applied());
        assert_eq!(policy.rules[0].conditions.len(), 1);
    }

    #[tokio::test]
    async fn legacy_conditions_are_rewritten_in_unified_form() {
        let store = store_with(
            "Standard_Microsoft",
            json!({"properties": {"deliveryPolicy": {
                "description": "legacy",
                "rules": [{
                    "name": "r1",
                    "order": 1,
                    "conditions": [{
                        "name": "UrlPath",
                        "parameters": {
                            "typeName": "DeliveryRuleUrlPathConditionParameters",
                            "matchType": "Wildcard",
                            "path": "/images/*"
                        }
                    }],
                    "actions": [{
                        "name": "CacheExpiration",
                        "parameters": {
                            "typeName": "DeliveryRuleCacheExpirationActionParameters",
                            "cacheBehavior": "BypassCache",
                            "cacheType": "All"
                        }
                    }]
                }]
            }}}),
        );

        edit_policy(&store, &scope(), |p| Ok(p.add_action("r1", cache_action())))
            .await
            .unwrap();

        let stored = stored_policy(&store).await;
        assert_eq!(stored["description"], "legacy");
        let condition = &stored["rules"][0]["conditions"][0]["parameters"];
        assert_eq!(condition["operator"], "Wildcard");
        assert_eq!(condition["matchValues"], json!(["/images/*"]));
        assert_eq!(stored["rules"][0]["actions"].as_array().unwrap().len(), 2);
    }
}
