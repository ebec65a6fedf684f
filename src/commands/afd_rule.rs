//! Rules inside a Front Door rule set

use anyhow::Result;
use serde_json::{json, Value};

use super::{properties, report, set_properties, Context};
use crate::arm::{not_found_as, update_resource, ResourceStore};
use crate::cli::{AfdRuleAction, AfdRuleCommand, RuleArgs};
use crate::output::Output;
use crate::rules::{build_action, build_condition, AfdRule, EditOutcome, ResourceScope};

pub async fn run(cmd: AfdRuleCommand, ctx: &Context<'_>, out: &Output) -> Result<()> {
    match cmd.action {
        AfdRuleAction::Create {
            target,
            order,
            match_processing_behavior,
            match_variable,
            condition,
            action,
        } => {
            let scope = ctx.profile_scope(&target.profile);
            let condition = match match_variable {
                Some(variable) => Some(build_condition(&condition.to_spec(&variable))?),
                None => None,
            };
            let action = build_action(&action.action_name, &(&action).into(), &scope)?;
            let rule = AfdRule::new(order, condition, action, match_processing_behavior);

            out.log("info", &format!("Creating rule {}", target.rule_name));
            let stored = create(ctx.store, &rule_id(&scope, &target), &rule).await?;
            out.result(json!({"success": true, "rule": stored}));
        }

        AfdRuleAction::Delete { target } => {
            let scope = ctx.profile_scope(&target.profile);
            ctx.store
                .delete(&rule_id(&scope, &target))
                .await
                .map_err(|e| not_found_as(e.into(), "Rule"))?;
            out.result(json!({"success": true, "deleted": target.rule_name}));
        }

        AfdRuleAction::Show { target } => {
            let scope = ctx.profile_scope(&target.profile);
            let rule = fetch(ctx.store, &scope, &target).await?;
            out.result(json!({"name": target.rule_name, "properties": rule}));
        }

        AfdRuleAction::ConditionAdd {
            target,
            match_variable,
            condition,
        } => {
            let scope = ctx.profile_scope(&target.profile);
            let condition = build_condition(&condition.to_spec(&match_variable))?;
            let (rule, outcome) = edit_rule(ctx.store, &scope, &target, |rule| {
                rule.conditions.push(condition);
                EditOutcome::Applied
            })
            .await?;
            finish(&target, rule, &outcome, out);
        }

        AfdRuleAction::ConditionRemove { target, index } => {
            let scope = ctx.profile_scope(&target.profile);
            let (rule, outcome) =
                edit_rule(ctx.store, &scope, &target, |rule| rule.remove_condition(index)).await?;
            finish(&target, rule, &outcome, out);
        }

        AfdRuleAction::ConditionList { target } => {
            let scope = ctx.profile_scope(&target.profile);
            let rule = fetch(ctx.store, &scope, &target).await?;
            out.result(json!(rule.conditions));
        }

        AfdRuleAction::ActionAdd { target, action } => {
            let scope = ctx.profile_scope(&target.profile);
            let action = build_action(&action.action_name, &(&action).into(), &scope)?;
            let (rule, outcome) = edit_rule(ctx.store, &scope, &target, |rule| {
                rule.actions.push(action);
                EditOutcome::Applied
            })
            .await?;
            finish(&target, rule, &outcome, out);
        }

        AfdRuleAction::ActionRemove { target, index } => {
            let scope = ctx.profile_scope(&target.profile);
            let (rule, outcome) =
                edit_rule(ctx.store, &scope, &target, |rule| rule.remove_action(index)).await?;
            finish(&target, rule, &outcome, out);
        }

        AfdRuleAction::ActionList { target } => {
            let scope = ctx.profile_scope(&target.profile);
            let rule = fetch(ctx.store, &scope, &target).await?;
            out.result(json!(rule.actions));
        }
    }

    Ok(())
}

fn finish(target: &RuleArgs, rule: AfdRule, outcome: &EditOutcome, out: &Output) {
    let applied = report(outcome, out);
    out.result(json!({
        "success": true,
        "applied": applied,
        "name": target.rule_name,
        "properties": rule
    }));
}

pub fn rule_id(scope: &ResourceScope, target: &RuleArgs) -> String {
    format!(
        "{}/rules/{}",
        scope.child_path("ruleSets", &target.rule_set_name),
        target.rule_name
    )
}

pub async fn create(store: &dyn ResourceStore, id: &str, rule: &AfdRule) -> Result<Value> {
    store
        .put(id, &json!({ "properties": rule }))
        .await
        .map_err(|e| not_found_as(e.into(), "Rule set"))
}

pub async fn fetch(
    store: &dyn ResourceStore,
    scope: &ResourceScope,
    target: &RuleArgs,
) -> Result<AfdRule> {
    let resource = store
        .get(&rule_id(scope, target))
        .await
        .map_err(|e| not_found_as(e.into(), "Rule"))?;
    Ok(AfdRule::from_existing(properties(&resource), scope)?)
}

/// Read the rule, apply `edit`, write it back whole
pub async fn edit_rule<F>(
    store: &dyn ResourceStore,
    scope: &ResourceScope,
    target: &RuleArgs,
    edit: F,
) -> Result<(AfdRule, EditOutcome)>
where
    F: FnOnce(&mut AfdRule) -> EditOutcome,
{
    let (_, result) = update_resource(store, &rule_id(scope, target), |resource| {
        let mut rule = AfdRule::from_existing(properties(resource), scope)?;
        let outcome = edit(&mut rule);
        set_properties(resource, serde_json::to_value(&rule)?)?;
        Ok((rule, outcome))
    })
    .await
    .map_err(|e| not_found_as(e, "Rule"))?;
    Ok(result)
}
