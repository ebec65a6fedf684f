//! Front Door rule sets

use anyhow::Result;
use serde_json::{json, Value};

use super::Context;
use crate::arm::{not_found_as, ResourceStore};
use crate::cli::{AfdRuleSetAction, AfdRuleSetCommand, RuleSetTarget};
use crate::output::Output;

pub async fn run(cmd: AfdRuleSetCommand, ctx: &Context<'_>, out: &Output) -> Result<()> {
    match cmd.action {
        AfdRuleSetAction::Create { target } => {
            out.log("info", &format!("Creating rule set {}", target.rule_set_name));
            let stored = create(ctx.store, &rule_set_id(ctx, &target)).await?;
            out.result(json!({"success": true, "ruleSet": stored}));
        }

        AfdRuleSetAction::Delete { target } => {
            out.log("info", &format!("Deleting rule set {}", target.rule_set_name));
            ctx.store
                .delete(&rule_set_id(ctx, &target))
                .await
                .map_err(|e| not_found_as(e.into(), "Rule set"))?;
            out.result(json!({"success": true, "deleted": target.rule_set_name}));
        }

        AfdRuleSetAction::Show { target } => {
            let stored = ctx
                .store
                .get(&rule_set_id(ctx, &target))
                .await
                .map_err(|e| not_found_as(e.into(), "Rule set"))?;
            out.result(stored);
        }
    }

    Ok(())
}

fn rule_set_id(ctx: &Context<'_>, target: &RuleSetTarget) -> String {
    ctx.profile_scope(&target.profile)
        .child_path("ruleSets", &target.rule_set_name)
}

/// A rule set carries no settings of its own; rules are created inside it.
pub async fn create(store: &dyn ResourceStore, id: &str) -> Result<Value> {
    store
        .put(id, &json!({ "properties": {} }))
        .await
        .map_err(|e| not_found_as(e.into(), "Profile"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::LocalStore;
    use crate::cli::{ProfileArgs, RuleArgs};
    use crate::commands::afd_rule;
    use crate::error::CdnError;
    use crate::rules::{build_action, AfdRule, ActionArgs, ResourceScope};

    fn target() -> RuleSetTarget {
        RuleSetTarget {
            profile: ProfileArgs {
                resource_group: "rg1".into(),
                profile_name: "prof1".into(),
            },
            rule_set_name: "rs1".into(),
        }
    }

    #[test]
    fn rule_set_lives_under_the_profile() {
        let store = LocalStore::in_memory();
        let ctx = Context::new(&store, "sub1".into());
        assert_eq!(
            rule_set_id(&ctx, &target()),
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Cdn/profiles/prof1/ruleSets/rs1"
        );
    }

    #[tokio::test]
    async fn rules_are_created_inside_a_new_rule_set() {
        let store = LocalStore::in_memory();
        let ctx = Context::new(&store, "sub1".into());
        let id = rule_set_id(&ctx, &target());
        let stored = create(&store, &id).await.unwrap();
        assert_eq!(stored, json!({"properties": {}}));

        let scope = ResourceScope::profile("sub1", "rg1", "prof1");
        let rule_target = RuleArgs {
            profile: target().profile,
            rule_set_name: "rs1".into(),
            rule_name: "r1".into(),
        };
        let action = build_action("CacheExpiration", &ActionArgs::default(), &scope).unwrap();
        let rule_id = afd_rule::rule_id(&scope, &rule_target);
        assert!(rule_id.starts_with(&id));
        afd_rule::create(&store, &rule_id, &AfdRule::new(1, None, action, None))
            .await
            .unwrap();
        assert_eq!(afd_rule::fetch(&store, &scope, &rule_target).await.unwrap().order, 1);
    }

    #[tokio::test]
    async fn deleting_a_missing_rule_set_is_not_found() {
        let store = LocalStore::in_memory();
        let err = store
            .delete("/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Cdn/profiles/prof1/ruleSets/nope")
            .await
            .map_err(|e| not_found_as(e.into(), "Rule set"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CdnError>(),
            Some(CdnError::NotFound { kind: "Rule set", .. })
        ));
    }
}
