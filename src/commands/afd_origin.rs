//! Front Door origins

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{decode_properties, set_properties, Context};
use crate::arm::{not_found_as, update_resource, ResourceStore};
use crate::cli::{AfdOriginAction, AfdOriginCommand, OriginTarget, PrivateLinkFlags};
use crate::error::check_range;
use crate::output::Output;
use crate::rules::action::ResourceReference;
use crate::rules::ResourceScope;

const PRIORITY_RANGE: (i64, i64) = (1, 1000);
const WEIGHT_RANGE: (i64, i64) = (1, 1000);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedPrivateLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_link: Option<ResourceReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_link_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_message: Option<String>,
}

impl SharedPrivateLink {
    fn from_flags(flags: &PrivateLinkFlags) -> Option<Self> {
        let link = SharedPrivateLink {
            private_link: flags
                .private_link_resource
                .clone()
                .map(|id| ResourceReference { id }),
            private_link_location: flags.private_link_location.clone(),
            group_id: flags.private_link_sub_resource_type.clone(),
            request_message: flags.private_link_request_message.clone(),
        };
        (link != SharedPrivateLink::default()).then_some(link)
    }

    fn or(self, existing: SharedPrivateLink) -> Self {
        SharedPrivateLink {
            private_link: self.private_link.or(existing.private_link),
            private_link_location: self.private_link_location.or(existing.private_link_location),
            group_id: self.group_id.or(existing.group_id),
            request_message: self.request_message.or(existing.request_message),
        }
    }
}

/// `properties` of an origin resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_host_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_private_link_resource: Option<SharedPrivateLink>,
}

impl OriginProperties {
    fn validate(&self) -> Result<()> {
        if let Some(priority) = self.priority {
            check_range("priority", priority, PRIORITY_RANGE.0, PRIORITY_RANGE.1)?;
        }
        if let Some(weight) = self.weight {
            check_range("weight", weight, WEIGHT_RANGE.0, WEIGHT_RANGE.1)?;
        }
        Ok(())
    }

    /// Overlay the settings given on the command line onto an existing origin
    pub fn merge(self, existing: OriginProperties, private_link: &PrivateLinkFlags) -> Self {
        let shared_private_link_resource = if private_link.enable_private_link == Some(false) {
            None
        } else {
            match SharedPrivateLink::from_flags(private_link) {
                Some(link) => Some(match existing.shared_private_link_resource {
                    Some(current) => link.or(current),
                    None => link,
                }),
                None => existing.shared_private_link_resource,
            }
        };

        OriginProperties {
            host_name: self.host_name.or(existing.host_name),
            http_port: self.http_port.or(existing.http_port),
            https_port: self.https_port.or(existing.https_port),
            origin_host_header: self.origin_host_header.or(existing.origin_host_header),
            priority: self.priority.or(existing.priority),
            weight: self.weight.or(existing.weight),
            enabled_state: self.enabled_state.or(existing.enabled_state),
            shared_private_link_resource,
        }
    }
}

pub async fn run(cmd: AfdOriginCommand, ctx: &Context<'_>, out: &Output) -> Result<()> {
    match cmd.action {
        AfdOriginAction::Create {
            target,
            host_name,
            enabled_state,
            http_port,
            https_port,
            origin_host_header,
            priority,
            weight,
            private_link,
        } => {
            let origin = OriginProperties {
                host_name: Some(host_name),
                http_port: Some(http_port),
                https_port: Some(https_port),
                origin_host_header,
                priority: Some(priority),
                weight: Some(weight),
                enabled_state: Some(enabled_state),
                shared_private_link_resource: if private_link.enable_private_link == Some(true) {
                    SharedPrivateLink::from_flags(&private_link)
                } else {
                    None
                },
            };

            out.log("info", &format!("Creating origin {}", target.origin_name));
            let stored = create(ctx.store, &origin_id(ctx, &target), &origin).await?;
            out.result(json!({"success": true, "origin": stored}));
        }

        AfdOriginAction::Update {
            target,
            host_name,
            enabled_state,
            http_port,
            https_port,
            origin_host_header,
            priority,
            weight,
            private_link,
        } => {
            let changes = OriginProperties {
                host_name,
                http_port,
                https_port,
                origin_host_header,
                priority,
                weight,
                enabled_state,
                shared_private_link_resource: None,
            };

            out.log("info", &format!("Updating origin {}", target.origin_name));
            let stored = update(ctx.store, &origin_id(ctx, &target), changes, &private_link).await?;
            out.result(json!({"success": true, "origin": stored}));
        }
    }

    Ok(())
}

fn origin_id(ctx: &Context<'_>, target: &OriginTarget) -> String {
    let scope: ResourceScope = ctx.profile_scope(&target.profile);
    format!(
        "{}/origins/{}",
        scope.child_path("originGroups", &target.origin_group_name),
        target.origin_name
    )
}

pub async fn create(store: &dyn ResourceStore, id: &str, origin: &OriginProperties) -> Result<Value> {
    origin.validate()?;
    store
        .put(id, &json!({ "properties": origin }))
        .await
        .map_err(|e| not_found_as(e.into(), "Origin group"))
}

pub async fn update(
    store: &dyn ResourceStore,
    id: &str,
    changes: OriginProperties,
    private_link: &PrivateLinkFlags,
) -> Result<Value> {
    changes.validate()?;
    let (stored, _) = update_resource(store, id, |resource| {
        let existing: OriginProperties = decode_properties(resource)?;
        let merged = changes.merge(existing, private_link);

        let mut patch = serde_json::to_value(&merged)?;
        // An absent link must clear the stored one.
        patch["sharedPrivateLinkResource"] = serde_json::to_value(&merged.shared_private_link_resource)?;
        set_properties(resource, patch)
    })
    .await
    .map_err(|e| not_found_as(e, "Origin"))?;
    Ok(stored)
}
