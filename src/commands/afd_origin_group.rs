//! Front Door origin groups

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::origin_group::{probe_method, probe_protocol, HealthProbeSettings};
use super::{decode_properties, set_properties, Context};
use crate::arm::{not_found_as, update_resource, ResourceStore};
use crate::cli::{AfdOriginGroupAction, AfdOriginGroupCommand, AfdOriginGroupTarget};
use crate::error::CdnError;
use crate::output::Output;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful_samples_required: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_latency_in_milliseconds: Option<u32>,
}

impl LoadBalancingSettings {
    fn or(self, existing: LoadBalancingSettings) -> Self {
        LoadBalancingSettings {
            sample_size: self.sample_size.or(existing.sample_size),
            successful_samples_required: self
                .successful_samples_required
                .or(existing.successful_samples_required),
            additional_latency_in_milliseconds: self
                .additional_latency_in_milliseconds
                .or(existing.additional_latency_in_milliseconds),
        }
    }
}

/// `properties` of a Front Door origin group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfdOriginGroupProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancing_settings: Option<LoadBalancingSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_probe_settings: Option<HealthProbeSettings>,
}

impl AfdOriginGroupProperties {
    /// Overlay these settings onto a stored group field by field
    pub fn merge(self, existing: AfdOriginGroupProperties) -> Self {
        let load_balancing_settings =
            match (self.load_balancing_settings, existing.load_balancing_settings) {
                (Some(changes), Some(current)) => Some(changes.or(current)),
                (changes, current) => changes.or(current),
            };
        let health_probe_settings = match (self.health_probe_settings, existing.health_probe_settings) {
            (Some(changes), Some(current)) => Some(changes.or(current)),
            (changes, current) => changes.or(current),
        };
        AfdOriginGroupProperties {
            load_balancing_settings,
            health_probe_settings,
        }
    }
}

/// Probe settings from flags, normalized; `None` when nothing was given
fn probe_changes(
    path: Option<String>,
    request_type: Option<&str>,
    protocol: Option<&str>,
    interval: Option<u32>,
) -> Result<Option<HealthProbeSettings>, CdnError> {
    let settings = HealthProbeSettings {
        probe_path: path,
        probe_request_type: request_type.map(probe_method).transpose()?,
        probe_protocol: protocol.map(probe_protocol).transpose()?,
        probe_interval_in_seconds: interval,
    };
    Ok((settings != HealthProbeSettings::default()).then_some(settings))
}

pub async fn run(cmd: AfdOriginGroupCommand, ctx: &Context<'_>, out: &Output) -> Result<()> {
    match cmd.action {
        AfdOriginGroupAction::Create {
            target,
            sample_size,
            successful_samples_required,
            additional_latency_in_milliseconds,
            probe_request_type,
            probe_protocol,
            probe_path,
            probe_interval_in_seconds,
        } => {
            let group = AfdOriginGroupProperties {
                load_balancing_settings: Some(LoadBalancingSettings {
                    sample_size: Some(sample_size),
                    successful_samples_required: Some(successful_samples_required),
                    additional_latency_in_milliseconds: Some(additional_latency_in_milliseconds),
                }),
                health_probe_settings: probe_changes(
                    Some(probe_path),
                    Some(probe_request_type.as_str()),
                    Some(probe_protocol.as_str()),
                    Some(probe_interval_in_seconds),
                )?,
            };

            out.log("info", &format!("Creating origin group {}", target.origin_group_name));
            let stored = create(ctx.store, &group_id(ctx, &target), &group).await?;
            out.result(json!({"success": true, "originGroup": stored}));
        }

        AfdOriginGroupAction::Update {
            target,
            sample_size,
            successful_samples_required,
            additional_latency_in_milliseconds,
            probe_request_type,
            probe_protocol,
            probe_path,
            probe_interval_in_seconds,
        } => {
            let load_balancing = LoadBalancingSettings {
                sample_size,
                successful_samples_required,
                additional_latency_in_milliseconds,
            };
            let changes = AfdOriginGroupProperties {
                load_balancing_settings: (load_balancing != LoadBalancingSettings::default())
                    .then_some(load_balancing),
                health_probe_settings: probe_changes(
                    probe_path,
                    probe_request_type.as_deref(),
                    probe_protocol.as_deref(),
                    probe_interval_in_seconds,
                )?,
            };

            out.log("info", &format!("Updating origin group {}", target.origin_group_name));
            let stored = update(ctx.store, &group_id(ctx, &target), changes).await?;
            out.result(json!({"success": true, "originGroup": stored}));
        }
    }

    Ok(())
}

fn group_id(ctx: &Context<'_>, target: &AfdOriginGroupTarget) -> String {
    ctx.profile_scope(&target.profile)
        .child_path("originGroups", &target.origin_group_name)
}

pub async fn create(
    store: &dyn ResourceStore,
    id: &str,
    group: &AfdOriginGroupProperties,
) -> Result<Value> {
    store
        .put(id, &json!({ "properties": group }))
        .await
        .map_err(|e| not_found_as(e.into(), "Profile"))
}

pub async fn update(
    store: &dyn ResourceStore,
    id: &str,
    changes: AfdOriginGroupProperties,
) -> Result<Value> {
    let (stored, _) = update_resource(store, id, |resource| {
        let existing: AfdOriginGroupProperties = decode_properties(resource)?;
        let merged = changes.merge(existing);
        set_properties(resource, serde_json::to_value(&merged)?)
    })
    .await
    .map_err(|e| not_found_as(e, "Origin group"))?;
    Ok(stored)
}
