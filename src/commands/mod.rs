//! Command handlers, one module per command group

pub mod afd_origin;
pub mod afd_origin_group;
pub mod afd_route;
pub mod afd_rule;
pub mod afd_rule_set;
pub mod endpoint_rule;
pub mod origin_group;

use anyhow::{bail, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::arm::{ArmError, ResourceStore};
use crate::cli::{EndpointArgs, ProfileArgs};
use crate::output::Output;
use crate::rules::{EditOutcome, ResourceScope};

/// What every handler needs besides its own arguments
pub struct Context<'a> {
    pub store: &'a dyn ResourceStore,
    pub subscription_id: String,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a dyn ResourceStore, subscription_id: String) -> Self {
        Self {
            store,
            subscription_id,
        }
    }

    pub fn profile_scope(&self, args: &ProfileArgs) -> ResourceScope {
        ResourceScope::profile(&self.subscription_id, &args.resource_group, &args.profile_name)
    }

    pub fn endpoint_scope(&self, args: &EndpointArgs) -> ResourceScope {
        self.profile_scope(&args.profile)
            .with_endpoint(&args.endpoint_name)
    }
}

/// Merge the keys of `patch` into `resource.properties`; a null value clears the key.
pub(crate) fn set_properties(resource: &mut Value, patch: Value) -> Result<()> {
    let Some(resource) = resource.as_object_mut() else {
        bail!("stored resource is not a JSON object");
    };
    let Value::Object(patch) = patch else {
        bail!("properties patch is not a JSON object");
    };

    let properties = resource
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if properties.is_null() {
        *properties = Value::Object(Map::new());
    }
    let Some(properties) = properties.as_object_mut() else {
        bail!("stored resource has non-object properties");
    };

    for (key, value) in patch {
        if value.is_null() {
            properties.remove(&key);
        } else {
            properties.insert(key, value);
        }
    }
    Ok(())
}

pub(crate) fn properties(resource: &Value) -> &Value {
    resource.get("properties").unwrap_or(&Value::Null)
}

/// Typed view of `resource.properties`; a missing section is the default.
pub(crate) fn decode_properties<T: DeserializeOwned + Default>(resource: &Value) -> Result<T> {
    match resource.get("properties") {
        None | Some(Value::Null) => Ok(T::default()),
        Some(props) => serde_json::from_value(props.clone()).map_err(|e| {
            ArmError::Decode(format!("stored properties are malformed: {}", e)).into()
        }),
    }
}

/// Surface a skipped edit as a warning; the command still succeeds
pub(crate) fn report(outcome: &EditOutcome, out: &Output) -> bool {
    if let EditOutcome::Skipped(reason) = outcome {
        tracing::debug!(reason = %reason, "edit skipped");
        out.log("warning", reason);
    }
    outcome.is_applied()
}
