//! Resource ID parsing and name-to-ID expansion

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const CDN_PROVIDER: &str = "Microsoft.Cdn";

static ARM_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^/subscriptions/([^/]+)/resourceGroups/([^/]+)/providers/([^/]+)/([^/]+)/([^/]+)(/.*)?$",
    )
    .expect("resource id regex is valid")
});

/// Top-level segments of an ARM resource ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub subscription: String,
    pub resource_group: String,
    pub provider: String,
    pub resource_type: String,
    pub name: String,
}

impl ResourceId {
    pub fn parse(value: &str) -> Option<ResourceId> {
        let caps = ARM_ID_RE.captures(value.trim_end_matches('/'))?;
        Some(ResourceId {
            subscription: caps[1].to_string(),
            resource_group: caps[2].to_string(),
            provider: caps[3].to_string(),
            resource_type: caps[4].to_string(),
            name: caps[5].to_string(),
        })
    }
}

/// Whether `value` is a full ARM resource ID rather than a bare name
pub fn is_valid_resource_id(value: &str) -> bool {
    ResourceId::parse(value).is_some()
}

/// Subscription / resource group / profile (/ endpoint) context of one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceScope {
    pub subscription_id: String,
    pub resource_group: String,
    pub profile_name: String,
    pub endpoint_name: Option<String>,
}

impl ResourceScope {
    pub fn profile(subscription_id: &str, resource_group: &str, profile_name: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            profile_name: profile_name.to_string(),
            endpoint_name: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint_name: &str) -> Self {
        self.endpoint_name = Some(endpoint_name.to_string());
        self
    }

    /// Same scope without the endpoint segment (Front Door references)
    pub fn profile_level(&self) -> Self {
        Self {
            endpoint_name: None,
            ..self.clone()
        }
    }

    /// Canonical ARM path of the profile
    pub fn profile_path(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/profiles/{}",
            self.subscription_id, self.resource_group, CDN_PROVIDER, self.profile_name
        )
    }

    /// Canonical ARM path of the endpoint, if the scope has one
    pub fn endpoint_path(&self) -> Option<String> {
        self.endpoint_name
            .as_ref()
            .map(|ep| format!("{}/endpoints/{}", self.profile_path(), ep))
    }

    /// Profile-level child path, e.g. `child_path("ruleSets", "rs1")`
    pub fn child_path(&self, collection: &str, name: &str) -> String {
        format!("{}/{}/{}", self.profile_path(), collection, name)
    }

    /// Origin group reference used inside rule actions.
    ///
    /// Lowercase `resourcegroups`/`origingroups` matches what the portal
    /// extension expects to render these references.
    pub fn origin_group_id(&self, name: &str) -> String {
        let mut id = format!(
            "/subscriptions/{}/resourcegroups/{}/providers/{}/profiles/{}",
            self.subscription_id, self.resource_group, CDN_PROVIDER, self.profile_name
        );
        if let Some(ep) = &self.endpoint_name {
            id.push_str("/endpoints/");
            id.push_str(ep);
        }
        id.push_str("/origingroups/");
        id.push_str(name);
        id
    }

    /// Expand a bare origin group name; resource IDs pass through unchanged.
    pub fn expand_origin_group(&self, value: &str) -> String {
        match ResourceId::parse(value) {
            Some(_) => value.to_string(),
            None => self.origin_group_id(value),
        }
    }

    /// Expand a profile-level reference unless it already contains `marker`
    pub fn expand_child(&self, value: &str, marker: &str, collection: &str) -> String {
        if value.to_lowercase().contains(marker) {
            value.to_string()
        } else {
            self.child_path(collection, value)
        }
    }

    /// Expand an origin name to an endpoint-level origin ID unless it is a path already
    pub fn expand_origin(&self, value: &str) -> String {
        if value.contains('/') {
            return value.to_string();
        }
        match self.endpoint_path() {
            Some(ep) => format!("{}/origins/{}", ep, value),
            None => self.child_path("origins", value),
        }
    }
}
