//! Front Door routes

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{decode_properties, set_properties, Context};
use crate::arm::{not_found_as, update_resource, ResourceStore};
use crate::cli::{AfdRouteAction, AfdRouteCommand, RouteFlags, RouteTarget};
use crate::output::Output;
use crate::rules::action::ResourceReference;
use crate::rules::{content_types_for, default_content_types, ResourceScope};

const DEFAULT_PATTERN: &str = "/*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionSettings {
    #[serde(default)]
    pub content_types_to_compress: Vec<String>,
    #[serde(default)]
    pub is_compression_enabled: bool,
}

/// `properties.cacheConfiguration`; absent when caching is off
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCacheConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_string_caching_behavior: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_parameters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_settings: Option<CompressionSettings>,
}

/// `properties` of a route resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_domains: Option<Vec<ResourceReference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_group: Option<ResourceReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_sets: Option<Vec<ResourceReference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_protocols: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns_to_match: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_configuration: Option<RouteCacheConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarding_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_to_default_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_redirect: Option<String>,
}

fn enabled(flag: bool) -> String {
    let state = if flag { "Enabled" } else { "Disabled" };
    state.to_string()
}

/// Expand names to IDs; Front Door references always live at profile level
fn references(scope: &ResourceScope, values: &[String], marker: &str, collection: &str) -> Vec<ResourceReference> {
    values
        .iter()
        .map(|v| ResourceReference {
            id: scope.expand_child(v, marker, collection),
        })
        .collect()
}

fn origin_group_ref(scope: &ResourceScope, value: &str) -> ResourceReference {
    ResourceReference {
        id: scope.expand_child(value, "/origingroups/", "originGroups"),
    }
}

/// Compression for a new route: on without a list means the default MIME list
pub fn new_compression(enabled: bool, explicit: Option<&[String]>) -> CompressionSettings {
    CompressionSettings {
        content_types_to_compress: content_types_for(enabled, explicit),
        is_compression_enabled: enabled,
    }
}

/// Compression after an update; `None` keeps whatever the route has
pub fn updated_compression(
    existing: Option<&CompressionSettings>,
    enabled: Option<bool>,
    explicit: Option<&[String]>,
) -> Option<CompressionSettings> {
    match enabled {
        Some(true) => {
            let types = match (explicit, existing) {
                (Some(list), _) => list.to_vec(),
                (None, Some(current)) => current.content_types_to_compress.clone(),
                (None, None) => default_content_types(),
            };
            Some(CompressionSettings {
                content_types_to_compress: types,
                is_compression_enabled: true,
            })
        }
        Some(false) => Some(new_compression(false, None)),
        None => match (explicit, existing) {
            (Some(list), Some(current)) => Some(CompressionSettings {
                content_types_to_compress: list.to_vec(),
                is_compression_enabled: current.is_compression_enabled,
            }),
            _ => existing.cloned(),
        },
    }
}

/// Cache settings for a new route; `--enable-caching false` leaves them out
fn new_cache_configuration(flags: &RouteFlags) -> Option<RouteCacheConfiguration> {
    if flags.enable_caching == Some(false) {
        return None;
    }
    Some(RouteCacheConfiguration {
        query_string_caching_behavior: flags.query_string_caching_behavior.clone(),
        query_parameters: flags.query_parameters.clone(),
        compression_settings: Some(new_compression(
            flags.enable_compression.unwrap_or(false),
            flags.content_types_to_compress.as_deref(),
        )),
    })
}

/// Overlay cache flags onto the stored cache settings
fn merged_cache_configuration(
    existing: Option<RouteCacheConfiguration>,
    flags: &RouteFlags,
) -> Option<RouteCacheConfiguration> {
    if flags.enable_caching == Some(false) {
        return None;
    }
    let requested = flags.enable_caching == Some(true)
        || flags.enable_compression.is_some()
        || flags.content_types_to_compress.is_some()
        || flags.query_string_caching_behavior.is_some()
        || flags.query_parameters.is_some();
    if existing.is_none() && !requested {
        return None;
    }

    let current = existing.unwrap_or_default();
    Some(RouteCacheConfiguration {
        query_string_caching_behavior: flags
            .query_string_caching_behavior
            .clone()
            .or(current.query_string_caching_behavior),
        query_parameters: flags.query_parameters.clone().or(current.query_parameters),
        compression_settings: updated_compression(
            current.compression_settings.as_ref(),
            flags.enable_compression,
            flags.content_types_to_compress.as_deref(),
        ),
    })
}

/// Build a new route from flags, filling in the defaults
pub fn build_route(scope: &ResourceScope, origin_group: &str, flags: &RouteFlags) -> RouteProperties {
    let scope = scope.profile_level();
    RouteProperties {
        custom_domains: Some(references(
            &scope,
            flags.custom_domains.as_deref().unwrap_or_default(),
            "/customdomains/",
            "customDomains",
        )),
        origin_group: Some(origin_group_ref(&scope, origin_group)),
        origin_path: flags.origin_path.clone(),
        rule_sets: Some(references(
            &scope,
            flags.rule_sets.as_deref().unwrap_or_default(),
            "/rulesets/",
            "ruleSets",
        )),
        supported_protocols: Some(
            flags
                .supported_protocols
                .clone()
                .unwrap_or_else(|| vec!["Http".to_string(), "Https".to_string()]),
        ),
        patterns_to_match: Some(
            flags
                .patterns_to_match
                .clone()
                .unwrap_or_else(|| vec![DEFAULT_PATTERN.to_string()]),
        ),
        cache_configuration: new_cache_configuration(flags),
        forwarding_protocol: Some(
            flags
                .forwarding_protocol
                .clone()
                .unwrap_or_else(|| "MatchRequest".to_string()),
        ),
        link_to_default_domain: Some(enabled(flags.link_to_default_domain.unwrap_or(false))),
        https_redirect: Some(
            flags
                .https_redirect
                .clone()
                .unwrap_or_else(|| "Disabled".to_string()),
        ),
    }
}

/// Overlay the given flags onto an existing route
pub fn merge_route(
    scope: &ResourceScope,
    existing: RouteProperties,
    origin_group: Option<&str>,
    flags: &RouteFlags,
) -> RouteProperties {
    let scope = scope.profile_level();
    RouteProperties {
        custom_domains: flags
            .custom_domains
            .as_deref()
            .map(|v| references(&scope, v, "/customdomains/", "customDomains"))
            .or(existing.custom_domains),
        origin_group: origin_group
            .map(|og| origin_group_ref(&scope, og))
            .or(existing.origin_group),
        origin_path: flags.origin_path.clone().or(existing.origin_path),
        rule_sets: flags
            .rule_sets
            .as_deref()
            .map(|v| references(&scope, v, "/rulesets/", "ruleSets"))
            .or(existing.rule_sets),
        supported_protocols: flags
            .supported_protocols
            .clone()
            .or(existing.supported_protocols),
        patterns_to_match: flags
            .patterns_to_match
            .clone()
            .or(existing.patterns_to_match),
        cache_configuration: merged_cache_configuration(existing.cache_configuration, flags),
        forwarding_protocol: flags
            .forwarding_protocol
            .clone()
            .or(existing.forwarding_protocol),
        link_to_default_domain: flags
            .link_to_default_domain
            .map(enabled)
            .or(existing.link_to_default_domain),
        https_redirect: flags.https_redirect.clone().or(existing.https_redirect),
    }
}

pub async fn run(cmd: AfdRouteCommand, ctx: &Context<'_>, out: &Output) -> Result<()> {
    match cmd.action {
        AfdRouteAction::Create {
            target,
            origin_group,
            route,
        } => {
            let scope = ctx.endpoint_scope(&target.endpoint);
            let properties = build_route(&scope, &origin_group, &route);

            out.log("info", &format!("Creating route {}", target.route_name));
            let stored = ctx
                .store
                .put(&route_id(&scope, &target)?, &json!({ "properties": properties }))
                .await
                .map_err(|e| not_found_as(e.into(), "Endpoint"))?;
            out.result(json!({"success": true, "route": stored}));
        }

        AfdRouteAction::Update {
            target,
            origin_group,
            route,
        } => {
            let scope = ctx.endpoint_scope(&target.endpoint);
            out.log("info", &format!("Updating route {}", target.route_name));
            let stored = update(
                ctx.store,
                &scope,
                &route_id(&scope, &target)?,
                origin_group.as_deref(),
                &route,
            )
            .await?;
            out.result(json!({"success": true, "route": stored}));
        }
    }

    Ok(())
}

fn route_id(scope: &ResourceScope, target: &RouteTarget) -> Result<String> {
    let endpoint = scope
        .endpoint_path()
        .context("endpoint name is required for route commands")?;
    Ok(format!(
        "{}/routes/{}",
        endpoint.replace("/endpoints/", "/afdEndpoints/"),
        target.route_name
    ))
}

pub async fn update(
    store: &dyn ResourceStore,
    scope: &ResourceScope,
    id: &str,
    origin_group: Option<&str>,
    flags: &RouteFlags,
) -> Result<Value> {
    let (stored, _) = update_resource(store, id, |resource| {
        let existing: RouteProperties = decode_properties(resource)?;
        let merged = merge_route(scope, existing, origin_group, flags);

        let mut patch = serde_json::to_value(&merged)?;
        // Turning caching off must drop the stored settings.
        patch["cacheConfiguration"] = serde_json::to_value(&merged.cache_configuration)?;
        set_properties(resource, patch)
    })
    .await
    .map_err(|e| not_found_as(e, "Route"))?;
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::LocalStore;

    fn scope() -> ResourceScope {
        ResourceScope::profile("sub1", "rg1", "prof1").with_endpoint("ep1")
    }

    fn types(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn create_defaults() {
        let route = build_route(&scope(), "og1", &RouteFlags::default());
        assert_eq!(route.patterns_to_match, Some(types(&["/*"])));
        assert_eq!(
            route.origin_group.unwrap().id,
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Cdn/profiles/prof1/originGroups/og1"
        );
        let cache = route.cache_configuration.unwrap();
        assert_eq!(cache.compression_settings, Some(new_compression(false, None)));
        assert_eq!(route.link_to_default_domain.as_deref(), Some("Disabled"));
        assert_eq!(route.custom_domains, Some(vec![]));
    }

    #[test]
    fn create_expands_names_and_keeps_ids() {
        let domain_id = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Cdn/profiles/prof1/customDomains/d2";
        let flags = RouteFlags {
            custom_domains: Some(types(&["d1", domain_id])),
            rule_sets: Some(types(&["rs1"])),
            ..Default::default()
        };
        let route = build_route(&scope(), "og1", &flags);
        let domains: Vec<_> = route.custom_domains.unwrap().into_iter().map(|r| r.id).collect();
        assert!(domains[0].ends_with("/profiles/prof1/customDomains/d1"));
        assert_eq!(domains[1], domain_id);
        assert!(route.rule_sets.unwrap()[0].id.ends_with("/profiles/prof1/ruleSets/rs1"));
    }

    #[test]
    fn create_compression_uses_default_list() {
        let enabled = new_compression(true, None);
        assert!(enabled.is_compression_enabled);
        assert_eq!(enabled.content_types_to_compress, default_content_types());

        let explicit = new_compression(true, Some(types(&["text/html"]).as_slice()));
        assert_eq!(explicit.content_types_to_compress, types(&["text/html"]));

        let disabled = new_compression(false, Some(types(&["text/html"]).as_slice()));
        assert!(disabled.content_types_to_compress.is_empty());
    }

    #[test]
    fn update_compression_rules() {
        let current = CompressionSettings {
            content_types_to_compress: types(&["text/css"]),
            is_compression_enabled: true,
        };

        let kept = updated_compression(Some(&current), Some(true), None).unwrap();
        assert_eq!(kept.content_types_to_compress, types(&["text/css"]));

        let fresh = updated_compression(None, Some(true), None).unwrap();
        assert_eq!(fresh.content_types_to_compress, default_content_types());

        let off = updated_compression(Some(&current), Some(false), None).unwrap();
        assert!(!off.is_compression_enabled);
        assert!(off.content_types_to_compress.is_empty());

        let relisted =
            updated_compression(Some(&current), None, Some(types(&["text/html"]).as_slice())).unwrap();
        assert!(relisted.is_compression_enabled);
        assert_eq!(relisted.content_types_to_compress, types(&["text/html"]));

        assert_eq!(updated_compression(Some(&current), None, None), Some(current));
        assert_eq!(updated_compression(None, None, Some(types(&["a/b"]).as_slice())), None);
    }

    #[tokio::test]
    async fn update_keeps_unspecified_settings() {
        let store = LocalStore::in_memory();
        let target = RouteTarget {
            endpoint: crate::cli::EndpointArgs {
                profile: crate::cli::ProfileArgs {
                    resource_group: "rg1".into(),
                    profile_name: "prof1".into(),
                },
                endpoint_name: "ep1".into(),
            },
            route_name: "route1".into(),
        };
        let id = route_id(&scope(), &target).unwrap();
        assert!(id.ends_with("/profiles/prof1/afdEndpoints/ep1/routes/route1"));

        let created = build_route(
            &scope(),
            "og1",
            &RouteFlags {
                enable_compression: Some(true),
                ..Default::default()
            },
        );
        store
            .put(&id, &json!({"properties": created}))
            .await
            .unwrap();

        let flags = RouteFlags {
            origin_path: Some("/app".into()),
            ..Default::default()
        };
        let stored = update(&store, &scope(), &id, Some("og2"), &flags).await.unwrap();
        let props = &stored["properties"];
        assert_eq!(props["originPath"], "/app");
        assert!(props["originGroup"]["id"].as_str().unwrap().ends_with("/originGroups/og2"));
        assert_eq!(props["patternsToMatch"], json!(["/*"]));
        assert_eq!(
            props["cacheConfiguration"]["compressionSettings"]["isCompressionEnabled"],
            true
        );
    }

    #[test]
    fn cache_settings_nest_under_cache_configuration() {
        let flags = RouteFlags {
            enable_compression: Some(true),
            content_types_to_compress: Some(types(&["text/html"])),
            query_string_caching_behavior: Some("IgnoreSpecifiedQueryStrings".into()),
            query_parameters: Some("utm_source".into()),
            ..Default::default()
        };
        let body = serde_json::to_value(build_route(&scope(), "og1", &flags)).unwrap();
        assert!(body.get("compressionSettings").is_none());
        assert!(body.get("queryStringCachingBehavior").is_none());
        assert_eq!(
            body["cacheConfiguration"],
            json!({
                "queryStringCachingBehavior": "IgnoreSpecifiedQueryStrings",
                "queryParameters": "utm_source",
                "compressionSettings": {
                    "contentTypesToCompress": ["text/html"],
                    "isCompressionEnabled": true
                }
            })
        );

        let uncached = RouteFlags {
            enable_caching: Some(false),
            ..Default::default()
        };
        let body = serde_json::to_value(build_route(&scope(), "og1", &uncached)).unwrap();
        assert!(body.get("cacheConfiguration").is_none());
    }

    #[tokio::test]
    async fn update_merges_stored_cache_configuration() {
        let store = LocalStore::in_memory();
        let id = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Cdn/profiles/prof1/afdEndpoints/ep1/routes/r1";
        store.insert(
            id,
            json!({"properties": {
                "originGroup": {"id": "/og/1"},
                "cacheConfiguration": {
                    "queryStringCachingBehavior": "UseQueryString",
                    "compressionSettings": {
                        "contentTypesToCompress": ["text/css"],
                        "isCompressionEnabled": true
                    }
                }
            }}),
        );

        let flags = RouteFlags {
            query_parameters: Some("v".into()),
            ..Default::default()
        };
        let stored = update(&store, &scope(), id, None, &flags).await.unwrap();
        let cache = &stored["properties"]["cacheConfiguration"];
        assert_eq!(cache["queryStringCachingBehavior"], "UseQueryString");
        assert_eq!(cache["queryParameters"], "v");
        assert_eq!(cache["compressionSettings"]["contentTypesToCompress"], json!(["text/css"]));

        let off = RouteFlags {
            enable_caching: Some(false),
            ..Default::default()
        };
        let stored = update(&store, &scope(), id, None, &off).await.unwrap();
        assert!(stored["properties"].get("cacheConfiguration").is_none());
        assert_eq!(stored["properties"]["originGroup"]["id"], "/og/1");
    }

    #[test]
    fn uncached_route_stays_uncached_without_cache_flags() {
        let flags = RouteFlags {
            origin_path: Some("/x".into()),
            ..Default::default()
        };
        assert_eq!(merged_cache_configuration(None, &flags), None);

        let compress = RouteFlags {
            enable_compression: Some(true),
            ..Default::default()
        };
        let cache = merged_cache_configuration(None, &compress).unwrap();
        assert_eq!(
            cache.compression_settings.unwrap().content_types_to_compress,
            default_content_types()
        );
    }
}
