//! Delivery rule actions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::resource_id::ResourceScope;
use super::stored::{str_field, string_list, StoredItem};
use crate::error::CdnError;

const COMPRESSION_ENABLED: &str = "Enabled";
const COMPRESSION_DISABLED: &str = "Disabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionName {
    CacheExpiration,
    ModifyRequestHeader,
    ModifyResponseHeader,
    CacheKeyQueryString,
    UrlRedirect,
    UrlRewrite,
    OriginGroupOverride,
    RouteConfigurationOverride,
}

impl ActionName {
    pub const ALL: [ActionName; 8] = [
        ActionName::CacheExpiration,
        ActionName::ModifyRequestHeader,
        ActionName::ModifyResponseHeader,
        ActionName::CacheKeyQueryString,
        ActionName::UrlRedirect,
        ActionName::UrlRewrite,
        ActionName::OriginGroupOverride,
        ActionName::RouteConfigurationOverride,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::CacheExpiration => "CacheExpiration",
            ActionName::ModifyRequestHeader => "ModifyRequestHeader",
            ActionName::ModifyResponseHeader => "ModifyResponseHeader",
            ActionName::CacheKeyQueryString => "CacheKeyQueryString",
            ActionName::UrlRedirect => "UrlRedirect",
            ActionName::UrlRewrite => "UrlRewrite",
            ActionName::OriginGroupOverride => "OriginGroupOverride",
            ActionName::RouteConfigurationOverride => "RouteConfigurationOverride",
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionName {
    type Err = CdnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RequestHeader" => return Ok(ActionName::ModifyRequestHeader),
            "ResponseHeader" => return Ok(ActionName::ModifyResponseHeader),
            _ => {}
        }
        ActionName::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| CdnError::UnrecognizedActionName(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "parameters")]
pub enum Action {
    CacheExpiration(CacheExpirationParameters),
    ModifyRequestHeader(HeaderActionParameters),
    ModifyResponseHeader(HeaderActionParameters),
    CacheKeyQueryString(CacheKeyQueryStringParameters),
    UrlRedirect(UrlRedirectParameters),
    UrlRewrite(UrlRewriteParameters),
    OriginGroupOverride(OriginGroupOverrideParameters),
    RouteConfigurationOverride(RouteConfigurationOverrideParameters),
}

impl Action {
    #[cfg(test)]
    pub fn name(&self) -> ActionName {
        match self {
            Action::CacheExpiration(_) => ActionName::CacheExpiration,
            Action::ModifyRequestHeader(_) => ActionName::ModifyRequestHeader,
            Action::ModifyResponseHeader(_) => ActionName::ModifyResponseHeader,
            Action::CacheKeyQueryString(_) => ActionName::CacheKeyQueryString,
            Action::UrlRedirect(_) => ActionName::UrlRedirect,
            Action::UrlRewrite(_) => ActionName::UrlRewrite,
            Action::OriginGroupOverride(_) => ActionName::OriginGroupOverride,
            Action::RouteConfigurationOverride(_) => ActionName::RouteConfigurationOverride,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheExpirationParameters {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_behavior: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_duration: Option<String>,
    pub cache_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderActionParameters {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKeyQueryStringParameters {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_string_behavior: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_parameters: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRedirectParameters {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fragment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
    #[serde(rename = "customQueryString", skip_serializing_if = "Option::is_none")]
    pub custom_querystring: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRewriteParameters {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_unmatched_path: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReference {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginGroupOverrideParameters {
    pub type_name: String,
    pub origin_group: ResourceReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginGroupOverride {
    pub origin_group: ResourceReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarding_protocol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_string_caching_behavior: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_parameters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_behavior: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_duration: Option<String>,
    pub is_compression_enabled: String,
    pub content_types_to_compress: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfigurationOverrideParameters {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_group_override: Option<OriginGroupOverride>,
    /// Absent whenever caching is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_configuration: Option<CacheConfiguration>,
}

/// Every per-action flag. Fields irrelevant to the chosen action are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionArgs {
    pub cache_behavior: Option<String>,
    pub cache_duration: Option<String>,
    pub header_action: Option<String>,
    pub header_name: Option<String>,
    pub header_value: Option<String>,
    pub query_string_behavior: Option<String>,
    pub query_parameters: Option<String>,
    pub redirect_type: Option<String>,
    pub redirect_protocol: Option<String>,
    pub custom_hostname: Option<String>,
    pub custom_path: Option<String>,
    pub custom_querystring: Option<String>,
    pub custom_fragment: Option<String>,
    pub source_pattern: Option<String>,
    pub destination: Option<String>,
    pub preserve_unmatched_path: Option<bool>,
    pub origin_group: Option<String>,
    pub forwarding_protocol: Option<String>,
    pub query_string_caching_behavior: Option<String>,
    pub enable_caching: Option<bool>,
    pub enable_compression: Option<bool>,
    pub content_types_to_compress: Option<Vec<String>>,
}

/// MIME types compressed by default on Front Door
pub fn default_content_types() -> Vec<String> {
    [
        "application/eot",
        "application/font",
        "application/font-sfnt",
        "application/javascript",
        "application/json",
        "application/opentype",
        "application/otf",
        "application/pkcs7-mime",
        "application/truetype",
        "application/ttf",
        "application/vnd.ms-fontobject",
        "application/xhtml+xml",
        "application/xml",
        "application/xml+rss",
        "application/x-font-opentype",
        "application/x-font-truetype",
        "application/x-font-ttf",
        "application/x-httpd-cgi",
        "application/x-javascript",
        "application/x-mpegurl",
        "application/x-opentype",
        "application/x-otf",
        "application/x-perl",
        "application/x-ttf",
        "font/eot",
        "font/ttf",
        "font/otf",
        "font/opentype",
        "image/svg+xml",
        "text/css",
        "text/csv",
        "text/html",
        "text/javascript",
        "text/js",
        "text/plain",
        "text/richtext",
        "text/tab-separated-values",
        "text/xml",
        "text/x-script",
        "text/x-component",
        "text/x-java-source",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Resolve the compressed MIME list for a compression flag and optional explicit list
pub fn content_types_for(enabled: bool, explicit: Option<&[String]>) -> Vec<String> {
    match (enabled, explicit) {
        (false, _) => Vec::new(),
        (true, Some(list)) => list.to_vec(),
        (true, None) => default_content_types(),
    }
}

pub fn build_action(
    name: &str,
    args: &ActionArgs,
    scope: &ResourceScope,
) -> Result<Action, CdnError> {
    let kind: ActionName = name.parse()?;

    let action = match kind {
        ActionName::CacheExpiration => Action::CacheExpiration(CacheExpirationParameters {
            type_name: "DeliveryRuleCacheExpirationActionParameters".to_string(),
            cache_behavior: args.cache_behavior.clone(),
            cache_duration: args.cache_duration.clone(),
            cache_type: "All".to_string(),
        }),
        ActionName::ModifyRequestHeader => Action::ModifyRequestHeader(header_parameters(args)),
        ActionName::ModifyResponseHeader => Action::ModifyResponseHeader(header_parameters(args)),
        ActionName::CacheKeyQueryString => {
            Action::CacheKeyQueryString(CacheKeyQueryStringParameters {
                type_name: "DeliveryRuleCacheKeyQueryStringBehaviorActionParameters".to_string(),
                query_string_behavior: args.query_string_behavior.clone(),
                query_parameters: args.query_parameters.clone(),
            })
        }
        ActionName::UrlRedirect => Action::UrlRedirect(UrlRedirectParameters {
            type_name: "DeliveryRuleUrlRedirectActionParameters".to_string(),
            custom_fragment: args.custom_fragment.clone(),
            custom_hostname: args.custom_hostname.clone(),
            custom_path: args.custom_path.clone(),
            custom_querystring: args.custom_querystring.clone(),
            destination_protocol: args.redirect_protocol.clone(),
            redirect_type: args.redirect_type.clone(),
        }),
        ActionName::UrlRewrite => Action::UrlRewrite(UrlRewriteParameters {
            type_name: "DeliveryRuleUrlRewriteActionParameters".to_string(),
            destination: args.destination.clone(),
            preserve_unmatched_path: args.preserve_unmatched_path,
            source_pattern: args.source_pattern.clone(),
        }),
        ActionName::OriginGroupOverride => {
            let origin_group = args.origin_group.as_deref().ok_or_else(|| {
                CdnError::InvalidArgument(
                    "--origin-group is required for OriginGroupOverride".to_string(),
                )
            })?;
            Action::OriginGroupOverride(OriginGroupOverrideParameters {
                type_name: "DeliveryRuleOriginGroupOverrideActionParameters".to_string(),
                origin_group: ResourceReference {
                    id: scope.expand_origin_group(origin_group),
                },
            })
        }
        ActionName::RouteConfigurationOverride => {
            Action::RouteConfigurationOverride(route_configuration_override(args, scope))
        }
    };

    Ok(action)
}

fn header_parameters(args: &ActionArgs) -> HeaderActionParameters {
    HeaderActionParameters {
        type_name: "DeliveryRuleHeaderActionParameters".to_string(),
        header_action: args.header_action.clone(),
        header_name: args.header_name.clone(),
        value: args.header_value.clone(),
    }
}

fn route_configuration_override(
    args: &ActionArgs,
    scope: &ResourceScope,
) -> RouteConfigurationOverrideParameters {
    // Front Door origin groups live directly under the profile.
    let profile_scope = scope.profile_level();
    let origin_group_override = args.origin_group.as_deref().map(|og| OriginGroupOverride {
        origin_group: ResourceReference {
            id: profile_scope.expand_origin_group(og),
        },
        forwarding_protocol: args.forwarding_protocol.clone(),
    });

    let cache_configuration = if args.enable_caching.unwrap_or(false) {
        let compress = args.enable_compression.unwrap_or(false);
        Some(CacheConfiguration {
            query_string_caching_behavior: args.query_string_caching_behavior.clone(),
            query_parameters: args.query_parameters.clone(),
            cache_behavior: args.cache_behavior.clone(),
            cache_duration: args.cache_duration.clone(),
            is_compression_enabled: if compress {
                COMPRESSION_ENABLED
            } else {
                COMPRESSION_DISABLED
            }
            .to_string(),
            content_types_to_compress: content_types_for(
                compress,
                args.content_types_to_compress.as_deref(),
            ),
        })
    } else {
        None
    };

    RouteConfigurationOverrideParameters {
        type_name: "DeliveryRuleRouteConfigurationOverrideActionParameters".to_string(),
        origin_group_override,
        cache_configuration,
    }
}

/// Rebuild actions from their stored (camelCase) form
pub fn actions_from_existing(
    existing: &[Value],
    scope: &ResourceScope,
) -> Result<Vec<Action>, CdnError> {
    existing
        .iter()
        .map(|value| {
            let item = StoredItem::from_value(value)?;
            let args = args_from_stored(&item)?;
            build_action(&item.name, &args, scope)
        })
        .collect()
}

fn args_from_stored(item: &StoredItem) -> Result<ActionArgs, CdnError> {
    let kind: ActionName = item.name.parse()?;

    let args = match kind {
        ActionName::CacheExpiration => ActionArgs {
            cache_behavior: item.str("cacheBehavior"),
            cache_duration: item.str("cacheDuration"),
            ..Default::default()
        },
        ActionName::ModifyRequestHeader | ActionName::ModifyResponseHeader => ActionArgs {
            header_action: item.str("headerAction"),
            header_name: item.str("headerName"),
            header_value: item.str("value"),
            ..Default::default()
        },
        ActionName::CacheKeyQueryString => ActionArgs {
            query_string_behavior: item.str("queryStringBehavior"),
            query_parameters: item.str("queryParameters"),
            ..Default::default()
        },
        ActionName::UrlRedirect => ActionArgs {
            custom_fragment: item.str("customFragment"),
            custom_hostname: item.str("customHostname"),
            custom_path: item.str("customPath"),
            custom_querystring: item.str("customQueryString"),
            redirect_protocol: item.str("destinationProtocol"),
            redirect_type: item.str("redirectType"),
            ..Default::default()
        },
        ActionName::UrlRewrite => ActionArgs {
            destination: item.str("destination"),
            preserve_unmatched_path: item.bool("preserveUnmatchedPath"),
            source_pattern: item.str("sourcePattern"),
            ..Default::default()
        },
        ActionName::OriginGroupOverride => ActionArgs {
            origin_group: item
                .object("originGroup")
                .and_then(|og| str_field(og, "id")),
            ..Default::default()
        },
        ActionName::RouteConfigurationOverride => {
            let override_ = item.object("originGroupOverride");
            let cache = item.object("cacheConfiguration");
            ActionArgs {
                origin_group: override_
                    .and_then(|o| o.get("originGroup"))
                    .and_then(Value::as_object)
                    .and_then(|og| str_field(og, "id")),
                forwarding_protocol: override_.and_then(|o| str_field(o, "forwardingProtocol")),
                query_string_caching_behavior: cache
                    .and_then(|c| str_field(c, "queryStringCachingBehavior")),
                query_parameters: cache.and_then(|c| str_field(c, "queryParameters")),
                cache_behavior: cache.and_then(|c| str_field(c, "cacheBehavior")),
                cache_duration: cache.and_then(|c| str_field(c, "cacheDuration")),
                enable_caching: Some(cache.is_some()),
                enable_compression: Some(
                    cache
                        .and_then(|c| str_field(c, "isCompressionEnabled"))
                        .map(|v| v == COMPRESSION_ENABLED)
                        .unwrap_or(false),
                ),
                content_types_to_compress: cache
                    .and_then(|c| string_list(c, "contentTypesToCompress")),
                ..Default::default()
            }
        }
    };

    Ok(args)
}
