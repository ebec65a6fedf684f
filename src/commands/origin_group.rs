//! Classic CDN origin groups

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{decode_properties, set_properties, Context};
use crate::arm::{not_found_as, update_resource, ResourceStore};
use crate::cli::{ErrorDetectionFlags, OriginGroupAction, OriginGroupCommand};
use crate::error::CdnError;
use crate::output::Output;
use crate::rules::action::ResourceReference;
use crate::rules::ResourceScope;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthProbeSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_request_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_interval_in_seconds: Option<u32>,
}

impl HealthProbeSettings {
    /// Fill unset fields from `existing`
    pub fn or(self, existing: HealthProbeSettings) -> Self {
        HealthProbeSettings {
            probe_path: self.probe_path.or(existing.probe_path),
            probe_request_type: self.probe_request_type.or(existing.probe_request_type),
            probe_protocol: self.probe_protocol.or(existing.probe_protocol),
            probe_interval_in_seconds: self
                .probe_interval_in_seconds
                .or(existing.probe_interval_in_seconds),
        }
    }
}

/// The part of a stored origin group the update reads back
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredGroup {
    health_probe_settings: Option<HealthProbeSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorRange {
    pub begin: u16,
    pub end: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetectionSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_based_detected_error_types: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_based_failover_threshold_percentage: Option<u32>,
    #[serde(default)]
    pub http_error_ranges: Vec<HttpErrorRange>,
}

/// Parse `500-599,404` into status ranges; a single code is a one-code range.
pub fn parse_ranges(ranges: &str) -> Result<Vec<HttpErrorRange>, CdnError> {
    ranges
        .split(',')
        .map(|range| {
            let invalid = || CdnError::InvalidRange(range.to_string());
            let parts: Vec<&str> = range.trim().split('-').collect();
            let (begin, end) = match parts.as_slice() {
                [code] => (*code, *code),
                [begin, end] => (*begin, *end),
                _ => return Err(invalid()),
            };
            let begin: u16 = begin.trim().parse().map_err(|_| invalid())?;
            let end: u16 = end.trim().parse().map_err(|_| invalid())?;
            if begin > end {
                return Err(invalid());
            }
            Ok(HttpErrorRange { begin, end })
        })
        .collect()
}

pub(crate) fn probe_method(value: &str) -> Result<String, CdnError> {
    match value.to_uppercase().as_str() {
        "GET" => Ok("GET".into()),
        "HEAD" => Ok("HEAD".into()),
        "NOTSET" => Ok("NotSet".into()),
        _ => Err(CdnError::InvalidArgument(format!(
            "unsupported probe method: {}",
            value
        ))),
    }
}

pub(crate) fn probe_protocol(value: &str) -> Result<String, CdnError> {
    match value.to_uppercase().as_str() {
        "HTTP" => Ok("Http".into()),
        "HTTPS" => Ok("Https".into()),
        "NOTSET" => Ok("NotSet".into()),
        _ => Err(CdnError::InvalidArgument(format!(
            "unsupported probe protocol: {}",
            value
        ))),
    }
}

/// Resolve an update flag: unset keeps `existing`, empty clears, anything else is normalized
fn overlay<T>(
    flag: Option<&str>,
    existing: Option<T>,
    normalize: impl Fn(&str) -> Result<T, CdnError>,
) -> Result<Option<T>, CdnError> {
    match flag {
        None => Ok(existing),
        Some("") => Ok(None),
        Some(value) => normalize(value).map(Some),
    }
}

fn origins(scope: &ResourceScope, list: &str) -> Vec<ResourceReference> {
    list.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| ResourceReference {
            id: scope.expand_origin(o),
        })
        .collect()
}

fn error_detection(flags: &ErrorDetectionFlags) -> Result<Option<ErrorDetectionSettings>, CdnError> {
    if flags.response_error_detection_error_types.is_none()
        && flags.response_error_detection_failover_threshold.is_none()
        && flags.response_error_detection_status_code_ranges.is_none()
    {
        return Ok(None);
    }
    Ok(Some(ErrorDetectionSettings {
        response_based_detected_error_types: flags.response_error_detection_error_types.clone(),
        response_based_failover_threshold_percentage: flags
            .response_error_detection_failover_threshold,
        http_error_ranges: match &flags.response_error_detection_status_code_ranges {
            Some(ranges) => parse_ranges(ranges)?,
            None => Vec::new(),
        },
    }))
}

pub struct ProbeFlags<'a> {
    pub path: Option<&'a str>,
    pub method: Option<&'a str>,
    pub protocol: Option<&'a str>,
    pub interval: Option<&'a str>,
}

pub async fn run(cmd: OriginGroupCommand, ctx: &Context<'_>, out: &Output) -> Result<()> {
    match cmd.action {
        OriginGroupAction::Create {
            target,
            probe_path,
            probe_method: method,
            probe_protocol: protocol,
            probe_interval,
            origins: origin_list,
            error_detection: detection,
        } => {
            let scope = ctx.endpoint_scope(&target.endpoint);
            let probe = HealthProbeSettings {
                probe_path,
                probe_request_type: Some(probe_method(&method)?),
                probe_protocol: Some(probe_protocol(&protocol)?),
                probe_interval_in_seconds: Some(probe_interval),
            };
            let detection = error_detection(&detection)?;
            let origin_refs = origins(&scope, origin_list.as_deref().unwrap_or_default());
            let body = json!({
                "properties": {
                    "origins": origin_refs,
                    "healthProbeSettings": probe,
                    "responseBasedOriginErrorDetectionSettings": detection,
                }
            });

            out.log("info", &format!("Creating origin group {}", target.name));
            let stored = ctx
                .store
                .put(&group_id(&scope, &target.name)?, &body)
                .await
                .map_err(|e| not_found_as(e.into(), "Endpoint"))?;
            out.result(json!({"success": true, "originGroup": stored}));
        }

        OriginGroupAction::Update {
            target,
            probe_path,
            probe_method,
            probe_protocol,
            probe_interval,
            origins,
            error_detection,
        } => {
            let scope = ctx.endpoint_scope(&target.endpoint);
            let probe = ProbeFlags {
                path: probe_path.as_deref(),
                method: probe_method.as_deref(),
                protocol: probe_protocol.as_deref(),
                interval: probe_interval.as_deref(),
            };

            out.log("info", &format!("Updating origin group {}", target.name));
            let stored = update(
                ctx.store,
                &scope,
                &group_id(&scope, &target.name)?,
                &probe,
                origins.as_deref(),
                &error_detection,
            )
            .await?;
            out.result(json!({"success": true, "originGroup": stored}));
        }
    }

    Ok(())
}

fn group_id(scope: &ResourceScope, name: &str) -> Result<String> {
    let endpoint = scope
        .endpoint_path()
        .context("endpoint name is required for origin group commands")?;
    Ok(format!("{}/originGroups/{}", endpoint, name))
}

pub async fn update(
    store: &dyn ResourceStore,
    scope: &ResourceScope,
    id: &str,
    probe: &ProbeFlags<'_>,
    origin_list: Option<&str>,
    detection: &ErrorDetectionFlags,
) -> Result<Value> {
    let detection = error_detection(detection)?;

    let (stored, _) = update_resource(store, id, |resource| {
        let stored: StoredGroup = decode_properties(resource)?;
        let existing = stored.health_probe_settings.unwrap_or_default();

        let settings = HealthProbeSettings {
            probe_path: overlay(probe.path, existing.probe_path, |v| Ok(v.to_string()))?,
            probe_request_type: overlay(probe.method, existing.probe_request_type, probe_method)?,
            probe_protocol: overlay(probe.protocol, existing.probe_protocol, probe_protocol)?,
            probe_interval_in_seconds: overlay(
                probe.interval,
                existing.probe_interval_in_seconds,
                |v| {
                    v.parse().map_err(|_| {
                        CdnError::InvalidArgument(format!("invalid probe interval: {}", v))
                    })
                },
            )?,
        };

        let mut patch = json!({ "healthProbeSettings": settings });
        if let Some(list) = origin_list.filter(|l| !l.is_empty()) {
            patch["origins"] = json!(origins(scope, list));
        }
        if let Some(detection) = &detection {
            patch["responseBasedOriginErrorDetectionSettings"] = json!(detection);
        }
        set_properties(resource, patch)
    })
    .await
    .map_err(|e| not_found_as(e, "Origin group"))?;
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::LocalStore;

    fn scope() -> ResourceScope {
        ResourceScope::profile("sub1", "rg1", "prof1").with_endpoint("ep1")
    }

    fn no_probe_changes() -> ProbeFlags<'static> {
        ProbeFlags {
            path: None,
            method: None,
            protocol: None,
            interval: None,
        }
    }

    async fn seeded() -> (LocalStore, String) {
        let store = LocalStore::in_memory();
        let id = group_id(&scope(), "og1").unwrap();
        store.insert(
            &id,
            json!({"properties": {
                "origins": [{"id": "/o/1"}],
                "healthProbeSettings": {
                    "probePath": "/health",
                    "probeRequestType": "HEAD",
                    "probeProtocol": "Http",
                    "probeIntervalInSeconds": 240
                }
            }}),
        );
        (store, id)
    }

    #[test]
    fn ranges_parse_singles_and_spans() {
        assert_eq!(
            parse_ranges("500-599,404").unwrap(),
            vec![
                HttpErrorRange { begin: 500, end: 599 },
                HttpErrorRange { begin: 404, end: 404 }
            ]
        );
    }

    #[test]
    fn malformed_ranges_are_user_errors() {
        for bad in ["500-599-600", "abc", "599-500", ""] {
            assert!(
                matches!(parse_ranges(bad), Err(CdnError::InvalidRange(_))),
                "{} should be rejected",
                bad
            );
        }
        let err = parse_ranges("1-2-3").unwrap_err();
        assert_eq!(err.to_string(), "range \"1-2-3\" is invalid");
    }

    #[test]
    fn probe_values_are_normalized() {
        assert_eq!(probe_method("head").unwrap(), "HEAD");
        assert_eq!(probe_protocol("https").unwrap(), "Https");
        assert!(probe_protocol("ftp").is_err());
    }

    #[test]
    fn origin_names_expand_to_endpoint_origins() {
        let refs = origins(&scope(), "o1, /subscriptions/x/origins/o2");
        assert!(refs[0].id.ends_with("/profiles/prof1/endpoints/ep1/origins/o1"));
        assert_eq!(refs[1].id, "/subscriptions/x/origins/o2");
    }

    #[tokio::test]
    async fn update_merges_probe_settings() {
        let (store, id) = seeded().await;
        let probe = ProbeFlags {
            method: Some("get"),
            ..no_probe_changes()
        };
        let stored = update(&store, &scope(), &id, &probe, None, &ErrorDetectionFlags::default())
            .await
            .unwrap();
        let settings = &stored["properties"]["healthProbeSettings"];
        assert_eq!(settings["probeRequestType"], "GET");
        assert_eq!(settings["probePath"], "/health");
        assert_eq!(settings["probeIntervalInSeconds"], 240);
        assert_eq!(stored["properties"]["origins"], json!([{"id": "/o/1"}]));
    }

    #[tokio::test]
    async fn empty_string_clears_a_probe_field() {
        let (store, id) = seeded().await;
        let probe = ProbeFlags {
            path: Some(""),
            interval: Some(""),
            ..no_probe_changes()
        };
        let stored = update(&store, &scope(), &id, &probe, None, &ErrorDetectionFlags::default())
            .await
            .unwrap();
        let settings = &stored["properties"]["healthProbeSettings"];
        assert!(settings.get("probePath").is_none());
        assert!(settings.get("probeIntervalInSeconds").is_none());
        assert_eq!(settings["probeProtocol"], "Http");
    }

    #[tokio::test]
    async fn malformed_probe_settings_are_reported() {
        let store = LocalStore::in_memory();
        let id = group_id(&scope(), "og1").unwrap();
        store.insert(&id, json!({"properties": {"healthProbeSettings": {"probeIntervalInSeconds": "often"}}}));
        let err = update(&store, &scope(), &id, &no_probe_changes(), None, &ErrorDetectionFlags::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::arm::ArmError>(),
            Some(crate::arm::ArmError::Decode(_))
        ));
    }

    #[test]
    fn unset_probe_fields_fall_back_to_existing() {
        let changes = HealthProbeSettings {
            probe_protocol: Some("Https".into()),
            ..Default::default()
        };
        let existing = HealthProbeSettings {
            probe_path: Some("/health".into()),
            probe_protocol: Some("Http".into()),
            ..Default::default()
        };
        let merged = changes.or(existing);
        assert_eq!(merged.probe_protocol.as_deref(), Some("Https"));
        assert_eq!(merged.probe_path.as_deref(), Some("/health"));
        assert_eq!(merged.probe_interval_in_seconds, None);
    }

    #[tokio::test]
    async fn bad_range_on_update_writes_nothing() {
        let (store, id) = seeded().await;
        let detection = ErrorDetectionFlags {
            response_error_detection_status_code_ranges: Some("5xx".into()),
            ..Default::default()
        };
        let err = update(&store, &scope(), &id, &no_probe_changes(), Some("o9"), &detection)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CdnError>(),
            Some(CdnError::InvalidRange(_))
        ));
        let stored = store.get(&id).await.unwrap();
        assert_eq!(stored["properties"]["origins"], json!([{"id": "/o/1"}]));
    }
}
