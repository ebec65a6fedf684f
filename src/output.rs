//! JSON Lines output protocol
//!
//! - All JSON Lines include schema version (v: 1)
//! - stdout = results (JSON Lines in agent mode)
//! - stderr = human logs

use serde::Serialize;
use serde_json::{json, Value};

use crate::arm::ArmError;
use crate::error::CdnError;
use crate::rules::ResourceId;

const SCHEMA_VERSION: u8 = 1;

/// Event wrapper with schema version
#[derive(Serialize)]
struct Event<T: Serialize> {
    v: u8,
    #[serde(rename = "type")]
    event_type: String,
    payload: T,
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.unwrap_or_else(|e| format!("{{\"serialization_error\":\"{}\"}}", e))
}

fn emit<T: Serialize>(event_type: &str, payload: T) {
    let event = Event {
        v: SCHEMA_VERSION,
        event_type: event_type.to_string(),
        payload,
    };
    println!("{}", to_json(&event, false));
}

/// Output handler
pub struct Output {
    agent_mode: bool,
}

impl Output {
    pub fn new(agent_mode: bool) -> Self {
        Self { agent_mode }
    }

    /// Log message (stderr for human, JSON Lines for agent)
    pub fn log(&self, level: &str, message: &str) {
        if self.agent_mode {
            emit("log", json!({"level": level, "message": message}));
        } else {
            eprintln!("[{}] {}", level.to_uppercase(), message);
        }
    }

    /// Final result (always JSON to stdout)
    pub fn result<T: Serialize>(&self, data: T) {
        if self.agent_mode {
            emit("result", data);
        } else {
            println!("{}", to_json(&data, true));
        }
    }

    /// Report the error and exit with its category's code
    pub fn error(&self, err: ErrorEvent) -> ! {
        if self.agent_mode {
            emit("error", &err);
        } else {
            eprintln!(
                "Error [{}][{}]: {}",
                err.cat,
                err.code,
                err.message.as_deref().unwrap_or("")
            );
            if err.retryable {
                if let Some(s) = err.retry_after_s {
                    eprintln!("  Retry after: {}s", s);
                }
            }
            eprintln!("  Fix: {:?}", err.fix);
        }
        std::process::exit(err.exit_code());
    }
}

/// Error event payload
#[derive(Debug, Serialize)]
pub struct ErrorEvent {
    pub code: String,
    pub cat: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_s: Option<u32>,
    pub fix: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorEvent {
    fn new(code: &str, cat: &str, message: &str, retry_after_s: Option<u32>, fix: &[&str]) -> Self {
        Self {
            code: code.into(),
            cat: cat.into(),
            op: None,
            retryable: retry_after_s.is_some(),
            retry_after_s,
            fix: fix.iter().map(|f| f.to_string()).collect(),
            message: Some(message.into()),
            details: None,
        }
    }

    /// Network error
    pub fn net(code: &str, message: &str) -> Self {
        Self::new(code, "net", message, Some(5), &["proxy", "wait"])
    }

    /// Input error
    pub fn input(code: &str, message: &str) -> Self {
        Self::new(code, "in", message, None, &["param"])
    }

    /// Auth error
    pub fn auth(code: &str, message: &str) -> Self {
        Self::new(code, "auth", message, None, &["auth"])
    }

    /// External service error
    pub fn ext(code: &str, message: &str) -> Self {
        Self::new(code, "ext", message, Some(5), &["wait", "report"])
    }

    /// System error
    pub fn sys(code: &str, message: &str) -> Self {
        Self::new(code, "sys", message, None, &["report"])
    }

    /// Timeout error
    pub fn timeout(code: &str, message: &str, retry_after: u32) -> Self {
        Self::new(code, "time", message, Some(retry_after), &["wait"])
    }

    /// Add operation context
    pub fn with_op(mut self, op: &str) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add details
    pub fn with_details<T: Serialize>(mut self, details: T) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// Pick the category from the typed error inside an anyhow chain
    pub fn from_error(err: &anyhow::Error) -> Self {
        let message = format!("{:#}", err);

        if let Some(cdn) = err.downcast_ref::<CdnError>() {
            let event = ErrorEvent::input(cdn.code(), &message);
            return match cdn {
                CdnError::NotFound { kind, id } => {
                    event.with_details(json!({"kind": kind, "id": id, "resource": ResourceId::parse(id)}))
                }
                _ => event,
            };
        }

        if let Some(arm) = err.downcast_ref::<ArmError>() {
            return match arm {
                ArmError::NotFound(id) => {
                    ErrorEvent::input(arm.code(), &message)
                        .with_details(json!({"id": id, "resource": ResourceId::parse(id)}))
                }
                ArmError::Auth { .. } => ErrorEvent::auth(arm.code(), &message),
                ArmError::Transport(_) => ErrorEvent::net(arm.code(), &message),
                ArmError::Timeout(_) => ErrorEvent::timeout(arm.code(), &message, 30),
                ArmError::Status { status, .. } if *status < 500 => {
                    ErrorEvent::input(arm.code(), &message)
                }
                ArmError::Status { .. } | ArmError::OperationFailed { .. } => {
                    ErrorEvent::ext(arm.code(), &message)
                }
                ArmError::Decode(_) | ArmError::Store(_) => ErrorEvent::sys(arm.code(), &message),
            };
        }

        if message.starts_with("Missing") {
            return ErrorEvent::input("MISSING_CONFIG", &message);
        }
        ErrorEvent::sys("INTERNAL", &message)
    }

    /// Get exit code based on category
    pub fn exit_code(&self) -> i32 {
        match self.cat.as_str() {
            "in" => 1,
            "auth" => 3,
            "time" => 4,
            _ => 2,
        }
    }
}

fn scope_options(endpoint: bool) -> Vec<Value> {
    let mut opts = vec![
        json!({"name": "resource-group", "short": "g", "type": "string", "required": true}),
        json!({"name": "profile-name", "type": "string", "required": true}),
    ];
    if endpoint {
        opts.push(json!({"name": "endpoint-name", "type": "string", "required": true}));
    }
    opts
}

fn action(id: &str, summary: &str, endpoint: bool, extra: Value) -> Value {
    let mut options = scope_options(endpoint);
    if let Value::Array(items) = extra {
        options.extend(items);
    }
    json!({"id": id, "summary": summary, "args": [], "options": options})
}

/// Print manifest (--manifest)
pub fn print_manifest() {
    let condition_opts = json!([
        {"name": "match-variable", "type": "string"},
        {"name": "operator", "type": "string"},
        {"name": "match-values", "type": "list"},
        {"name": "selector", "type": "string"},
        {"name": "negate-condition", "type": "bool"},
        {"name": "transform", "type": "list"}
    ]);
    let rule_set = json!([
        {"name": "rule-set-name", "type": "string", "required": true},
        {"name": "rule-name", "type": "string", "required": true}
    ]);

    let manifest = json!({
        "schema_version": "1.0",
        "tool": {
            "name": "cdnctl",
            "display_name": "Azure CDN / Front Door delivery rules",
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION")
        },
        "capabilities": {
            "agent": true,
            "interactive": false,
            "streaming": false,
            "resume": false
        },
        "actions": [
            action("endpoint-rule.add", "Add a delivery rule to an endpoint", true, json!([
                {"name": "rule-name", "type": "string"},
                {"name": "order", "type": "integer", "required": true},
                {"name": "action-name", "type": "string", "required": true}
            ])),
            action("endpoint-rule.remove", "Remove a delivery rule by name or order", true, json!([
                {"name": "rule-name", "type": "string"},
                {"name": "order", "type": "integer"}
            ])),
            action("endpoint-rule.show", "Show the delivery policy", true, json!([])),
            action("endpoint-rule.condition-add", "Append a condition", true, condition_opts.clone()),
            action("endpoint-rule.condition-remove", "Remove a condition by index", true, json!([
                {"name": "rule-name", "type": "string", "required": true},
                {"name": "index", "type": "integer", "required": true}
            ])),
            action("endpoint-rule.action-add", "Append an action", true, json!([
                {"name": "rule-name", "type": "string", "required": true},
                {"name": "action-name", "type": "string", "required": true}
            ])),
            action("endpoint-rule.action-remove", "Remove an action by index", true, json!([
                {"name": "rule-name", "type": "string", "required": true},
                {"name": "index", "type": "integer", "required": true}
            ])),
            action("afd-rule-set.create", "Create a Front Door rule set", false, json!([
                {"name": "rule-set-name", "type": "string", "required": true}
            ])),
            action("afd-rule-set.delete", "Delete a Front Door rule set", false, json!([
                {"name": "rule-set-name", "type": "string", "required": true}
            ])),
            action("afd-rule-set.show", "Show a Front Door rule set", false, json!([
                {"name": "rule-set-name", "type": "string", "required": true}
            ])),
            action("afd-rule.create", "Create a Front Door rule", false, rule_set.clone()),
            action("afd-rule.delete", "Delete a Front Door rule", false, rule_set.clone()),
            action("afd-rule.show", "Show a Front Door rule", false, rule_set.clone()),
            action("afd-rule.condition-add", "Append a condition", false, rule_set.clone()),
            action("afd-rule.condition-remove", "Remove a condition by index", false, rule_set.clone()),
            action("afd-rule.condition-list", "List conditions", false, rule_set.clone()),
            action("afd-rule.action-add", "Append an action", false, rule_set.clone()),
            action("afd-rule.action-remove", "Remove an action by index", false, rule_set.clone()),
            action("afd-rule.action-list", "List actions", false, rule_set),
            action("afd-origin-group.create", "Create a Front Door origin group", false, json!([
                {"name": "origin-group-name", "type": "string", "required": true},
                {"name": "sample-size", "type": "integer", "required": true},
                {"name": "successful-samples-required", "type": "integer", "required": true},
                {"name": "additional-latency-in-milliseconds", "type": "integer", "required": true},
                {"name": "probe-request-type", "type": "string", "required": true},
                {"name": "probe-protocol", "type": "string", "required": true},
                {"name": "probe-path", "type": "string", "required": true},
                {"name": "probe-interval-in-seconds", "type": "integer", "default": 240}
            ])),
            action("afd-origin-group.update", "Update a Front Door origin group", false, json!([
                {"name": "origin-group-name", "type": "string", "required": true}
            ])),
            action("afd-origin.create", "Create a Front Door origin", false, json!([
                {"name": "origin-group-name", "type": "string", "required": true},
                {"name": "origin-name", "type": "string", "required": true},
                {"name": "host-name", "type": "string", "required": true},
                {"name": "priority", "type": "integer", "default": 1},
                {"name": "weight", "type": "integer", "default": 1000}
            ])),
            action("afd-origin.update", "Update a Front Door origin", false, json!([
                {"name": "origin-group-name", "type": "string", "required": true},
                {"name": "origin-name", "type": "string", "required": true}
            ])),
            action("afd-route.create", "Create a Front Door route", true, json!([
                {"name": "route-name", "type": "string", "required": true},
                {"name": "origin-group", "type": "string", "required": true},
                {"name": "enable-caching", "type": "bool", "default": true}
            ])),
            action("afd-route.update", "Update a Front Door route", true, json!([
                {"name": "route-name", "type": "string", "required": true}
            ])),
            action("origin-group.create", "Create a CDN origin group", true, json!([
                {"name": "name", "type": "string", "required": true},
                {"name": "probe-method", "type": "string", "default": "HEAD"},
                {"name": "probe-protocol", "type": "string", "default": "HTTP"},
                {"name": "probe-interval", "type": "integer", "default": 240}
            ])),
            action("origin-group.update", "Update a CDN origin group", true, json!([
                {"name": "name", "type": "string", "required": true}
            ]))
        ],
        "permissions": {
            "network": true,
            "network_domains": ["management.azure.com"],
            "filesystem": {
                "read": ["$CDNCTL_PROJECT_DIR"],
                "write": ["$CDNCTL_STORE"]
            },
            "env_vars": [
                "AZURE_SUBSCRIPTION_ID",
                "AZURE_ACCESS_TOKEN",
                "AZURE_RESOURCE_MANAGER_URL",
                "CDNCTL_API_VERSION",
                "CDNCTL_STORE"
            ]
        },
        "limits": {
            "default_timeout_s": 600,
            "max_output_mb": 10
        }
    });

    println!("{}", to_json(&manifest, true));
}
