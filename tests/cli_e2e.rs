//! End-to-end runs of the binary against an offline resource file

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const PROFILE: &str = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Cdn/profiles/prof1";

fn endpoint_id() -> String {
    format!("{}/endpoints/ep1", PROFILE)
}

fn seed(dir: &TempDir, sku: &str) -> PathBuf {
    let path = dir.path().join("resources.json");
    let resources = json!({
        PROFILE: {"sku": {"name": sku}},
        endpoint_id(): {"location": "global", "properties": {"isHttpAllowed": true}}
    });
    std::fs::write(&path, serde_json::to_string_pretty(&resources).unwrap()).unwrap();
    path
}

fn cdnctl(dir: &Path, store: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cdnctl"))
        .args(args)
        .env("CDNCTL_PROJECT_DIR", dir)
        .env("CDNCTL_STORE", store)
        .env("AZURE_SUBSCRIPTION_ID", "sub1")
        .env_remove("AZURE_ACCESS_TOKEN")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run cdnctl")
}

/// `endpoint-rule <action> <scope flags> <rest>`
fn endpoint_args<'a>(action: &'a str, rest: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec![
        "endpoint-rule",
        action,
        "-g",
        "rg1",
        "--profile-name",
        "prof1",
        "--endpoint-name",
        "ep1",
    ];
    args.extend_from_slice(rest);
    args
}

fn stored_endpoint(store: &Path) -> Value {
    let content = std::fs::read_to_string(store).unwrap();
    let resources: Value = serde_json::from_str(&content).unwrap();
    let id = endpoint_id();
    resources
        .as_object()
        .unwrap()
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(&id))
        .map(|(_, value)| value.clone())
        .expect("endpoint missing from store")
}

/// Last JSON Lines event on stdout
fn last_event(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().last().expect("no output");
    serde_json::from_str(line).unwrap()
}

#[test]
fn add_rule_writes_delivery_policy() {
    let dir = TempDir::new().unwrap();
    let store = seed(&dir, "Standard_Microsoft");

    let output = cdnctl(
        dir.path(),
        &store,
        &endpoint_args(
            "add",
            &[
                "--rule-name",
                "r1",
                "--order",
                "1",
                "--match-variable",
                "RequestScheme",
                "--match-values",
                "HTTPS",
                "--action-name",
                "CacheExpiration",
                "--cache-behavior",
                "Override",
                "--cache-duration",
                "01:00:00",
            ],
        ),
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["success"], true);

    let endpoint = stored_endpoint(&store);
    assert_eq!(endpoint["properties"]["isHttpAllowed"], true);
    let rule = &endpoint["properties"]["deliveryPolicy"]["rules"][0];
    assert_eq!(rule["name"], "r1");
    assert_eq!(rule["conditions"][0]["parameters"]["operator"], "Equal");
    assert_eq!(rule["actions"][0]["parameters"]["cacheType"], "All");
}

#[test]
fn agent_mode_emits_versioned_events() {
    let dir = TempDir::new().unwrap();
    let store = seed(&dir, "Standard_Verizon");

    let mut args = vec!["--agent"];
    args.extend(endpoint_args(
        "add",
        &[
            "--order",
            "1",
            "--action-name",
            "ModifyResponseHeader",
            "--header-action",
            "Append",
            "--header-name",
            "x-cdn",
            "--header-value",
            "1",
        ],
    ));
    let output = cdnctl(dir.path(), &store, &args);
    assert!(output.status.success());

    let event = last_event(&output);
    assert_eq!(event["v"], 1);
    assert_eq!(event["type"], "result");
    assert_eq!(
        event["payload"]["deliveryPolicy"]["rules"][0]["actions"][0]["name"],
        "ModifyResponseHeader"
    );
}

#[test]
fn unnamed_rule_on_microsoft_sku_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = seed(&dir, "Standard_Microsoft");

    let mut args = vec!["--agent"];
    args.extend(endpoint_args("add", &["--order", "1", "--action-name", "CacheExpiration"]));
    let output = cdnctl(dir.path(), &store, &args);

    assert_eq!(output.status.code(), Some(1));
    let event = last_event(&output);
    assert_eq!(event["type"], "error");
    assert_eq!(event["payload"]["code"], "RULE_NAME_REQUIRED");
    assert!(stored_endpoint(&store)["properties"].get("deliveryPolicy").is_none());
}

#[test]
fn negative_order_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = seed(&dir, "Standard_Microsoft");

    let mut args = vec!["--agent"];
    args.extend(endpoint_args("remove", &["--order", "-1"]));
    let output = cdnctl(dir.path(), &store, &args);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(last_event(&output)["payload"]["code"], "NEGATIVE_ORDER");
}

#[test]
fn missing_rule_removal_is_a_warning() {
    let dir = TempDir::new().unwrap();
    let store = seed(&dir, "Standard_Microsoft");

    let output = cdnctl(
        dir.path(),
        &store,
        &endpoint_args("remove", &["--rule-name", "nope"]),
    );
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("rule cannot be found").count(), 1, "stderr: {}", stderr);

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["applied"], false);
}

#[test]
fn missing_endpoint_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let store = seed(&dir, "Standard_Microsoft");

    let output = cdnctl(
        dir.path(),
        &store,
        &[
            "--agent",
            "endpoint-rule",
            "show",
            "-g",
            "rg1",
            "--profile-name",
            "prof1",
            "--endpoint-name",
            "missing",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    let payload = &last_event(&output)["payload"];
    assert_eq!(payload["code"], "NOT_FOUND");
    assert!(payload["message"]
        .as_str()
        .unwrap()
        .starts_with("Endpoint not found. Please verify the resource(s) exist:"));
}

#[test]
fn origin_weight_out_of_range_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = seed(&dir, "Standard_AzureFrontDoor");

    let output = cdnctl(
        dir.path(),
        &store,
        &[
            "--agent",
            "afd-origin",
            "create",
            "-g",
            "rg1",
            "--profile-name",
            "prof1",
            "--origin-group-name",
            "og1",
            "--origin-name",
            "o1",
            "--host-name",
            "contoso.com",
            "--weight",
            "0",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(last_event(&output)["payload"]["code"], "OUT_OF_RANGE");
}

#[test]
fn manifest_lists_rule_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_cdnctl"))
        .arg("--manifest")
        .output()
        .unwrap();
    assert!(output.status.success());
    let manifest: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(manifest["tool"]["name"], "cdnctl");
    let ids: Vec<&str> = manifest["actions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["id"].as_str())
        .collect();
    assert!(ids.contains(&"afd-rule.condition-remove"));
    assert!(ids.contains(&"endpoint-rule.add"));
}

#[test]
fn rule_set_holds_front_door_rules() {
    let dir = TempDir::new().unwrap();
    let store = seed(&dir, "Standard_AzureFrontDoor");
    let scope = ["-g", "rg1", "--profile-name", "prof1", "--rule-set-name", "rs1"];

    let mut args = vec!["afd-rule-set", "create"];
    args.extend_from_slice(&scope);
    let output = cdnctl(dir.path(), &store, &args);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let mut args = vec!["afd-rule", "create"];
    args.extend_from_slice(&scope);
    args.extend_from_slice(&[
        "--rule-name",
        "r1",
        "--order",
        "1",
        "--action-name",
        "CacheExpiration",
        "--cache-behavior",
        "BypassCache",
    ]);
    let output = cdnctl(dir.path(), &store, &args);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let mut args = vec!["--agent", "afd-rule-set", "show"];
    args.extend_from_slice(&scope);
    let output = cdnctl(dir.path(), &store, &args);
    assert!(output.status.success());
    assert_eq!(last_event(&output)["payload"], json!({"properties": {}}));
}
