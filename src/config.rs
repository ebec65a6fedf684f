//! Configuration loading (.env + environment)

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::arm::{ArmClient, LocalStore, ResourceStore};

pub const DEFAULT_RESOURCE_MANAGER_URL: &str = "https://management.azure.com";
pub const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Project directory (where .env lives)
pub fn project_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CDNCTL_PROJECT_DIR") {
        return PathBuf::from(dir);
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Load .env if the project has one
pub fn load_env() -> Result<()> {
    let env_path = project_dir().join(".env");
    if !env_path.exists() {
        return Ok(());
    }
    dotenvy::from_path(&env_path)
        .with_context(|| format!("Failed to load .env from {:?}", env_path))?;
    Ok(())
}

/// Connection settings for Azure Resource Manager
#[derive(Debug, Clone)]
pub struct ArmSettings {
    pub base_url: String,
    pub token: String,
    pub api_version: String,
}

impl ArmSettings {
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("AZURE_ACCESS_TOKEN").with_context(|| {
            "Missing env var: AZURE_ACCESS_TOKEN. Add it to your .env file or set CDNCTL_STORE for offline edits."
        })?;
        Ok(Self {
            base_url: env_or("AZURE_RESOURCE_MANAGER_URL", DEFAULT_RESOURCE_MANAGER_URL),
            token,
            api_version: env_or("CDNCTL_API_VERSION", DEFAULT_API_VERSION),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// `--subscription` wins over AZURE_SUBSCRIPTION_ID
pub fn subscription_id(flag: Option<String>) -> Result<String> {
    if let Some(sub) = flag.filter(|s| !s.is_empty()) {
        return Ok(sub);
    }
    std::env::var("AZURE_SUBSCRIPTION_ID").with_context(|| {
        "Missing subscription: pass --subscription or set AZURE_SUBSCRIPTION_ID in your .env file."
    })
}

/// Offline JSON store when CDNCTL_STORE is set, the ARM REST API otherwise
pub fn open_store(no_wait: bool) -> Result<Box<dyn ResourceStore>> {
    if let Ok(path) = std::env::var("CDNCTL_STORE") {
        let path = PathBuf::from(path);
        let path = if path.is_relative() {
            project_dir().join(path)
        } else {
            path
        };
        tracing::debug!(path = ?path, "using local store");
        return Ok(Box::new(LocalStore::open(path)?));
    }

    let settings = ArmSettings::from_env()?;
    tracing::debug!(base_url = %settings.base_url, api_version = %settings.api_version, "using ARM");
    Ok(Box::new(ArmClient::new(&settings, no_wait)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_subscription_wins() {
        assert_eq!(subscription_id(Some("sub-flag".into())).unwrap(), "sub-flag");
    }

    #[test]
    fn env_or_ignores_empty_values() {
        assert_eq!(env_or("CDNCTL_TEST_UNSET_VARIABLE", "fallback"), "fallback");
    }
}
