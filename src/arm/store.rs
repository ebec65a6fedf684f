//! Resource access seam: remote ARM client or a local JSON file

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

use super::ArmError;

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Value, ArmError>;

    /// Create or replace; returns the stored resource
    async fn put(&self, id: &str, body: &Value) -> Result<Value, ArmError>;

    async fn delete(&self, id: &str) -> Result<(), ArmError>;
}

/// Fetch `id`, let `apply` edit it in place, then write the whole resource back.
pub async fn update_resource<T, F>(
    store: &dyn ResourceStore,
    id: &str,
    apply: F,
) -> Result<(Value, T)>
where
    F: FnOnce(&mut Value) -> Result<T>,
{
    let mut resource = store.get(id).await?;
    let outcome = apply(&mut resource)?;
    let written = store.put(id, &resource).await?;
    Ok((written, outcome))
}

/// Offline store: a JSON object of `{resource_id: resource}`
pub struct LocalStore {
    path: Option<PathBuf>,
    resources: Mutex<BTreeMap<String, Value>>,
}

impl LocalStore {
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            resources: Mutex::new(BTreeMap::new()),
        }
    }

    /// Load from `path`; a missing file starts empty
    pub fn open(path: PathBuf) -> Result<Self> {
        let resources = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store from {:?}", path))?;
            let raw: BTreeMap<String, Value> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse store {:?}", path))?;
            raw.into_iter().map(|(k, v)| (key(&k), v)).collect()
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: Some(path),
            resources: Mutex::new(resources),
        })
    }

    #[cfg(test)]
    pub fn insert(&self, id: &str, resource: Value) {
        if let Ok(mut map) = self.resources.lock() {
            map.insert(key(id), resource);
        }
    }

    fn save(&self, map: &BTreeMap<String, Value>) -> Result<(), ArmError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content =
            serde_json::to_string_pretty(map).map_err(|e| ArmError::Store(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ArmError::Store(format!("failed to write {:?}: {}", path, e)))
    }
}

// Resource IDs are case-insensitive.
fn key(id: &str) -> String {
    id.trim_end_matches('/').to_lowercase()
}

fn poisoned() -> ArmError {
    ArmError::Store("store lock poisoned".to_string())
}

#[async_trait]
impl ResourceStore for LocalStore {
    async fn get(&self, id: &str) -> Result<Value, ArmError> {
        let map = self.resources.lock().map_err(|_| poisoned())?;
        map.get(&key(id))
            .cloned()
            .ok_or_else(|| ArmError::NotFound(id.to_string()))
    }

    async fn put(&self, id: &str, body: &Value) -> Result<Value, ArmError> {
        let mut map = self.resources.lock().map_err(|_| poisoned())?;
        debug!(id, "local put");
        map.insert(key(id), body.clone());
        self.save(&map)?;
        Ok(body.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), ArmError> {
        let mut map = self.resources.lock().map_err(|_| poisoned())?;
        if map.remove(&key(id)).is_none() {
            return Err(ArmError::NotFound(id.to_string()));
        }
        self.save(&map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Cdn/profiles/p";

    #[tokio::test]
    async fn lookups_ignore_case() {
        let store = LocalStore::in_memory();
        store.insert(ID, json!({"name": "p"}));
        let got = store.get(&ID.to_uppercase()).await.unwrap();
        assert_eq!(got["name"], "p");
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let store = LocalStore::in_memory();
        assert!(matches!(store.get(ID).await, Err(ArmError::NotFound(_))));
        assert!(matches!(store.delete(ID).await, Err(ArmError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_writes_back_full_resource() {
        let store = LocalStore::in_memory();
        store.insert(ID, json!({"tags": {"a": "1"}, "sku": {"name": "Standard_Microsoft"}}));

        let (written, outcome) = update_resource(&store, ID, |res| {
            res["tags"]["b"] = json!("2");
            Ok(7)
        })
        .await
        .unwrap();

        assert_eq!(outcome, 7);
        assert_eq!(written["tags"], json!({"a": "1", "b": "2"}));
        assert_eq!(store.get(ID).await.unwrap()["sku"]["name"], "Standard_Microsoft");
    }

    #[tokio::test]
    async fn failed_apply_writes_nothing() {
        let store = LocalStore::in_memory();
        store.insert(ID, json!({"v": 1}));
        let result: Result<(Value, ())> = update_resource(&store, ID, |res| {
            res["v"] = json!(2);
            anyhow::bail!("rejected")
        })
        .await;
        assert!(result.is_err());
        assert_eq!(store.get(ID).await.unwrap()["v"], 1);
    }

    #[tokio::test]
    async fn file_store_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = LocalStore::open(path.clone()).unwrap();
        store.put(ID, &json!({"name": "p"})).await.unwrap();

        let reopened = LocalStore::open(path).unwrap();
        assert_eq!(reopened.get(ID).await.unwrap()["name"], "p");
    }
}
