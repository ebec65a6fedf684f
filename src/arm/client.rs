//! Azure Resource Manager REST client

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::{ArmError, ResourceStore};
use crate::config::ArmSettings;

const ASYNC_OPERATION: &str = "Azure-AsyncOperation";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_POLLS: u32 = 120;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ErrorBody>,
}

pub struct ArmClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    api_version: String,
    no_wait: bool,
}

impl ArmClient {
    pub fn new(settings: &ArmSettings, no_wait: bool) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            api_version: settings.api_version.clone(),
            no_wait,
        }
    }

    fn url(&self, id: &str) -> String {
        format!("{}{}?api-version={}", self.base_url, id, self.api_version)
    }

    /// Fail on non-2xx, mapping the ARM error envelope when present
    async fn check(&self, resp: Response, id: &str) -> Result<Response, ArmError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ArmError::NotFound(id.to_string()));
        }

        let text = resp.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error)
            .unwrap_or(ErrorBody {
                code: status.as_str().to_string(),
                message: text,
            });

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ArmError::Auth {
                status: status.as_u16(),
                message: body.message,
            });
        }
        Err(ArmError::Status {
            status: status.as_u16(),
            code: body.code,
            message: body.message,
        })
    }

    async fn json_body(resp: Response) -> Result<Value, ArmError> {
        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ArmError::Decode(e.to_string()))
    }

    /// Poll an accepted operation until it reaches a terminal state
    async fn wait(&self, headers: &HeaderMap) -> Result<(), ArmError> {
        let async_url = header_str(headers, ASYNC_OPERATION);
        let location = header_str(headers, LOCATION.as_str());
        let Some(url) = async_url.clone().or(location) else {
            return Ok(());
        };
        let mut interval = retry_after(headers).unwrap_or(DEFAULT_POLL_INTERVAL);

        for attempt in 1..=MAX_POLLS {
            tokio::time::sleep(interval).await;
            debug!(attempt, url = %url, "polling operation");

            let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;
            let resp = self.check(resp, &url).await?;
            if let Some(next) = retry_after(resp.headers()) {
                interval = next;
            }

            if async_url.is_none() {
                // Location polling: 202 means still running
                if resp.status() != StatusCode::ACCEPTED {
                    return Ok(());
                }
                continue;
            }

            let op: OperationStatus = resp
                .json()
                .await
                .map_err(|e| ArmError::Decode(e.to_string()))?;
            match op.status.as_str() {
                "Succeeded" => return Ok(()),
                "Failed" | "Canceled" => {
                    return Err(ArmError::OperationFailed {
                        status: op.status,
                        message: op.error.map(|e| e.message).unwrap_or_default(),
                    })
                }
                _ => {}
            }
        }

        Err(ArmError::Timeout(MAX_POLLS))
    }

    fn accepted(&self, status: StatusCode) -> bool {
        !self.no_wait && (status == StatusCode::CREATED || status == StatusCode::ACCEPTED)
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_str(headers, RETRY_AFTER.as_str())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl ResourceStore for ArmClient {
    async fn get(&self, id: &str) -> Result<Value, ArmError> {
        debug!(id, "GET");
        let resp = self
            .http
            .get(self.url(id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let resp = self.check(resp, id).await?;
        Self::json_body(resp).await
    }

    async fn put(&self, id: &str, body: &Value) -> Result<Value, ArmError> {
        debug!(id, "PUT");
        let resp = self
            .http
            .put(self.url(id))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        let resp = self.check(resp, id).await?;

        if self.accepted(resp.status()) {
            info!(id, "waiting for operation to complete");
            let headers = resp.headers().clone();
            self.wait(&headers).await?;
            return self.get(id).await;
        }
        Self::json_body(resp).await
    }

    async fn delete(&self, id: &str) -> Result<(), ArmError> {
        debug!(id, "DELETE");
        let resp = self
            .http
            .delete(self.url(id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let resp = self.check(resp, id).await?;

        if self.accepted(resp.status()) {
            let headers = resp.headers().clone();
            self.wait(&headers).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn settings() -> ArmSettings {
        ArmSettings {
            base_url: "https://management.azure.com/".into(),
            token: "t".into(),
            api_version: "2024-02-01".into(),
        }
    }

    #[test]
    fn url_carries_api_version() {
        let client = ArmClient::new(&settings(), false);
        assert_eq!(
            client.url("/subscriptions/s/resourceGroups/rg"),
            "https://management.azure.com/subscriptions/s/resourceGroups/rg?api-version=2024-02-01"
        );
    }

    #[test]
    fn no_wait_skips_polling() {
        let waiting = ArmClient::new(&settings(), false);
        let detached = ArmClient::new(&settings(), true);
        assert!(waiting.accepted(StatusCode::ACCEPTED));
        assert!(!waiting.accepted(StatusCode::OK));
        assert!(!detached.accepted(StatusCode::ACCEPTED));
    }

    #[test]
    fn retry_after_reads_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(3)));
    }
}
