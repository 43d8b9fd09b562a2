//! `ApiClient` adapter over reqwest.
//!
//! Method dispatch mirrors what API surfaces expect from a browser-adjacent
//! client: GET carries the payload as query parameters, bodied methods send
//! JSON, HEAD and OPTIONS have no body so their response headers are folded
//! into the body value. Transient failures (connect errors, 5xx) are retried
//! with exponential backoff.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::ExponentialBackoff;

use crate::action::RequestMethod;
use crate::config::HttpConfig;
use crate::driver::{ApiClient, ApiResponse};
use crate::utils::error::{EngineError, Result};

pub struct ReqwestApi {
    client: Client,
    retry_attempts: u32,
    retry_delay_ms: u64,
}

impl ReqwestApi {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            retry_attempts: config.retry_attempts,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    async fn send_once(
        &self,
        method: RequestMethod,
        url: &str,
        headers: &[(String, String)],
        payload: &Value,
    ) -> Result<ApiResponse> {
        let mut request = match method {
            RequestMethod::Get => self.client.get(url).query(&query_pairs(payload)),
            RequestMethod::Post => self.client.post(url).json(payload),
            RequestMethod::Put => self.client.put(url).json(payload),
            RequestMethod::Patch => self.client.patch(url).json(payload),
            RequestMethod::Delete => self.client.delete(url).json(payload),
            RequestMethod::Options => self.client.request(reqwest::Method::OPTIONS, url),
            RequestMethod::Head => self.client.head(url),
        };
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();

        let body = match method {
            RequestMethod::Head => headers_value(response.headers()),
            RequestMethod::Options => json!({
                "allow": response
                    .headers()
                    .get(reqwest::header::ALLOW)
                    .and_then(|v| v.to_str().ok()),
            }),
            _ => {
                let text = response.text().await?;
                if text.is_empty() {
                    Value::Null
                } else {
                    // Non-JSON bodies are kept verbatim.
                    serde_json::from_str(&text).unwrap_or(Value::String(text))
                }
            }
        };

        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl ApiClient for ReqwestApi {
    async fn request(
        &self,
        method: RequestMethod,
        url: &str,
        headers: &[(String, String)],
        payload: &Value,
    ) -> Result<ApiResponse> {
        let strategy = ExponentialBackoff::from_millis(self.retry_delay_ms.max(1))
            .take(self.retry_attempts as usize);

        Retry::spawn(strategy, || async {
            let response = self.send_once(method, url, headers, payload).await?;
            // 5xx is worth another attempt; 4xx is the caller's problem.
            if response.status >= 500 {
                return Err(EngineError::ApiStatus {
                    url: url.to_string(),
                    status: response.status,
                });
            }
            Ok(response)
        })
        .await
    }
}

/// GET payloads travel as query parameters, one pair per top-level scalar.
fn query_pairs(payload: &Value) -> Vec<(String, String)> {
    match payload {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| (key.clone(), scalar_string(value)))
            .collect(),
        _ => Vec::new(),
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn headers_value(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for (name, value) in headers {
        if let Ok(text) = value.to_str() {
            map.insert(name.as_str().to_string(), Value::String(text.to_string()));
        }
    }
    Value::Object(map)
}
