//! SerpApi transport
//!
//! Issues the GET request with transient-failure retries and hands back the
//! decoded JSON body. Interpretation of the body is the client's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::config::ProviderConfig;
use crate::{AssistantError, Result};

const API_KEY_PARAM: &str = "api_key";

/// One provider round trip
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    /// Send the query and return the JSON body of a 2xx response
    async fn fetch(&self, query: &[(&'static str, String)]) -> Result<Value>;
}

pub struct SerpApiTransport {
    client: ClientWithMiddleware,
    base_url: String,
}

impl SerpApiTransport {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("flightchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AssistantError::config(format!("Failed to build HTTP client: {e}")))?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.transport_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, query: &[(&'static str, String)]) -> String {
        build_url(&self.base_url, query, false)
    }
}

/// `base?k=v&..`; with `redact` the API key is masked for logging
fn build_url(base_url: &str, query: &[(&'static str, String)], redact: bool) -> String {
    let pairs: Vec<String> = query
        .iter()
        .map(|(key, value)| {
            let value = if redact && *key == API_KEY_PARAM {
                "***".into()
            } else {
                urlencoding::encode(value)
            };
            format!("{key}={value}")
        })
        .collect();

    if pairs.is_empty() {
        base_url.to_string()
    } else {
        format!("{base_url}?{}", pairs.join("&"))
    }
}

#[async_trait]
impl ProviderTransport for SerpApiTransport {
    #[instrument(skip(self, query), fields(url = %build_url(&self.base_url, query, true)))]
    async fn fetch(&self, query: &[(&'static str, String)]) -> Result<Value> {
        let response = self.client.get(self.url(query)).send().await.map_err(|e| {
            let message = match e {
                reqwest_middleware::Error::Reqwest(e) => e.without_url().to_string(),
                other => other.to_string(),
            };
            AssistantError::provider(format!("Request failed: {message}"))
        })?;

        let status = response.status();
        debug!("Provider responded with {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Provider error {}: {}", status, body);
            return Err(AssistantError::provider(format!("HTTP {status}: {body}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| {
                AssistantError::provider(format!(
                    "Malformed provider response: {}",
                    e.without_url()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> Vec<(&'static str, String)> {
        vec![
            ("engine", "google_flights".into()),
            ("api_key", "s3cret".into()),
            ("departure_id", "LGW,LHR".into()),
            ("arrival_id", "/m/04jpl".into()),
        ]
    }

    #[test]
    fn test_url_encodes_values() {
        let url = build_url("https://serpapi.com/search.json", &query(), false);
        assert_eq!(
            url,
            "https://serpapi.com/search.json?engine=google_flights&api_key=s3cret\
             &departure_id=LGW%2CLHR&arrival_id=%2Fm%2F04jpl"
        );
    }

    #[test]
    fn test_redacted_url_hides_key() {
        let url = build_url("https://serpapi.com/search.json", &query(), true);
        assert!(url.contains("api_key=***"));
        assert!(!url.contains("s3cret"));
    }

    #[test]
    fn test_transport_builds_from_default_config() {
        let transport = SerpApiTransport::new(&ProviderConfig::default()).unwrap();
        assert!(transport.url(&[]).starts_with("https://serpapi.com/search.json"));
    }
}
