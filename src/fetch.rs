use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Anything that can turn a URL into a decoded JSON document.
pub trait JsonSource {
    fn fetch(&self, url: &str) -> Result<Value>;
}

/// Blocking HTTP source. Any status other than 200 aborts the run.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("covidmap/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

impl JsonSource for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Value> {
        let start_time = Instant::now();
        info!(action = "start", component = "fetch", url = url, "Requesting resource");

        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?;

        let status = response.status();
        if status != StatusCode::OK {
            anyhow::bail!("Request to {} returned HTTP {}", url, status);
        }

        let body = response
            .bytes()
            .with_context(|| format!("Failed to read response body from {}", url))?;
        debug!(action = "read", component = "fetch", url = url, bytes = body.len(), "Response body read");

        let value: Value = serde_json::from_slice(&body)
            .with_context(|| format!("Response from {} is not valid JSON", url))?;

        info!(
            action = "complete",
            component = "fetch",
            url = url,
            duration_ms = start_time.elapsed().as_millis(),
            "Resource fetched"
        );
        Ok(value)
    }
}
