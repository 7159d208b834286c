//! HTTP outcome feed.
//!
//! Polls a JSON endpoint that lists recent roulette games. The endpoint
//! may answer with a bare array of records or an object wrapping them
//! under `records`; anything else is treated as a failed fetch.
//! Requests use a fixed timeout and are never retried here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{OutcomeFeed, RawRecord};
use crate::config::FeedConfig;

const FEED_NAME: &str = "http";

/// Feed client for a recent-games JSON endpoint.
pub struct HttpFeed {
    http: Client,
    url: String,
}

impl HttpFeed {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client for outcome feed")?;

        Ok(Self {
            http,
            url: config.url.clone(),
        })
    }

    /// Pull the record list out of a response body.
    pub fn extract_records(body: Value) -> Result<Vec<RawRecord>> {
        match body {
            Value::Array(records) => Ok(records),
            Value::Object(mut map) => match map.remove("records") {
                Some(Value::Array(records)) => Ok(records),
                _ => anyhow::bail!("Feed response object has no `records` array"),
            },
            other => anyhow::bail!("Unexpected feed response shape: {}", type_name(&other)),
        }
    }
}

#[async_trait]
impl OutcomeFeed for HttpFeed {
    async fn fetch_recent(&self) -> Result<Vec<RawRecord>> {
        debug!(url = %self.url, "Fetching recent outcomes");

        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("Outcome feed request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Outcome feed error {status}: {body}");
        }

        let body: Value = resp
            .json()
            .await
            .context("Failed to parse outcome feed response")?;

        let records = Self::extract_records(body)?;
        debug!(count = records.len(), "Outcome feed returned records");
        Ok(records)
    }

    fn name(&self) -> &str {
        FEED_NAME
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
