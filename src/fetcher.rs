//! Page fetching against the openFDA REST API.
//!
//! One page fetch is one `GET {base_url}/{database}.json` with `search`,
//! `limit`, and `skip` parameters. Parameters are attached through the HTTP
//! client's query builder, so values are percent-encoded exactly once;
//! callers never pre-encode.
//!
//! # Failure classification
//!
//! A page fetch never returns `Err`; every failure mode is folded into a
//! [`PageOutcome`] so the aggregator can make the complete/partial decision:
//!
//! | Condition | Reason | Retried |
//! |-----------|--------|---------|
//! | Connection error, per-attempt timeout | `network` | yes |
//! | HTTP 429 or 5xx | `http_status` | yes |
//! | Other 4xx | `http_status` | no |
//! | `results` missing or not an array of objects | `malformed_envelope` | no |
//!
//! # Retry Strategy
//!
//! Retryable failures are attempted up to `max_retries` additional times
//! with exponential backoff (base 500 ms, factor 2). Non-retryable ones
//! fail the page immediately.

use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::error::HarvestError;
use crate::models::{FailureReason, Meta, PageEnvelope, PageOutcome, ProbeEnvelope, Query, Record};

/// HTTP client for one openFDA endpoint family.
pub struct Fetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
    backoff_base: Duration,
}

/// Outcome of a single attempt, before the retry policy is applied.
enum AttemptError {
    Retryable(FailureReason),
    Permanent(FailureReason),
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            api_key: config.api.resolve_api_key(),
            max_retries: config.harvest.max_retries,
            backoff_base: Duration::from_millis(config.harvest.backoff_base_ms),
        })
    }

    /// Request builder for `{base_url}/{database}.json`, with the API key
    /// attached when configured.
    pub(crate) fn request(&self, database: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}.json", self.base_url, database);
        let mut req = self.client.get(url);
        if let Some(key) = &self.api_key {
            req = req.query(&[("api_key", key.as_str())]);
        }
        req
    }

    /// Issue the metadata probe: exactly one GET, no `limit`/`skip`.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal ([`HarvestError::Query`]): without the
    /// declared total the harvest cannot be planned, and pretending the
    /// query matched nothing would corrupt downstream consumers.
    pub async fn probe(&self, query: &Query) -> Result<Meta, HarvestError> {
        let resp = self
            .request(&query.database)
            .query(&[("search", query.search.as_str())])
            .send()
            .await
            .map_err(|e| HarvestError::probe(None, format!("network error: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HarvestError::probe(
                Some(status.as_u16()),
                body.chars().take(200).collect::<String>(),
            ));
        }

        let envelope: ProbeEnvelope = resp
            .json()
            .await
            .map_err(|e| HarvestError::probe(None, format!("malformed envelope: {}", e)))?;

        let meta = envelope
            .meta
            .ok_or_else(|| HarvestError::probe(None, "envelope missing meta section"))?;
        if meta.total().is_none() {
            return Err(HarvestError::probe(
                None,
                "envelope missing meta.results.total",
            ));
        }
        Ok(meta)
    }

    /// Fetch one page, applying the retry policy. Infallible by contract:
    /// the terminal failure reason is carried in the returned outcome.
    pub async fn fetch_page(&self, query: &Query, offset: u64) -> PageOutcome {
        let mut last_failure = FailureReason::Network;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 500ms, 1s, 2s, ...
                let delay = self.backoff_base * 2u32.pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }

            match self.attempt_page(query, offset).await {
                Ok(records) => return PageOutcome::Fetched { offset, records },
                Err(AttemptError::Permanent(reason)) => {
                    return PageOutcome::Failed { offset, reason };
                }
                Err(AttemptError::Retryable(reason)) => {
                    tracing::warn!(
                        offset,
                        attempt = attempt + 1,
                        reason = %reason,
                        "page fetch attempt failed"
                    );
                    last_failure = reason;
                }
            }
        }

        PageOutcome::Failed {
            offset,
            reason: last_failure,
        }
    }

    async fn attempt_page(&self, query: &Query, offset: u64) -> Result<Vec<Record>, AttemptError> {
        let resp = self
            .request(&query.database)
            .query(&[("search", query.search.as_str())])
            .query(&[("limit", query.page_size as u64), ("skip", offset)])
            .send()
            .await
            .map_err(|_| AttemptError::Retryable(FailureReason::Network))?;

        let status = resp.status();

        // Rate limited or server error: worth another attempt.
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(AttemptError::Retryable(FailureReason::HttpStatus(
                status.as_u16(),
            )));
        }

        // Other client errors are permanent; retrying a 404 changes nothing.
        if !status.is_success() {
            return Err(AttemptError::Permanent(FailureReason::HttpStatus(
                status.as_u16(),
            )));
        }

        let envelope: PageEnvelope = resp.json().await.map_err(|e| {
            if e.is_decode() {
                AttemptError::Permanent(FailureReason::MalformedEnvelope)
            } else {
                // Connection dropped while reading the body.
                AttemptError::Retryable(FailureReason::Network)
            }
        })?;

        envelope
            .results
            .ok_or(AttemptError::Permanent(FailureReason::MalformedEnvelope))
    }
}
