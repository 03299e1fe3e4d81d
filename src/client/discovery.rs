//! Discovery: resolve a protected resource's x402 challenge and extract
//! the facilitator the resource server trusts (spec §4.4.1, §6).

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use reqwest::StatusCode;
use serde_json::Value;

use crate::wire::PaymentRequired;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("transport error reaching {0}: {1}")]
    Transport(String, String),
    #[error("expected HTTP 402, got {0}")]
    UnexpectedStatus(u16),
    #[error("malformed 402 challenge body: {0}")]
    MalformedBody(String),
    #[error("no accepted payment methods in challenge")]
    NoAcceptedMethods,
}

/// GET `url`, require a 402, and parse the x402 challenge body including
/// its `extensions.zk_credential` block.
pub async fn discover(http: &reqwest::Client, url: &str) -> Result<PaymentRequired, DiscoveryError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| DiscoveryError::Transport(url.to_string(), e.to_string()))?;

    if response.status() != StatusCode::PAYMENT_REQUIRED {
        return Err(DiscoveryError::UnexpectedStatus(response.status().as_u16()));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| DiscoveryError::MalformedBody(e.to_string()))?;
    parse_challenge_body(body)
}

/// Pure parse step, split out from [`discover`] so the decoding logic is
/// testable without a live HTTP round trip.
pub fn parse_challenge_body(body: Value) -> Result<PaymentRequired, DiscoveryError> {
    let challenge: PaymentRequired =
        serde_json::from_value(body).map_err(|e| DiscoveryError::MalformedBody(e.to_string()))?;
    if challenge.accepts.is_empty() {
        return Err(DiscoveryError::NoAcceptedMethods);
    }
    Ok(challenge)
}

/// Caches the parsed challenge (in particular `facilitator_pubkey`) by
/// resource URL, so a client presenting repeatedly to the same origin does
/// not re-run discovery on every request (spec §4.6.1: "Cache the parsed
/// facilitator public key by URL").
#[derive(Debug, Default)]
pub struct DiscoveryCache {
    entries: Mutex<HashMap<String, PaymentRequired>>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// Returns the cached challenge for `url` if present, without making a
    /// network request.
    pub fn get(&self, url: &str) -> Option<PaymentRequired> {
        self.entries.lock().unwrap().get(url).cloned()
    }

    /// Returns the cached challenge for `url`, discovering and caching it
    /// on first use.
    pub async fn get_or_discover(
        &self,
        http: &reqwest::Client,
        url: &str,
    ) -> Result<PaymentRequired, DiscoveryError> {
        if let Some(cached) = self.get(url) {
            return Ok(cached);
        }
        let challenge = discover(http, url).await?;
        self.entries.lock().unwrap().insert(url.to_string(), challenge.clone());
        Ok(challenge)
    }

    /// Forces re-discovery on the next call, e.g. after the resource
    /// server rotates its facilitator.
    pub fn invalidate(&self, url: &str) {
        self.entries.lock().unwrap().remove(url);
    }
}
