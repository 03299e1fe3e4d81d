//! Environment / configuration option sets (spec §6): explicit
//! `from_env` constructors, fatal at startup on a missing required key
//! (spec §7 "Configuration errors ... are fatal").

#![allow(dead_code)]

use serde::Deserialize;

use crate::F;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error("invalid value for environment variable {0}: {1}")]
    InvalidEnv(&'static str, String),
}

fn env_var(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnv(key))
}

fn env_var_or(key: &'static str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(v) => v
            .parse()
            .map_err(|_| ConfigError::InvalidEnv(key, v.clone())),
        Err(_) => Ok(default),
    }
}

/// Rate-limit sub-config (spec §4.5 / §6).
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests_per_token: u32,
    pub window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_requests_per_token: 100, window_seconds: 60 }
    }
}

/// Resource-server configuration (spec §6).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub service_id: F,
    pub facilitator_pubkey: String,
    pub facilitator_url: String,
    pub min_tier: u32,
    pub skip_proof_verification: bool,
    pub rate_limit: RateLimitConfig,
    pub payment_amount: String,
    pub payment_asset: String,
    pub payment_recipient: String,
    pub network: String,
    pub resource_description: String,
    /// `scheme://host[:port]` this server is externally reachable at, used
    /// to build the absolute `resource` URL echoed in the 402 challenge and
    /// fed to `origin_id` (spec §4.4.1, §3). Distinct from
    /// `resource_description`, which is human-readable text shown to payers.
    pub public_base_url: String,
    /// Deadline on facilitator-bound HTTP calls (spec §5 Resource policy:
    /// "Facilitator fetches MUST honor a caller-supplied deadline; on
    /// deadline expiry the middleware responds 503
    /// `FACILITATOR_UNAVAILABLE`"). Applied to the `reqwest::Client` used
    /// for `mediate_payment`.
    pub facilitator_timeout_seconds: u64,
}

impl ServerConfig {
    /// Load from environment, failing closed (fatal at startup, per
    /// spec §7) if a required key is absent. `skip_proof_verification`
    /// defaults to `false` and MUST be enabled only for integration
    /// testing, never as a deployed default (spec §4.4.4).
    pub fn from_env() -> Result<Self, ConfigError> {
        let service_id_hex = env_var("ZKCRED_SERVICE_ID")?;
        let service_id = crate::crypto::decode_field(&service_id_hex)
            .map_err(|e| ConfigError::InvalidEnv("ZKCRED_SERVICE_ID", e.to_string()))?;
        Ok(Self {
            service_id,
            facilitator_pubkey: env_var("ZKCRED_FACILITATOR_PUBKEY")?,
            facilitator_url: env_var("ZKCRED_FACILITATOR_URL")?,
            min_tier: env_parse_or("ZKCRED_MIN_TIER", 0u32)?,
            skip_proof_verification: env_parse_or("ZKCRED_SKIP_PROOF_VERIFICATION", false)?,
            rate_limit: RateLimitConfig {
                max_requests_per_token: env_parse_or("ZKCRED_RATE_LIMIT_MAX", 100u32)?,
                window_seconds: env_parse_or("ZKCRED_RATE_LIMIT_WINDOW_SECONDS", 60i64)?,
            },
            payment_amount: env_var_or("ZKCRED_PAYMENT_AMOUNT", "10000"),
            payment_asset: env_var_or("ZKCRED_PAYMENT_ASSET", "USDC"),
            payment_recipient: env_var_or("ZKCRED_PAYMENT_RECIPIENT", ""),
            network: env_var_or("ZKCRED_NETWORK", "eip155:8453"),
            resource_description: env_var_or("ZKCRED_RESOURCE_DESCRIPTION", "protected resource"),
            public_base_url: env_var_or("ZKCRED_PUBLIC_BASE_URL", "https://localhost"),
            facilitator_timeout_seconds: env_parse_or("ZKCRED_FACILITATOR_TIMEOUT_SECONDS", 10u64)?,
        })
    }
}

/// Facilitator configuration (spec §6).
#[derive(Debug, Clone)]
pub struct FacilitatorConfig {
    pub service_id: F,
    pub secret_key: crate::crypto::Scalar,
    pub kid: Option<String>,
    pub tiers: Vec<crate::facilitator::tiers::Tier>,
    pub allow_mock_payments: bool,
}

impl FacilitatorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let service_id_hex = env_var("ZKCRED_SERVICE_ID")?;
        let service_id = crate::crypto::decode_field(&service_id_hex)
            .map_err(|e| ConfigError::InvalidEnv("ZKCRED_SERVICE_ID", e.to_string()))?;
        let secret_key_hex = env_var("ZKCRED_FACILITATOR_SECRET_KEY")?;
        let secret_key_bytes = hex::decode(secret_key_hex.trim_start_matches("0x"))
            .map_err(|e| ConfigError::InvalidEnv("ZKCRED_FACILITATOR_SECRET_KEY", e.to_string()))?;
        let secret_key = {
            use ark_ff::PrimeField;
            crate::crypto::Scalar::from_be_bytes_mod_order(&secret_key_bytes)
        };
        Ok(Self {
            service_id,
            secret_key,
            kid: std::env::var("ZKCRED_FACILITATOR_KID").ok(),
            tiers: crate::facilitator::tiers::default_tiers(),
            allow_mock_payments: env_parse_or("ZKCRED_ALLOW_MOCK_PAYMENTS", false)?,
        })
    }
}

/// Client configuration (spec §6).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub strategy: crate::client::strategy::Strategy,
    pub time_bucket_seconds: i64,
    pub enable_proof_cache: bool,
    pub storage_path: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            strategy: crate::client::strategy::Strategy::TimeBucketed,
            time_bucket_seconds: 300,
            enable_proof_cache: true,
            storage_path: None,
        }
    }
}
