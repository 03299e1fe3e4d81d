//! Tier table and tier selection (spec §4.3 step 4).

use serde::{Deserialize, Serialize};

/// One access tier, as advertised by `GET /info` and consulted by
/// `select_tier`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tier {
    pub tier: u32,
    pub price_usdc: String,
    pub min_amount_cents: u64,
    pub identity_limit: u32,
    pub duration_seconds: i64,
}

/// Select the highest tier whose `min_amount_cents <= paid_cents`, from a
/// tier list assumed sorted descending by `min_amount_cents` (spec §4.3
/// step 4). Returns `None` ("below_minimum_tier") if no tier qualifies.
pub fn select_tier(tiers: &[Tier], paid_cents: u64) -> Option<&Tier> {
    tiers
        .iter()
        .filter(|t| t.min_amount_cents <= paid_cents)
        .max_by_key(|t| t.min_amount_cents)
}

/// A representative tier table for local development and tests. Real
/// deployments load their own from [`crate::config::FacilitatorConfig`].
pub fn default_tiers() -> Vec<Tier> {
    vec![
        Tier {
            tier: 0,
            price_usdc: "0.01".to_string(),
            min_amount_cents: 1,
            identity_limit: 10,
            duration_seconds: 3600,
        },
        Tier {
            tier: 1,
            price_usdc: "0.10".to_string(),
            min_amount_cents: 10,
            identity_limit: 100,
            duration_seconds: 86_400,
        },
        Tier {
            tier: 2,
            price_usdc: "1.00".to_string(),
            min_amount_cents: 100,
            identity_limit: 1000,
            duration_seconds: 7 * 86_400,
        },
    ]
}
