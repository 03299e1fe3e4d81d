//! The four presentation-index strategies, as a closed sum type with one
//! uniform `select` operation (spec §4.6.2, §9 "Presentation strategies as
//! a sum type"). `force_unlinkable` is handled as a call-site override, not
//! a fifth variant.

#![allow(dead_code)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::credential::StoredCredential;
use crate::crypto::poseidon::poseidon_h3;
use crate::F;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    MaxPrivacy,
    MaxPerformance,
    PerOrigin,
    TimeBucketed,
}

/// Reduce a field element to an index in `[0, budget)`. Only the low 8
/// bytes are consulted — more than enough entropy for any realistic
/// `identity_budget`, and avoids pulling in a bignum-modulo routine for a
/// value this small.
fn field_to_index(x: F, budget: u32) -> u32 {
    use ark_ff::{BigInteger, PrimeField};
    let bytes = x.into_bigint().to_bytes_be();
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[8 - n..].copy_from_slice(&bytes[bytes.len() - n..]);
    (u64::from_be_bytes(buf) % budget.max(1) as u64) as u32
}

impl Strategy {
    /// Select `(identity_index, time_bucket?)` for one request against
    /// `origin_id`, mutating `credential.presentation_count` exactly when
    /// the strategy consumes a fresh index (spec §4.6.2 table).
    pub fn select(
        &self,
        credential: &mut StoredCredential,
        origin_id: F,
        now: i64,
        time_bucket_seconds: i64,
        force_unlinkable: bool,
        per_origin_memo: &mut HashMap<F, u32>,
    ) -> (u32, Option<i64>) {
        let budget = credential.credential.identity_budget.max(1);

        if force_unlinkable {
            return (consume_fresh_index(credential, budget), None);
        }

        match self {
            Strategy::MaxPrivacy => (consume_fresh_index(credential, budget), None),
            Strategy::MaxPerformance => (0, None),
            Strategy::PerOrigin => {
                if let Some(&idx) = per_origin_memo.get(&origin_id) {
                    (idx, None)
                } else {
                    let idx = consume_fresh_index(credential, budget);
                    per_origin_memo.insert(origin_id, idx);
                    (idx, None)
                }
            }
            Strategy::TimeBucketed => {
                let bucket = (now / time_bucket_seconds) * time_bucket_seconds;
                let idx_field = poseidon_h3(
                    F::from(bucket as u64),
                    credential.credential.service_id,
                    F::from(credential.obtained_at as u64),
                );
                (field_to_index(idx_field, budget), Some(bucket))
            }
        }
    }
}

fn consume_fresh_index(credential: &mut StoredCredential, budget: u32) -> u32 {
    let idx = credential.presentation_count % budget;
    credential.presentation_count = credential.presentation_count.wrapping_add(1);
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK;
    use crate::credential::Credential;

    fn stored(identity_budget: u32, presentation_count: u32, obtained_at: i64) -> StoredCredential {
        StoredCredential {
            credential: Credential {
                suite: SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK.to_string(),
                service_id: F::from(1u64),
                tier: 1,
                identity_budget,
                issued_at: 0,
                expires_at: 1_000_000,
                commitment: String::new(),
                signature: String::new(),
                kid: None,
            },
            nullifier_seed: F::from(11u64),
            blinding_factor: F::from(22u64),
            facilitator_pubkey: String::new(),
            presentation_count,
            obtained_at,
        }
    }

    #[test]
    fn max_performance_always_returns_zero() {
        let mut cred = stored(10, 3, 0);
        let mut memo = HashMap::new();
        let (idx, _) = Strategy::MaxPerformance.select(&mut cred, F::from(5u64), 100, 300, false, &mut memo);
        assert_eq!(idx, 0);
        let (idx2, _) = Strategy::MaxPerformance.select(&mut cred, F::from(6u64), 200, 300, false, &mut memo);
        assert_eq!(idx2, 0);
    }

    #[test]
    fn max_privacy_produces_distinct_indices() {
        let mut cred = stored(10, 0, 0);
        let mut memo = HashMap::new();
        let (a, _) = Strategy::MaxPrivacy.select(&mut cred, F::from(5u64), 100, 300, false, &mut memo);
        let (b, _) = Strategy::MaxPrivacy.select(&mut cred, F::from(5u64), 100, 300, false, &mut memo);
        assert_ne!(a, b);
    }

    #[test]
    fn per_origin_is_stable_within_origin_and_varies_across() {
        let mut cred = stored(10, 0, 0);
        let mut memo = HashMap::new();
        let (a1, _) = Strategy::PerOrigin.select(&mut cred, F::from(5u64), 100, 300, false, &mut memo);
        let (a2, _) = Strategy::PerOrigin.select(&mut cred, F::from(5u64), 200, 300, false, &mut memo);
        assert_eq!(a1, a2);
        let (b, _) = Strategy::PerOrigin.select(&mut cred, F::from(6u64), 100, 300, false, &mut memo);
        assert_ne!(a1, b);
    }

    #[test]
    fn time_bucketed_matches_within_bucket_and_differs_across() {
        let mut cred = stored(10, 0, 42);
        let mut memo = HashMap::new();
        let (a, bucket_a) = Strategy::TimeBucketed.select(&mut cred, F::from(5u64), 1000, 300, false, &mut memo);
        let (b, bucket_b) = Strategy::TimeBucketed.select(&mut cred, F::from(5u64), 1299, 300, false, &mut memo);
        assert_eq!(a, b);
        assert_eq!(bucket_a, bucket_b);
        let (c, bucket_c) = Strategy::TimeBucketed.select(&mut cred, F::from(5u64), 1301, 300, false, &mut memo);
        assert_ne!(bucket_a, bucket_c);
        let _ = c;
    }

    #[test]
    fn force_unlinkable_overrides_to_fresh_index() {
        let mut cred = stored(10, 0, 0);
        let mut memo = HashMap::new();
        let (a, _) = Strategy::MaxPerformance.select(&mut cred, F::from(5u64), 100, 300, true, &mut memo);
        let (b, _) = Strategy::MaxPerformance.select(&mut cred, F::from(5u64), 100, 300, true, &mut memo);
        assert_ne!(a, b);
    }
}
