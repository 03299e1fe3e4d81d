//! Poseidon hashing over the BN254 scalar field.
//!
//! The permutation shape (`t = arity + 1`, `alpha = 5`, 8 full rounds, a
//! width-dependent count of partial rounds, a Cauchy MDS matrix) follows
//! the standard BN254-scalar-field Poseidon construction used by the
//! circuit stack this suite targets. Round constants and the MDS matrix
//! are derived deterministically (§`dev parameters`, below) rather than
//! hardcoded, mirroring `srs_setup.rs`'s split between an in-memory
//! "dev" parameter set and a canonical fixture loaded in production: a
//! production deployment MUST replace [`PoseidonParams::derive_dev`] with
//! parameters loaded from the circuit's own standard library so that
//! out-of-circuit hashing and in-circuit constraints agree bit-for-bit.
//! Nothing downstream of [`poseidon`] depends on the specific constants,
//! only on their consistency across calls.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use ark_ff::{Field, PrimeField, Zero};

use crate::F;

/// A derived Poseidon parameter set for one fixed state width `t`.
#[derive(Clone)]
pub struct PoseidonParams {
    pub t: usize,
    pub alpha: u64,
    pub full_rounds: usize,
    pub partial_rounds: usize,
    round_constants: Vec<F>,
    mds: Vec<Vec<F>>,
}

/// Number of partial rounds conventionally used for a given state width on
/// the BN254 scalar field (values match the common `t=3`/`t<=8` Poseidon
/// parameter tables; widths outside that table fall back to a safe
/// over-estimate).
fn partial_rounds_for(t: usize) -> usize {
    match t {
        2 => 56,
        3 => 57,
        4 => 56,
        5 => 60,
        6 => 60,
        7 => 63,
        _ => 68,
    }
}

impl PoseidonParams {
    /// Deterministically derive a parameter set for width `t` via a
    /// domain-separated BLAKE3 expansion. Stable across processes and
    /// platforms; not a substitute for the circuit's canonical constants
    /// in a production deployment (see module docs).
    fn derive_dev(t: usize) -> Self {
        let full_rounds = 8;
        let partial_rounds = partial_rounds_for(t);
        let total_rounds = full_rounds + partial_rounds;

        let mut round_constants = Vec::with_capacity(total_rounds * t);
        for i in 0..(total_rounds * t) {
            round_constants.push(expand_field(&format!("poseidon-rc-t{}", t), i as u64));
        }

        // Cauchy MDS: mds[i][j] = 1 / (x_i - y_j), x_i and y_j disjoint so
        // no denominator is ever zero.
        let mut mds = vec![vec![F::zero(); t]; t];
        for i in 0..t {
            let x_i = F::from(i as u64);
            for j in 0..t {
                let y_j = F::from((t + j + 1) as u64);
                mds[i][j] = (x_i - y_j).inverse().expect("x_i != y_j by construction");
            }
        }

        Self { t, alpha: 5, full_rounds, partial_rounds, round_constants, mds }
    }

    fn round_constants_for(&self, round: usize) -> &[F] {
        &self.round_constants[round * self.t..(round + 1) * self.t]
    }
}

/// Expand a labeled counter into a field element via BLAKE3, used only for
/// deterministic dev-parameter derivation (never for hashing witness data).
fn expand_field(label: &str, index: u64) -> F {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"poseidon-dev-params-v1");
    hasher.update(label.as_bytes());
    hasher.update(&index.to_be_bytes());
    let digest = hasher.finalize();
    F::from_be_bytes_mod_order(digest.as_bytes())
}

static PARAMS_CACHE: OnceLock<Mutex<HashMap<usize, Arc<PoseidonParams>>>> = OnceLock::new();

fn params_for(t: usize) -> Arc<PoseidonParams> {
    let cache = PARAMS_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().expect("poseidon params cache poisoned");
    guard
        .entry(t)
        .or_insert_with(|| Arc::new(PoseidonParams::derive_dev(t)))
        .clone()
}

fn pow_alpha(x: F, alpha: u64) -> F {
    x.pow([alpha])
}

fn mds_multiply(state: &[F], mds: &[Vec<F>]) -> Vec<F> {
    let t = state.len();
    let mut out = vec![F::zero(); t];
    for i in 0..t {
        let mut acc = F::zero();
        for j in 0..t {
            acc += mds[i][j] * state[j];
        }
        out[i] = acc;
    }
    out
}

fn permute(params: &PoseidonParams, mut state: Vec<F>) -> Vec<F> {
    debug_assert_eq!(state.len(), params.t);
    let half_full = params.full_rounds / 2;
    let mut round = 0usize;

    for _ in 0..half_full {
        let rc = params.round_constants_for(round);
        for (s, c) in state.iter_mut().zip(rc) {
            *s += *c;
        }
        for s in state.iter_mut() {
            *s = pow_alpha(*s, params.alpha);
        }
        state = mds_multiply(&state, &params.mds);
        round += 1;
    }

    for _ in 0..params.partial_rounds {
        let rc = params.round_constants_for(round);
        for (s, c) in state.iter_mut().zip(rc) {
            *s += *c;
        }
        state[0] = pow_alpha(state[0], params.alpha);
        state = mds_multiply(&state, &params.mds);
        round += 1;
    }

    for _ in 0..half_full {
        let rc = params.round_constants_for(round);
        for (s, c) in state.iter_mut().zip(rc) {
            *s += *c;
        }
        for s in state.iter_mut() {
            *s = pow_alpha(*s, params.alpha);
        }
        state = mds_multiply(&state, &params.mds);
        round += 1;
    }

    state
}

/// Direct Poseidon permutation over a fixed arity `1..=6`; `t = arity + 1`
/// with the first state slot acting as the capacity element, initialized
/// to zero, and the squeezed output read back from slot zero.
fn poseidon_fixed(inputs: &[F]) -> F {
    let t = inputs.len() + 1;
    let params = params_for(t);
    let mut state = vec![F::zero(); t];
    state[1..].copy_from_slice(inputs);
    let out = permute(&params, state);
    out[0]
}

/// Rate-1 sponge absorbing one field element per permutation call,
/// `state <- Poseidon2(state, input_i)` starting from `state = 0`, used
/// for arities beyond the fixed 1..=6 table.
fn poseidon_sponge(inputs: &[F]) -> F {
    let t = 2;
    let params = params_for(t);
    let mut state = vec![F::zero(); t];
    for &input in inputs {
        state[1] += input;
        state = permute(&params, state);
    }
    state[0]
}

/// Poseidon hash, arity-dispatched per spec §4.1: direct permutation for
/// `1..=6` inputs, a rate-1 sponge beyond that.
///
/// # Panics
/// Panics if `inputs` is empty — there is no zero-arity Poseidon hash in
/// this suite.
pub fn poseidon(inputs: &[F]) -> F {
    assert!(!inputs.is_empty(), "poseidon requires at least one input");
    if inputs.len() <= 6 {
        poseidon_fixed(inputs)
    } else {
        poseidon_sponge(inputs)
    }
}

/// `hash2(a, b)`.
pub fn poseidon_h2(a: F, b: F) -> F {
    poseidon(&[a, b])
}

/// `hash3(a, b, c)` — used for origin tokens and time-bucket indices.
pub fn poseidon_h3(a: F, b: F, c: F) -> F {
    poseidon(&[a, b, c])
}

/// `hash4(a, b, c, d)`.
pub fn poseidon_h4(a: F, b: F, c: F, d: F) -> F {
    poseidon(&[a, b, c, d])
}

/// The arity-7 hash used to sign/verify credentials:
/// `hash2(hash4(a,b,c,d), hash3(e,f,g))`.
///
/// This is the *only* 7-arity construction this suite accepts (spec
/// §4.1/§9 Open Question 2) — a flat rate-1 sponge over all seven inputs
/// produces a different, non-interoperable value and must never be used
/// here even though [`poseidon`] would happily compute one.
#[allow(clippy::too_many_arguments)]
pub fn poseidon_h7(a: F, b: F, c: F, d: F, e: F, f: F, g: F) -> F {
    let left = poseidon_h4(a, b, c, d);
    let right = poseidon_h3(e, f, g);
    poseidon_h2(left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = F::from(1u64);
        let b = F::from(2u64);
        assert_eq!(poseidon_h2(a, b), poseidon_h2(a, b));
    }

    #[test]
    fn order_sensitive() {
        let a = F::from(1u64);
        let b = F::from(2u64);
        assert_ne!(poseidon_h2(a, b), poseidon_h2(b, a));
    }

    #[test]
    fn h7_is_hierarchical_not_flat_sponge() {
        let vals: Vec<F> = (1..=7u64).map(F::from).collect();
        let hierarchical = poseidon_h7(vals[0], vals[1], vals[2], vals[3], vals[4], vals[5], vals[6]);
        let flat = poseidon(&vals);
        assert_ne!(
            hierarchical, flat,
            "h7 must use the hierarchical composition, not a flat 7-arity sponge"
        );
    }

    #[test]
    fn different_arities_give_different_parameter_sets() {
        let three = poseidon(&[F::from(1u64), F::from(2u64), F::from(3u64)]);
        let four = poseidon(&[F::from(1u64), F::from(2u64), F::from(3u64), F::from(4u64)]);
        assert_ne!(three, four);
    }

    #[test]
    fn sponge_path_is_used_beyond_arity_six() {
        let inputs: Vec<F> = (1..=8u64).map(F::from).collect();
        // Just exercise the sponge path without panicking and check determinism.
        let a = poseidon(&inputs);
        let b = poseidon(&inputs);
        assert_eq!(a, b);
    }

    #[test]
    #[should_panic]
    fn empty_input_panics() {
        let empty: [F; 0] = [];
        let _ = poseidon(&empty);
    }
}
