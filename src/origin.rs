//! Canonical origin-id derivation (spec §3 OriginId/OriginToken).
//!
//! The server and client MUST derive origin ids from the same
//! canonicalization or the proof's origin binding silently fails to
//! match (spec §3). No URL-parsing crate is carried in this crate's
//! dependency graph, so canonicalization is implemented by hand against a
//! narrow, well-tested grammar (`scheme://host[:port]/path[?query]`)
//! rather than pulling in a general-purpose URL crate for one function.

#![allow(dead_code)]

use crate::crypto::string_to_field;
use crate::crypto::poseidon::poseidon_h3;
use crate::F;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OriginError {
    #[error("url is missing a scheme")]
    MissingScheme,
    #[error("url is missing a host")]
    MissingHost,
}

/// Canonicalize `scheme://host[:port]/path` per spec §3:
/// - scheme and host lowercased
/// - default ports elided (`80` for http, `443` for https)
/// - a single trailing slash stripped, except for the root path
/// - the query string excluded entirely
/// - path case preserved
pub fn canonicalize_url(url: &str) -> Result<String, OriginError> {
    let (scheme, rest) = url.split_once("://").ok_or(OriginError::MissingScheme)?;
    let scheme = scheme.to_ascii_lowercase();

    // Drop the query string before anything else.
    let rest = rest.split('#').next().unwrap_or(rest);
    let rest = rest.split('?').next().unwrap_or(rest);

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };
    if authority.is_empty() {
        return Err(OriginError::MissingHost);
    }

    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty() => {
            (h.to_ascii_lowercase(), Some(p))
        }
        _ => (authority.to_ascii_lowercase(), None),
    };

    let default_port = match scheme.as_str() {
        "http" => Some("80"),
        "https" => Some("443"),
        _ => None,
    };
    let port_suffix = match port {
        Some(p) if Some(p) != default_port => format!(":{p}"),
        _ => String::new(),
    };

    let path = if path.len() > 1 && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    };

    Ok(format!("{scheme}://{host}{port_suffix}{path}"))
}

/// `stringToField(canonicalize_url(url))`.
pub fn origin_id(url: &str) -> Result<F, OriginError> {
    let canonical = canonicalize_url(url)?;
    Ok(string_to_field(&canonical))
}

/// `hash3(nullifier_seed, origin_id, identity_index)`, the deterministic
/// public output that binds a proof to one origin and identity index.
pub fn origin_token(nullifier_seed: F, origin_id: F, identity_index: u32) -> F {
    poseidon_h3(nullifier_seed, origin_id, F::from(identity_index as u64))
}
