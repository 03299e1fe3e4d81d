//! Pedersen commitments over Grumpkin.
//!
//! `C = secret·G0 + blinding·G1` using generator index 0 of the suite's
//! generator table. The generators MUST match the in-circuit Pedersen
//! generators bit-for-bit in a production deployment; this module follows
//! the same dev/production split as `srs_setup.rs`'s SRS loading: a
//! deterministic in-memory table for development and tests
//! ([`GeneratorTable::dev`]), and a file-loaded table for production
//! ([`GeneratorTable::from_file`]) whose digest a deployer checks against
//! the circuit's published generator digest before trusting it.

#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::sync::OnceLock;

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use super::curve::{try_and_increment, Point};
use super::field::FieldReduce;
use crate::F;

/// A table of independent Pedersen generators, addressed by index.
#[derive(Clone)]
pub struct GeneratorTable {
    generators: Vec<Point>,
}

/// Errors loading a generator table from a production fixture.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorTableError {
    #[error("io error reading generator table: {0}")]
    Io(#[from] io::Error),
    #[error("failed to deserialize generator table: {0}")]
    Deserialize(String),
    #[error("generator table is empty")]
    Empty,
}

impl GeneratorTable {
    /// Deterministic in-memory table, derived via try-and-increment hash-
    /// to-curve from domain-separated labels. Stable across processes;
    /// NOT guaranteed to match any particular circuit's generators — use
    /// [`GeneratorTable::from_file`] in production.
    pub fn dev(count: usize) -> Self {
        let generators = (0..count)
            .map(|i| try_and_increment(&format!("pedersen-generator-{i}")))
            .collect();
        Self { generators }
    }

    /// Load a generator table from an arkworks-compressed point list, as a
    /// deployer would ship alongside the circuit's own parameter fixture.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GeneratorTableError> {
        let bytes = std::fs::read(path)?;
        let mut cursor = &bytes[..];
        let mut generators = Vec::new();
        while !cursor.is_empty() {
            let (x, y) = <(F, F)>::deserialize_compressed(&mut cursor)
                .map_err(|e| GeneratorTableError::Deserialize(e.to_string()))?;
            let point = Point::new(x, y)
                .map_err(|e| GeneratorTableError::Deserialize(e.to_string()))?;
            generators.push(point);
        }
        if generators.is_empty() {
            return Err(GeneratorTableError::Empty);
        }
        Ok(Self { generators })
    }

    /// Serialize this table in the same arkworks-compressed format
    /// `from_file` reads, for operators producing a fixture.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for g in &self.generators {
            (g.x(), g.y())
                .serialize_compressed(&mut out)
                .expect("serialization into a Vec cannot fail");
        }
        out
    }

    pub fn get(&self, index: usize) -> Option<Point> {
        self.generators.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

fn dev_table() -> &'static GeneratorTable {
    static TABLE: OnceLock<GeneratorTable> = OnceLock::new();
    TABLE.get_or_init(|| GeneratorTable::dev(2))
}

/// Errors from commitment computation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PedersenError {
    #[error("generator table has no generator at index {0}")]
    MissingGenerator(usize),
}

/// `secret·G0 + blinding·G1` using generator table index 0, the default
/// process-wide dev table. Both inputs are field elements, first reduced
/// to Grumpkin scalars.
pub fn pedersen_commit(secret: F, blinding: F) -> Point {
    pedersen_commit_with(dev_table(), secret, blinding)
}

/// As [`pedersen_commit`] but against an explicit generator table (used in
/// production once [`GeneratorTable::from_file`] has loaded the canonical
/// circuit generators).
pub fn pedersen_commit_with(table: &GeneratorTable, secret: F, blinding: F) -> Point {
    let g0 = table.get(0).expect("generator table must have index 0");
    let g1 = table.get(1).expect("generator table must have index 1");
    let s = secret.reduce_to_scalar();
    let b = blinding.reduce_to_scalar();
    g0.scalar_mul(&s).add(&g1.scalar_mul(&b))
}
