//! Content addressing for stack configurations.
//!
//! A fingerprint hashes, in stack order, each stage's identifier, visibility
//! and parameter bag. Parameter keys are visited in sorted order and every
//! value is tagged with its type and length-prefixed, so two configurations
//! collide only if they are the same configuration.

use crate::core::filter::FilterSpec;
use crate::core::types::{ParamValue, Parameters};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of one ordered stack configuration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint an ordered list of stages.
    pub fn of(specs: &[FilterSpec]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((specs.len() as u64).to_le_bytes());
        for spec in specs {
            hash_str(&mut hasher, spec.identifier.as_str());
            hasher.update([spec.visible as u8]);
            hash_parameters(&mut hasher, &spec.parameter);
        }
        Self(hasher.finalize().into())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First 12 hex digits, for log lines.
    pub fn short(&self) -> String {
        self.to_string()[..12].to_string()
    }
}

fn hash_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_parameters(hasher: &mut Sha256, parameters: &Parameters) {
    hasher.update((parameters.len() as u64).to_le_bytes());
    // BTreeMap iteration is key-sorted.
    for (key, value) in parameters {
        hash_str(hasher, key);
        hash_value(hasher, value);
    }
}

fn hash_value(hasher: &mut Sha256, value: &ParamValue) {
    match value {
        ParamValue::Boolean(b) => {
            hasher.update([b'b', *b as u8]);
        }
        ParamValue::Integer(i) => {
            hasher.update([b'i']);
            hasher.update(i.to_le_bytes());
        }
        ParamValue::Float(f) => {
            hasher.update([b'f']);
            hasher.update(f.to_bits().to_le_bytes());
        }
        ParamValue::String(s) => {
            hasher.update([b's']);
            hash_str(hasher, s);
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}
