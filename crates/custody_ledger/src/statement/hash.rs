//! SHA-256 reproducibility hash over a statement's normalized JSON.

use crate::statement::reconcile::CustodyStatement;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Normalize JSON for hashing: sorted keys, no whitespace.
pub fn normalize_for_hash(value: &serde_json::Value) -> Result<String, StatementError> {
    Ok(serde_json::to_string(&sort_json_keys(value))?)
}

fn sort_json_keys(v: &serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::Object(m) => {
            let sorted: std::collections::BTreeMap<&String, serde_json::Value> =
                m.iter().map(|(k, v)| (k, sort_json_keys(v))).collect();
            serde_json::Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), v))
                    .collect(),
            )
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sort_json_keys).collect())
        }
        other => other.clone(),
    }
}

pub fn reproducibility_hash(statement: &CustodyStatement) -> Result<String, StatementError> {
    let json = serde_json::to_value(statement)?;
    let normalized = normalize_for_hash(&json)?;
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationResult {
    pub statement_hash: String,
    pub expected_hash: Option<String>,
    pub matches: bool,
}

/// Compare a statement against an expected hex digest (e.g. a `.sha256` file's content).
pub fn verify_statement_hash(
    statement: &CustodyStatement,
    expected_hex: Option<&str>,
) -> Result<VerificationResult, StatementError> {
    let statement_hash = reproducibility_hash(statement)?;
    let expected = expected_hex.map(|e| e.trim().to_lowercase());
    let matches = expected.as_deref() == Some(statement_hash.as_str());
    Ok(VerificationResult {
        statement_hash,
        expected_hash: expected,
        matches,
    })
}

/// Statement plus its hash, as handed to the HTML renderer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatementReport {
    pub statement: CustodyStatement,
    pub reproducibility_hash_sha256: String,
}

impl StatementReport {
    pub fn new(statement: CustodyStatement) -> Result<Self, StatementError> {
        let reproducibility_hash_sha256 = reproducibility_hash(&statement)?;
        Ok(Self {
            statement,
            reproducibility_hash_sha256,
        })
    }
}
