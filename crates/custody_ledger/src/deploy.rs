//! Deployment record written by the contract deployment tooling.
//!
//! Only the addresses are relied on; every other field is informational and may be absent.
//!
//! Load from: env `CUSTODY_LEDGER_DEPLOYMENT_PATH`, or `./config/deployments.json`, or
//! `./deployments.json`.

use crate::asset::{normalize_account, AccountId, AssetId, AssetParseError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEPLOYMENT_PATH_ENV: &str = "CUSTODY_LEDGER_DEPLOYMENT_PATH";

#[derive(Error, Debug)]
pub enum DeploymentError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("asset: {0}")]
    Asset(#[from] AssetParseError),
    #[error("no deployment record found")]
    NotFound,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub chain_id: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenContract {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerContract {
    pub address: String,
    #[serde(default)]
    pub supported_tokens: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    #[serde(default)]
    pub network: NetworkInfo,
    #[serde(rename = "smToken", alias = "token")]
    pub token: TokenContract,
    #[serde(rename = "depositContract", alias = "ledger")]
    pub ledger: LedgerContract,
    pub deployer: String,
    /// RFC3339 as written by the tooling; kept verbatim.
    #[serde(default)]
    pub timestamp: String,
}

impl DeploymentRecord {
    pub fn load_from_path(path: &Path) -> Result<Self, DeploymentError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load: env `CUSTODY_LEDGER_DEPLOYMENT_PATH`, then `./config/deployments.json`,
    /// then `./deployments.json`.
    pub fn load() -> Result<Self, DeploymentError> {
        if let Ok(path) = std::env::var(DEPLOYMENT_PATH_ENV) {
            let p = Path::new(&path);
            if p.exists() {
                return Self::load_from_path(p);
            }
        }
        for candidate in [
            Path::new("./config/deployments.json"),
            Path::new("./deployments.json"),
        ] {
            if candidate.exists() {
                return Self::load_from_path(candidate);
            }
        }
        Err(DeploymentError::NotFound)
    }

    /// Administrative principal: the deployer.
    pub fn owner(&self) -> AccountId {
        normalize_account(&self.deployer)
    }

    /// Tokens supported from construction: the listed ones, else the deployed token.
    pub fn initial_tokens(&self) -> Result<Vec<AssetId>, DeploymentError> {
        let raw: Vec<&str> = if self.ledger.supported_tokens.is_empty() {
            vec![self.token.address.as_str()]
        } else {
            self.ledger
                .supported_tokens
                .iter()
                .map(String::as_str)
                .collect()
        };
        let mut out = Vec::new();
        for addr in raw.into_iter().filter(|a| !a.trim().is_empty()) {
            let asset: AssetId = addr.parse()?;
            if !asset.is_native() && !out.contains(&asset) {
                out.push(asset);
            }
        }
        Ok(out)
    }
}
