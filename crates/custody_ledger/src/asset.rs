//! Asset and account identifiers.
//!
//! The zero address is reserved for the native currency; every other address names a
//! fungible-token contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Textual form of the native-currency identifier.
pub const NATIVE_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Amount in an asset's smallest unit.
pub type Amount = u128;

/// Normalized (trimmed, lower-case) account address.
pub type AccountId = String;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AssetParseError {
    #[error("empty asset identifier")]
    Empty,
    #[error("asset address must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("asset address is not hex: {0}")]
    NotHex(String),
}

/// Lower-case, `0x`-prefixed, non-zero contract address. Only built by parsing.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAddress(String);

impl TokenAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AssetId {
    Native,
    Token(TokenAddress),
}

impl AssetId {
    /// Token identifier from an address; the zero address yields `Native`.
    pub fn token(address: &str) -> Result<Self, AssetParseError> {
        address.parse()
    }

    pub fn is_native(&self) -> bool {
        matches!(self, AssetId::Native)
    }
}

impl FromStr for AssetId {
    type Err = AssetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AssetParseError::Empty);
        }
        if s.eq_ignore_ascii_case("native") {
            return Ok(AssetId::Native);
        }
        let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) else {
            return Err(AssetParseError::MissingPrefix(s.to_string()));
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AssetParseError::NotHex(s.to_string()));
        }
        if digits.chars().all(|c| c == '0') {
            return Ok(AssetId::Native);
        }
        let address = TokenAddress(format!("0x{}", digits.to_lowercase()));
        Ok(AssetId::Token(address))
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Native => f.write_str(NATIVE_ADDRESS),
            AssetId::Token(addr) => f.write_str(addr.as_str()),
        }
    }
}

impl TryFrom<String> for AssetId {
    type Error = AssetParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AssetId> for String {
    fn from(value: AssetId) -> Self {
        value.to_string()
    }
}

/// Normalize an account address for use as a ledger key. The ledger, registry and
/// in-memory custodian apply this to every account they are handed.
pub fn normalize_account(account: &str) -> AccountId {
    account.trim().to_lowercase()
}

/// Serde adapter: amounts as decimal strings. `serde_json::Value` tops out at `u64`.
pub mod amount_text {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Amount, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Amount, D::Error> {
        let raw = String::deserialize(d)?;
        raw.trim().parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address_is_native() {
        assert_eq!(AssetId::token(NATIVE_ADDRESS).unwrap(), AssetId::Native);
        assert_eq!("0x0".parse::<AssetId>().unwrap(), AssetId::Native);
        assert_eq!("native".parse::<AssetId>().unwrap(), AssetId::Native);
        assert_eq!(AssetId::Native.to_string(), NATIVE_ADDRESS);
    }

    #[test]
    fn token_address_normalized() {
        let a = AssetId::token(" 0xABCdef0123 ").unwrap();
        assert_eq!(a, AssetId::token("0xabcdef0123").unwrap());
        assert_eq!(a.to_string(), "0xabcdef0123");
        assert!(!a.is_native());
    }

    #[test]
    fn rejects_bad_addresses() {
        assert_eq!(AssetId::token(""), Err(AssetParseError::Empty));
        assert!(matches!(
            AssetId::token("abc"),
            Err(AssetParseError::MissingPrefix(_))
        ));
        assert!(matches!(
            AssetId::token("0xzz"),
            Err(AssetParseError::NotHex(_))
        ));
    }

    #[test]
    fn serde_uses_address_text() {
        let json = serde_json::to_string(&AssetId::Native).unwrap();
        assert_eq!(json, format!("\"{}\"", NATIVE_ADDRESS));
        let back: AssetId = serde_json::from_str("\"0xAB\"").unwrap();
        assert_eq!(back, AssetId::token("0xab").unwrap());
        let zero: AssetId = serde_json::from_str("\"0x000\"").unwrap();
        assert_eq!(zero, AssetId::Native);
    }

    #[test]
    fn amount_text_keeps_large_values() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "amount_text")]
            v: Amount,
        }
        let big = 105_000_000_000_000_000_000u128;
        let json = serde_json::to_value(Wrapper { v: big }).unwrap();
        assert_eq!(json["v"], "105000000000000000000");
        let back: Wrapper = serde_json::from_value(json).unwrap();
        assert_eq!(back.v, big);
    }
}
