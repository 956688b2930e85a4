//! Transfer Core Types
//!
//! Identifiers and the direction enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::TransferError;

/// Transfer ID - ULID-based unique identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferId(ulid::Ulid);

impl TransferId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransferId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// Transaction hash as reported by the network (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferHash([u8; 32]);

impl TransferHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TransferHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for TransferHash {
    type Err = TransferError;

    /// Accepts 64 hex characters, with or without a `0x` prefix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| TransferError::Construction(format!("invalid transfer hash {}: {}", s, e)))?;
        Ok(Self(bytes))
    }
}

/// Direction of a transfer relative to the observing wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum TransferDirection {
    /// Value leaves the wallet
    Sent = 0,
    /// Value enters the wallet
    Received = 1,
    /// Sent to the wallet's own address; net zero apart from the fee
    Recovered = 2,
}

impl TransferDirection {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TransferDirection::Sent),
            1 => Some(TransferDirection::Received),
            2 => Some(TransferDirection::Recovered),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferDirection::Sent => "SENT",
            TransferDirection::Received => "RECEIVED",
            TransferDirection::Recovered => "RECOVERED",
        }
    }

    /// Classify by which side of the movement the wallet owns
    pub fn from_ownership(owns_source: bool, owns_target: bool) -> Option<Self> {
        match (owns_source, owns_target) {
            (true, true) => Some(TransferDirection::Recovered),
            (true, false) => Some(TransferDirection::Sent),
            (false, true) => Some(TransferDirection::Received),
            (false, false) => None,
        }
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw direction codes come from outside the core; anything outside the
/// closed enumeration is an upstream bug.
impl TryFrom<i16> for TransferDirection {
    type Error = TransferError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        TransferDirection::from_id(value).ok_or_else(|| {
            TransferError::InvalidState(format!("Invalid transfer direction: {}", value))
        })
    }
}

impl FromStr for TransferDirection {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sent" => Ok(TransferDirection::Sent),
            "received" => Ok(TransferDirection::Received),
            "recovered" => Ok(TransferDirection::Recovered),
            _ => Err(TransferError::InvalidState(format!(
                "Invalid transfer direction: {}",
                s
            ))),
        }
    }
}
