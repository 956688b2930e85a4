//! Money Module
//!
//! Units of account and signed amounts. All transfer values flow through
//! the types in this module.
//!
//! ## Internal Representation
//! - An [`Amount`] stores its value as an `i128` count of the currency's
//!   base unit (e.g. satoshi for BTC), so negating any `u64` magnitude is exact
//! - The attached [`Unit`] only decides how the value is displayed
//! - `Unit::decimals` is the power of ten between the unit and the base unit
//!   (BTC = 8, SAT = 0)
//!
//! ## Usage
//! ```rust
//! use wallet_transfer_core::money::{Amount, Unit};
//!
//! let btc = Unit::new("btc", "btc", "BTC", 8);
//! let amount = Amount::parse("1.5", &btc).unwrap();
//! assert_eq!(amount.value(), 150_000_000);
//! assert_eq!(amount.to_string(), "1.50000000 BTC");
//! ```

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Money conversion errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Incompatible units: {left} vs {right}")]
    IncompatibleUnits { left: String, right: String },
}

// ============================================================================
// Unit
// ============================================================================

/// A denomination of a currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Currency code shared by all units of one currency (e.g. "btc")
    pub currency: String,
    /// Unit code (e.g. "sat", "btc")
    pub code: String,
    /// Display symbol (e.g. "SAT", "BTC")
    pub symbol: String,
    /// Power of ten relative to the currency's base unit
    pub decimals: u32,
}

impl Unit {
    pub fn new(currency: &str, code: &str, symbol: &str, decimals: u32) -> Self {
        Self {
            currency: currency.to_string(),
            code: code.to_string(),
            symbol: symbol.to_string(),
            decimals,
        }
    }

    /// The base unit of `currency` (decimals = 0)
    pub fn base(currency: &str, code: &str, symbol: &str) -> Self {
        Self::new(currency, code, symbol, 0)
    }

    #[inline]
    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.currency == other.currency
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

// ============================================================================
// Amount
// ============================================================================

/// Signed amount of a currency, expressed in a display unit.
///
/// Equality compares the base-unit value and the currency; the display unit
/// does not take part (1 BTC == 100_000_000 SAT).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amount {
    value: i128,
    unit: Unit,
}

impl Amount {
    /// Create from a count of base units
    pub fn new(value: i128, unit: &Unit) -> Self {
        Self {
            value,
            unit: unit.clone(),
        }
    }

    /// Create from an unsigned magnitude in base units
    pub fn from_base_units(magnitude: u64, unit: &Unit) -> Self {
        Self::new(i128::from(magnitude), unit)
    }

    pub fn zero(unit: &Unit) -> Self {
        Self::new(0, unit)
    }

    /// Parse a client decimal string (e.g. "1.5") expressed in `unit`
    pub fn parse(amount_str: &str, unit: &Unit) -> Result<Self, MoneyError> {
        let value = parse_amount(amount_str, unit.decimals)?;
        Ok(Self::from_base_units(value, unit))
    }

    /// Value in base units
    #[inline]
    pub fn value(&self) -> i128 {
        self.value
    }

    #[inline]
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.value < 0
    }

    /// Opposite sign. Fails only for `i128::MIN`.
    pub fn checked_neg(&self) -> Result<Self, MoneyError> {
        let value = self.value.checked_neg().ok_or(MoneyError::Overflow)?;
        Ok(Self::new(value, &self.unit))
    }

    /// Same value, displayed in another unit of the same currency
    pub fn with_unit(&self, unit: &Unit) -> Result<Self, MoneyError> {
        self.ensure_compatible(unit)?;
        Ok(Self::new(self.value, unit))
    }

    /// Sum of two same-currency amounts, displayed in `self`'s unit
    pub fn checked_add(&self, other: &Amount) -> Result<Self, MoneyError> {
        self.ensure_compatible(&other.unit)?;
        let value = self
            .value
            .checked_add(other.value)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(value, &self.unit))
    }

    pub fn checked_sub(&self, other: &Amount) -> Result<Self, MoneyError> {
        self.ensure_compatible(&other.unit)?;
        let value = self
            .value
            .checked_sub(other.value)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(value, &self.unit))
    }

    /// Decimal value in the display unit
    pub fn to_decimal(&self) -> Result<Decimal, MoneyError> {
        Decimal::try_from_i128_with_scale(self.value, self.unit.decimals)
            .map_err(|_| MoneyError::Overflow)
    }

    fn ensure_compatible(&self, unit: &Unit) -> Result<(), MoneyError> {
        if self.unit.is_compatible(unit) {
            Ok(())
        } else {
            Err(MoneyError::IncompatibleUnits {
                left: self.unit.currency.clone(),
                right: unit.currency.clone(),
            })
        }
    }
}

impl PartialEq for Amount {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.unit.is_compatible(&other.unit)
    }
}

impl Eq for Amount {}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Ok(d) => write!(
                f,
                "{:.prec$} {}",
                d,
                self.unit.symbol,
                prec = self.unit.decimals as usize
            ),
            // Beyond Decimal's 96-bit range: fall back to base units
            Err(_) => write!(f, "{} (base units of {})", self.value, self.unit.currency),
        }
    }
}

// ============================================================================
// Parse: Client → Internal (String → u64)
// ============================================================================

/// Convert client string amount to internal u64 representation
///
/// # Errors
/// * `PrecisionOverflow` - If input has more decimal places than allowed
/// * `InvalidAmount` - If amount is zero or negative
/// * `Overflow` - If result would overflow u64
/// * `InvalidFormat` - If string format is invalid
pub fn parse_amount(amount_str: &str, decimals: u32) -> Result<u64, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    if amount_str.starts_with('-') || amount_str.starts_with('+') {
        return Err(MoneyError::InvalidAmount);
    }

    let (whole, frac) = match amount_str.split_once('.') {
        None => (amount_str, ""),
        Some((whole, frac)) => {
            // Both sides of the dot must be present: "0.5", never ".5" or "5."
            if whole.is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing leading zero (e.g., use 0.5 instead of .5)".into(),
                ));
            }
            if frac.is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing fractional part (e.g., use 5.0 instead of 5.)".into(),
                ));
            }
            if frac.contains('.') {
                return Err(MoneyError::InvalidFormat("multiple decimal points".into()));
            }
            if decimals == 0 {
                return Err(MoneyError::InvalidFormat(
                    "decimals is 0, but dot provided".into(),
                ));
            }
            (whole, frac)
        }
    };

    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MoneyError::InvalidFormat(format!(
            "invalid character in amount: {}",
            amount_str
        )));
    }

    // No silent truncation
    if frac.len() > decimals as usize {
        return Err(MoneyError::PrecisionOverflow {
            provided: frac.len() as u32,
            max: decimals,
        });
    }

    let whole_num: u64 = whole.parse::<u64>().map_err(|_| MoneyError::Overflow)?;

    let frac_num: u64 = if frac.is_empty() {
        0
    } else {
        let frac_padded = format!("{:0<width$}", frac, width = decimals as usize);
        frac_padded
            .parse::<u64>()
            .map_err(|_| MoneyError::InvalidFormat("invalid fractional part".into()))?
    };

    let multiplier = 10u64.checked_pow(decimals).ok_or(MoneyError::Overflow)?;
    let amount = whole_num
        .checked_mul(multiplier)
        .and_then(|v| v.checked_add(frac_num))
        .ok_or(MoneyError::Overflow)?;

    if amount == 0 {
        return Err(MoneyError::InvalidAmount);
    }

    Ok(amount)
}

/// Parse a base-unit integer string as reported by chain collaborators
pub fn parse_base_units(value: &str) -> Result<u64, MoneyError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MoneyError::InvalidFormat(format!(
            "invalid base unit value: {}",
            value
        )));
    }
    value.parse::<u64>().map_err(|_| MoneyError::Overflow)
}

// ============================================================================
// Unit Tests
// ============================================================================
