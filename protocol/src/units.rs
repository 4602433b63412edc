//! Decimal rendering of smallest-unit amounts.
//!
//! Display only. The ledger itself never divides by a power of ten; these
//! helpers exist for CLI input and log output.

use thiserror::Error;

/// A decimal string could not be turned into smallest units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    /// Empty input, a stray character, or more than one decimal point.
    #[error("invalid decimal amount: {0:?}")]
    Malformed(String),

    /// More fractional digits than the denomination carries.
    #[error("too many decimal places in {input:?} (max {decimals})")]
    TooPrecise {
        /// The rejected input.
        input: String,
        /// The denomination's decimal places.
        decimals: u32,
    },

    /// The value does not fit in `u128` smallest units.
    #[error("amount {0:?} overflows")]
    Overflow(String),
}

/// Parses `"1.5"` with `decimals = 18` into `1_500_000_000_000_000_000`.
pub fn parse_units(input: &str, decimals: u32) -> Result<u128, UnitsError> {
    let trimmed = input.trim();
    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
        return Err(UnitsError::Malformed(input.to_string()));
    }
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            input: input.to_string(),
            decimals,
        });
    }

    let overflow = || UnitsError::Overflow(input.to_string());
    let scale = 10u128.checked_pow(decimals).ok_or_else(overflow)?;

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };
    let frac_units = if frac.is_empty() {
        0
    } else {
        let padding = 10u128.pow(decimals - frac.len() as u32);
        frac.parse::<u128>().map_err(|_| overflow())? * padding
    };

    whole_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or_else(overflow)
}

/// Renders smallest units as a decimal string, trimming trailing zeros but
/// always keeping one fractional digit (`"1.0"`, `"0.025"`).
pub fn format_units(amount: u128, decimals: u32) -> String {
    let Some(scale) = 10u128.checked_pow(decimals) else {
        return amount.to_string();
    };
    if decimals == 0 {
        return format!("{amount}.0");
    }
    let whole = amount / scale;
    let frac = amount % scale;
    let mut frac_str = format!("{:0width$}", frac, width = decimals as usize);
    while frac_str.len() > 1 && frac_str.ends_with('0') {
        frac_str.pop();
    }
    format!("{whole}.{frac_str}")
}
