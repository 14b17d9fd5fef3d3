//! Human-readable size strings (`"512"`, `"10K"`, `"1m"`, `"2G"`).
//!
//! Suffixes are binary multiples: `K` = 1024, `M` = 1024², `G` = 1024³,
//! `T` = 1024⁴. No suffix means bytes.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizeParseError {
    #[error("empty size")]
    Empty,
    #[error("invalid size suffix: {0:?}")]
    InvalidSuffix(char),
    #[error("invalid size number: {0:?}")]
    InvalidNumber(String),
    #[error("size {0:?} overflows")]
    Overflow(String),
}

fn multiplier(suffix: char) -> Option<u64> {
    match suffix {
        'K' => Some(1 << 10),
        'M' => Some(1 << 20),
        'G' => Some(1 << 30),
        'T' => Some(1 << 40),
        _ => None,
    }
}

/// Parse a size specification into a byte count.
pub fn parse_size(value: &str) -> Result<u64, SizeParseError> {
    let value = value.trim().to_ascii_uppercase();
    let Some(last) = value.chars().last() else {
        return Err(SizeParseError::Empty);
    };

    let (digits, factor) = if last.is_ascii_digit() {
        (value.as_str(), 1)
    } else {
        let factor = multiplier(last).ok_or(SizeParseError::InvalidSuffix(last))?;
        // `last` is one ASCII byte here, so this split lands on a char boundary.
        let (digits, _) = value.split_at(value.len() - 1);
        (digits.trim_end(), factor)
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SizeParseError::InvalidNumber(digits.to_string()));
    }
    let number: u64 = digits
        .parse()
        .map_err(|_| SizeParseError::Overflow(value.clone()))?;
    number
        .checked_mul(factor)
        .ok_or(SizeParseError::Overflow(value))
}
