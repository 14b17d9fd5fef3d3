//! The size or line-count bound enforced on the output.

use std::fmt;
use std::num::NonZeroU64;

use serde::Serialize;

use crate::error::{Error, Result};

/// Unit a [`Limit`] is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    Bytes,
    Lines,
}

/// Upper bound on the output, either in bytes or in lines.
///
/// Exactly one kind is active; the enum makes "both" unrepresentable and the
/// constructors reject zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Bytes(NonZeroU64),
    Lines(NonZeroU64),
}

impl Limit {
    /// Byte-count bound. Fails with [`Error::InvalidLimit`] on zero.
    pub fn bytes(n: u64) -> Result<Self> {
        NonZeroU64::new(n)
            .map(Limit::Bytes)
            .ok_or_else(|| Error::InvalidLimit("size must be greater than 0".into()))
    }

    /// Line-count bound. Fails with [`Error::InvalidLimit`] on zero.
    pub fn lines(n: u64) -> Result<Self> {
        NonZeroU64::new(n)
            .map(Limit::Lines)
            .ok_or_else(|| Error::InvalidLimit("lines must be greater than 0".into()))
    }

    /// Resolve a limit from the two optional CLI bounds.
    ///
    /// Exactly one of `bytes` / `lines` must be given.
    pub fn from_options(bytes: Option<u64>, lines: Option<u64>) -> Result<Self> {
        match (bytes, lines) {
            (Some(b), None) => Self::bytes(b),
            (None, Some(l)) => Self::lines(l),
            (Some(_), Some(_)) => Err(Error::InvalidLimit(
                "size and lines are mutually exclusive".into(),
            )),
            (None, None) => Err(Error::InvalidLimit(
                "one of size or lines is required".into(),
            )),
        }
    }

    pub fn kind(&self) -> LimitKind {
        match self {
            Limit::Bytes(_) => LimitKind::Bytes,
            Limit::Lines(_) => LimitKind::Lines,
        }
    }

    pub fn value(&self) -> u64 {
        match self {
            Limit::Bytes(n) | Limit::Lines(n) => n.get(),
        }
    }

    /// Whether `size`, measured in this limit's unit, fits within the bound.
    pub fn is_within(&self, size: u64) -> bool {
        size <= self.value()
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Bytes(n) => write!(f, "{n} bytes"),
            Limit::Lines(n) => write!(f, "{n} lines"),
        }
    }
}
