//! Knobs the transformation core accepts.
//!
//! The core never reads the environment. The binary builds a
//! [`TransformConfig`] from env vars and flags and passes it down.

use serde::{Deserialize, Serialize};

/// Release dates in the source dataset are `month/day/year`.
pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

/// What to do with a bridge row whose foreign key does not resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Drop the row and keep going.
    #[default]
    Lenient,
    /// Abort with `UnresolvedReference`.
    Strict,
}

/// What to do with a date or measure that does not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValuePolicy {
    /// Treat the value as missing.
    #[default]
    Lenient,
    /// Abort with `InvalidDate` / `InvalidNumber`.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    pub date_format: String,
    pub references: ReferencePolicy,
    pub values: ValuePolicy,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            references: ReferencePolicy::default(),
            values: ValuePolicy::default(),
        }
    }
}

impl TransformConfig {
    /// Both policies strict, default date format.
    pub fn strict() -> Self {
        Self {
            references: ReferencePolicy::Strict,
            values: ValuePolicy::Strict,
            ..Self::default()
        }
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn is_strict(&self) -> bool {
        self.references == ReferencePolicy::Strict && self.values == ValuePolicy::Strict
    }
}
