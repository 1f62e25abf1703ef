//! Property assignment model (`key=value` for `zfs set` / `zfs create -o`)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A single property assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyAssignment {
    pub key: String,
    pub value: String,
}

impl PropertyAssignment {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Render as a single command argument
    pub fn to_arg(&self) -> String {
        format!("{}={}", self.key, self.value)
    }
}

impl fmt::Display for PropertyAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Accepts `key=value` and the quoted `key="value"` fragment form.
impl FromStr for PropertyAssignment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| AppError::Validation(format!("expected key=value, got '{}'", s)))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::Validation(format!("missing property name in '{}'", s)));
        }

        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);

        Ok(Self::new(key, value))
    }
}
