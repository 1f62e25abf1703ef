//! Dataset domain model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// ZFS dataset as seen on the remote host
///
/// A transient view: every operation re-derives it from the remote listing.
/// Empty `compression` / `quota` mean "unset / inherited".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Identifier stored in the dataset's identifier property, assigned on create
    #[serde(rename = "uuid", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub compression: String,
    #[serde(default)]
    pub quota: String,
}

impl Dataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = compression.into();
        self
    }

    pub fn with_quota(mut self, quota: impl Into<String>) -> Self {
        self.quota = quota.into();
        self
    }

    /// Parse a single JSON object into a dataset record.
    ///
    /// Empty input, arrays and trailing objects are rejected.
    pub fn from_json(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AppError::parse("empty dataset record"));
        }

        let dataset: Dataset = serde_json::from_str(trimmed)
            .map_err(|e| AppError::Parse(format!("invalid dataset record: {}", e)))?;

        if dataset.name.is_empty() {
            return Err(AppError::parse("dataset record has an empty name"));
        }

        Ok(dataset)
    }
}
