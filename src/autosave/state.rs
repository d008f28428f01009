//! Save state reported to observers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Success,
    Error,
}

/// Status of the most recent save cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveState {
    pub status: SaveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl SaveState {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Transition to `saving`, keeping the last successful save time
    pub fn saving(&self) -> Self {
        Self {
            status: SaveStatus::Saving,
            message: None,
            last_saved_at: self.last_saved_at,
        }
    }

    pub fn success(at: DateTime<Utc>) -> Self {
        Self {
            status: SaveStatus::Success,
            message: None,
            last_saved_at: Some(at),
        }
    }

    pub fn error(&self, message: impl Into<String>) -> Self {
        Self {
            status: SaveStatus::Error,
            message: Some(message.into()),
            last_saved_at: self.last_saved_at,
        }
    }

    /// Back to `idle` once success feedback has expired
    pub fn expired(&self) -> Self {
        Self {
            status: SaveStatus::Idle,
            message: None,
            last_saved_at: self.last_saved_at,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == SaveStatus::Error
    }
}
