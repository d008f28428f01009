//! Activity event types

use serde::{Deserialize, Serialize};

/// The kind of record an activity refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Project,
    Stage,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Project => "project",
            EntityType::Stage => "stage",
        }
    }
}

/// What happened to the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    StatusChanged,
    Deleted,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Created => "created",
            ActivityAction::Updated => "updated",
            ActivityAction::StatusChanged => "status_changed",
            ActivityAction::Deleted => "deleted",
        }
    }
}

/// One entry of the activity log
///
/// Must be Clone for `tokio::sync::broadcast`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub entity_type: EntityType,
    pub action: ActivityAction,
    pub entity_id: String,
    /// User who made the change, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Optional details (changed field, new status, ...)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl ActivityEvent {
    /// Create a new event with the current timestamp
    pub fn new(entity_type: EntityType, action: ActivityAction, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            action,
            entity_id: entity_id.into(),
            user: None,
            payload: serde_json::Value::Null,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// One-line description, e.g. `stage status_changed 42 by ana {"stage":"infra"}`
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} {} {}",
            self.entity_type.as_str(),
            self.action.as_str(),
            self.entity_id
        );
        if let Some(user) = &self.user {
            line.push_str(&format!(" by {user}"));
        }
        if !self.payload.is_null() {
            line.push_str(&format!(" {}", self.payload));
        }
        line
    }
}

/// Sink for activity events. Emitting never blocks and never fails.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: ActivityEvent);
}
