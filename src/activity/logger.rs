//! Activity logger
//!
//! Explicitly constructed and passed to whoever records activity; there is
//! no global instance. The current user is resolved through a
//! [`UserProvider`] and cached for a short time so bursts of edits do not
//! hit the provider once per event.

use super::{ActivityAction, ActivityEvent, EntityType, EventEmitter};
use crate::project::{StageId, StageStatus};
use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const CURRENT_USER_KEY: &str = "current_user";

/// Resolves who is making changes
#[async_trait]
pub trait UserProvider: Send + Sync {
    async fn current_user(&self) -> Result<Option<String>>;
}

/// Provider returning a fixed user (CLI, tests)
#[derive(Debug, Clone, Default)]
pub struct StaticUserProvider {
    user: Option<String>,
}

impl StaticUserProvider {
    pub fn new(user: Option<String>) -> Self {
        Self { user }
    }
}

#[async_trait]
impl UserProvider for StaticUserProvider {
    async fn current_user(&self) -> Result<Option<String>> {
        Ok(self.user.clone())
    }
}

pub struct ActivityLogger {
    emitter: Arc<dyn EventEmitter>,
    users: Arc<dyn UserProvider>,
    user_cache: Cache<&'static str, String>,
}

impl ActivityLogger {
    /// Create a logger whose current-user lookups are cached for `user_ttl`
    pub fn new(
        emitter: Arc<dyn EventEmitter>,
        users: Arc<dyn UserProvider>,
        user_ttl: Duration,
    ) -> Self {
        Self {
            emitter,
            users,
            user_cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(user_ttl)
                .build(),
        }
    }

    /// Current user, from cache when fresh. Provider errors are logged and
    /// yield `None`; activity is still recorded without a user.
    pub async fn current_user(&self) -> Option<String> {
        if let Some(user) = self.user_cache.get(&CURRENT_USER_KEY).await {
            return Some(user);
        }
        match self.users.current_user().await {
            Ok(Some(user)) => {
                self.user_cache.insert(CURRENT_USER_KEY, user.clone()).await;
                Some(user)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to resolve current user: {:#}", e);
                None
            }
        }
    }

    /// Drop the cached user (e.g. after sign-out)
    pub fn clear_user_cache(&self) {
        self.user_cache.invalidate_all();
    }

    pub async fn log(
        &self,
        entity_type: EntityType,
        action: ActivityAction,
        entity_id: impl Into<String>,
        payload: serde_json::Value,
    ) {
        let user = self.current_user().await;
        let event = ActivityEvent::new(entity_type, action, entity_id)
            .with_user(user)
            .with_payload(payload);
        debug!(
            entity_id = %event.entity_id,
            action = ?event.action,
            "Recording activity"
        );
        self.emitter.emit(event);
    }

    pub async fn log_project_updated(&self, project_id: Uuid, payload: serde_json::Value) {
        self.log(
            EntityType::Project,
            ActivityAction::Updated,
            project_id.to_string(),
            payload,
        )
        .await;
    }

    pub async fn log_stage_status(&self, project_id: Uuid, stage: StageId, status: StageStatus) {
        self.log(
            EntityType::Stage,
            ActivityAction::StatusChanged,
            project_id.to_string(),
            serde_json::json!({ "stage": stage, "status": status }),
        )
        .await;
    }
}
