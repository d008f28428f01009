//! JSON file store for projects
//!
//! One pretty-printed JSON file per project. Writes go to a sibling temp
//! file first and are renamed into place, so a reader never sees a
//! half-written project.

use super::models::{Project, StageId};
use crate::activity::ActivityLogger;
use crate::autosave::RecordStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub struct FileProjectStore {
    path: PathBuf,
    activity: Option<Arc<ActivityLogger>>,
}

impl FileProjectStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            activity: None,
        }
    }

    /// Resolve a project reference: an existing path is used as is,
    /// anything else is looked up as `<data_dir>/<name>.json`
    pub fn resolve(data_dir: &Path, reference: &str) -> Self {
        let direct = Path::new(reference);
        if direct.exists() || direct.extension().is_some() {
            return Self::new(direct);
        }
        Self::new(data_dir.join(format!("{reference}.json")))
    }

    /// Record a `project updated` activity after each successful save
    pub fn with_activity(mut self, logger: Arc<ActivityLogger>) -> Self {
        self.activity = Some(logger);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Project> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read project file {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid project file {}", self.path.display()))
    }

    async fn write(&self, project: &Project) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(project)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore<Project> for FileProjectStore {
    async fn save(&self, project: &Project) -> Result<()> {
        self.write(project).await?;
        debug!(project_id = %project.id, path = %self.path.display(), "Project written");

        if let Some(logger) = &self.activity {
            let statuses: serde_json::Map<String, serde_json::Value> = StageId::ALL
                .into_iter()
                .map(|id| (id.to_string(), serde_json::json!(project.status(id))))
                .collect();
            logger
                .log_project_updated(
                    project.id,
                    serde_json::json!({
                        "globalStatus": project.global_status,
                        "stages": statuses,
                    }),
                )
                .await;
        }
        Ok(())
    }
}
