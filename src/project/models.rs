//! Project and stage models
//!
//! A project moves through six fixed stages. Each stage kind has its own
//! record type so stage-specific fields (infra approval on `environment`,
//! the send date on `conversion`) only exist where they belong. The fields
//! every stage shares live in [`StageCommon`], flattened into the JSON form.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

/// Identifier of one of the six project stages, in pipeline order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Infra,
    Adherence,
    Environment,
    Conversion,
    Implementation,
    Post,
}

impl StageId {
    /// All stages in fixed display order
    pub const ALL: [StageId; 6] = [
        StageId::Infra,
        StageId::Adherence,
        StageId::Environment,
        StageId::Conversion,
        StageId::Implementation,
        StageId::Post,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Infra => "infra",
            StageId::Adherence => "adherence",
            StageId::Environment => "environment",
            StageId::Conversion => "conversion",
            StageId::Implementation => "implementation",
            StageId::Post => "post",
        }
    }

    /// Human-readable (pt-BR) stage name used in reasons
    pub fn label(&self) -> &'static str {
        match self {
            StageId::Infra => "Infraestrutura",
            StageId::Adherence => "Aderência",
            StageId::Environment => "Ambiente",
            StageId::Conversion => "Conversão",
            StageId::Implementation => "Implantação",
            StageId::Post => "Pós-implantação",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageId::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| ProjectError::UnknownStage(s.to_string()))
    }
}

/// Status of a single stage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Blocked,
}

impl StageStatus {
    pub const ALL: [StageStatus; 4] = [
        StageStatus::Todo,
        StageStatus::InProgress,
        StageStatus::Done,
        StageStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Todo => "todo",
            StageStatus::InProgress => "in-progress",
            StageStatus::Done => "done",
            StageStatus::Blocked => "blocked",
        }
    }

    /// pt-BR label
    pub fn label(&self) -> &'static str {
        match self {
            StageStatus::Todo => "a fazer",
            StageStatus::InProgress => "em andamento",
            StageStatus::Done => "concluída",
            StageStatus::Blocked => "bloqueada",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for StageStatus {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both `in-progress` and `in_progress`
        let normalized = s.trim().to_lowercase().replace('_', "-");
        StageStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ProjectError::InvalidStatus(s.to_string()))
    }
}

/// Overall status of a project
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GlobalStatus {
    #[default]
    NotStarted,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

/// A stage field that can be edited by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageField {
    Status,
    Responsible,
    StartDate,
    EndDate,
    Observations,
    /// Only on `conversion`
    SentAt,
    /// Only on `environment`
    ApprovedByInfra,
}

impl FromStr for StageField {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "status" => Ok(StageField::Status),
            "responsible" => Ok(StageField::Responsible),
            "startDate" | "start_date" => Ok(StageField::StartDate),
            "endDate" | "end_date" => Ok(StageField::EndDate),
            "observations" => Ok(StageField::Observations),
            "sentAt" | "sent_at" => Ok(StageField::SentAt),
            "approvedByInfra" | "approved_by_infra" => Ok(StageField::ApprovedByInfra),
            other => Err(ProjectError::UnknownField(other.to_string())),
        }
    }
}

/// Errors raised while editing project fields
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("unknown stage: {0}")]
    UnknownStage(String),
    #[error("unknown stage field: {0}")]
    UnknownField(String),
    #[error("invalid stage status: {0}")]
    InvalidStatus(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("invalid boolean: {0}")]
    InvalidBool(String),
    #[error("field {field} does not exist on stage {stage}")]
    FieldNotOnStage { field: &'static str, stage: StageId },
}

// ============================================================================
// Stage records
// ============================================================================

/// Fields shared by every stage
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StageCommon {
    pub status: StageStatus,
    /// Owner of the stage
    pub responsible: String,
    /// Date the stage was sent / initiated
    #[serde(deserialize_with = "deserialize_date")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_date")]
    pub end_date: Option<DateTime<Utc>>,
    pub observations: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InfraStage {
    #[serde(flatten)]
    pub common: StageCommon,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AdherenceStage {
    #[serde(flatten)]
    pub common: StageCommon,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentStage {
    #[serde(flatten)]
    pub common: StageCommon,
    /// Infra team signed off on the environment; gates implementation
    pub approved_by_infra: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionStage {
    #[serde(flatten)]
    pub common: StageCommon,
    /// Date the conversion was sent; overrides `startDate` for delay tracking
    #[serde(deserialize_with = "deserialize_date")]
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ImplementationStage {
    #[serde(flatten)]
    pub common: StageCommon,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PostStage {
    #[serde(flatten)]
    pub common: StageCommon,
}

/// The six stages of a project
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Stages {
    pub infra: InfraStage,
    pub adherence: AdherenceStage,
    pub environment: EnvironmentStage,
    pub conversion: ConversionStage,
    pub implementation: ImplementationStage,
    pub post: PostStage,
}

// ============================================================================
// Project
// ============================================================================

/// A client implementation / conversion project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_code: Option<String>,
    #[serde(default)]
    pub global_status: GlobalStatus,
    #[serde(default)]
    pub stages: Stages,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project with every stage in `todo`
    pub fn new(name: String, client_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            client_name,
            client_code: None,
            global_status: GlobalStatus::NotStarted,
            stages: Stages::default(),
            created_at: Utc::now(),
        }
    }

    /// Shared fields of a stage
    pub fn stage(&self, id: StageId) -> &StageCommon {
        match id {
            StageId::Infra => &self.stages.infra.common,
            StageId::Adherence => &self.stages.adherence.common,
            StageId::Environment => &self.stages.environment.common,
            StageId::Conversion => &self.stages.conversion.common,
            StageId::Implementation => &self.stages.implementation.common,
            StageId::Post => &self.stages.post.common,
        }
    }

    pub fn stage_mut(&mut self, id: StageId) -> &mut StageCommon {
        match id {
            StageId::Infra => &mut self.stages.infra.common,
            StageId::Adherence => &mut self.stages.adherence.common,
            StageId::Environment => &mut self.stages.environment.common,
            StageId::Conversion => &mut self.stages.conversion.common,
            StageId::Implementation => &mut self.stages.implementation.common,
            StageId::Post => &mut self.stages.post.common,
        }
    }

    pub fn status(&self, id: StageId) -> StageStatus {
        self.stage(id).status
    }

    /// Date delay is measured from: `sentAt` when the stage has one, else `startDate`
    pub fn reference_date(&self, id: StageId) -> Option<DateTime<Utc>> {
        let sent_at = match id {
            StageId::Conversion => self.stages.conversion.sent_at,
            _ => None,
        };
        sent_at.or(self.stage(id).start_date)
    }

    /// Set one stage field from its textual form.
    ///
    /// The value is parsed before anything is written, so a parse error leaves
    /// the project untouched.
    pub fn set_stage_field(
        &mut self,
        id: StageId,
        field: StageField,
        raw: &str,
    ) -> Result<(), ProjectError> {
        match field {
            StageField::Status => self.stage_mut(id).status = raw.parse()?,
            StageField::Responsible => self.stage_mut(id).responsible = raw.to_string(),
            StageField::Observations => self.stage_mut(id).observations = raw.to_string(),
            StageField::StartDate => self.stage_mut(id).start_date = parse_date(raw)?,
            StageField::EndDate => self.stage_mut(id).end_date = parse_date(raw)?,
            StageField::SentAt => {
                if id != StageId::Conversion {
                    return Err(ProjectError::FieldNotOnStage {
                        field: "sentAt",
                        stage: id,
                    });
                }
                self.stages.conversion.sent_at = parse_date(raw)?;
            }
            StageField::ApprovedByInfra => {
                if id != StageId::Environment {
                    return Err(ProjectError::FieldNotOnStage {
                        field: "approvedByInfra",
                        stage: id,
                    });
                }
                self.stages.environment.approved_by_infra = parse_bool(raw)?;
            }
        }
        Ok(())
    }
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
/// An empty string clears the date.
fn parse_date(raw: &str) -> Result<Option<DateTime<Utc>>, ProjectError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Some(naive.and_utc()))
        .ok_or_else(|| ProjectError::InvalidDate(raw.to_string()))
}

/// Stored stage dates may be RFC 3339, a plain date, empty or null
fn deserialize_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(raw) => parse_date(&raw).map_err(D::Error::custom),
        None => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Result<bool, ProjectError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "sim" => Ok(true),
        "false" | "no" | "0" | "nao" | "não" => Ok(false),
        _ => Err(ProjectError::InvalidBool(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Enum Tests
    // =========================================================================

    #[test]
    fn test_stage_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&StageStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        let status: StageStatus = serde_json::from_str("\"blocked\"").unwrap();
        assert_eq!(status, StageStatus::Blocked);
    }

    #[test]
    fn test_stage_status_from_str_accepts_underscore() {
        assert_eq!(
            "in_progress".parse::<StageStatus>().unwrap(),
            StageStatus::InProgress
        );
        assert_eq!("DONE".parse::<StageStatus>().unwrap(), StageStatus::Done);
        assert!("finished".parse::<StageStatus>().is_err());
    }

    #[test]
    fn test_stage_id_order_is_fixed() {
        let names: Vec<&str> = StageId::ALL.iter().map(|id| id.as_str()).collect();
        assert_eq!(
            names,
            vec!["infra", "adherence", "environment", "conversion", "implementation", "post"]
        );
        assert_eq!("Conversion".parse::<StageId>().unwrap(), StageId::Conversion);
    }

    // =========================================================================
    // Project Tests
    // =========================================================================

    #[test]
    fn test_project_new_all_stages_todo() {
        let project = Project::new("Migração".to_string(), "ACME".to_string());
        for id in StageId::ALL {
            assert_eq!(project.status(id), StageStatus::Todo);
        }
        assert_eq!(project.global_status, GlobalStatus::NotStarted);
        assert!(!project.stages.environment.approved_by_infra);
    }

    #[test]
    fn test_project_json_uses_camel_case_and_flattened_stage_fields() {
        let mut project = Project::new("P".to_string(), "C".to_string());
        project.stages.environment.approved_by_infra = true;
        project.stages.conversion.common.status = StageStatus::InProgress;

        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["stages"]["environment"]["approvedByInfra"], true);
        assert_eq!(json["stages"]["conversion"]["status"], "in-progress");
        assert!(json["stages"]["conversion"].get("common").is_none());
        assert!(json.get("globalStatus").is_some());

        let back: Project = serde_json::from_value(json).unwrap();
        assert_eq!(back, project);
    }

    #[test]
    fn test_project_deserializes_sparse_stages() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "name": "Sparse",
            "clientName": "Client",
            "createdAt": "2024-01-01T00:00:00Z",
            "stages": {
                "infra": { "status": "done", "responsible": "Ana" }
            }
        });
        let project: Project = serde_json::from_value(json).unwrap();
        assert_eq!(project.status(StageId::Infra), StageStatus::Done);
        assert_eq!(project.stage(StageId::Infra).responsible, "Ana");
        assert_eq!(project.status(StageId::Post), StageStatus::Todo);
    }

    #[test]
    fn test_reference_date_prefers_sent_at_on_conversion() {
        let mut project = Project::new("P".to_string(), "C".to_string());
        let start = "2024-03-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let sent = "2024-03-05T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        project.stages.conversion.common.start_date = Some(start);
        assert_eq!(project.reference_date(StageId::Conversion), Some(start));

        project.stages.conversion.sent_at = Some(sent);
        assert_eq!(project.reference_date(StageId::Conversion), Some(sent));

        project.stages.infra.common.start_date = Some(start);
        assert_eq!(project.reference_date(StageId::Infra), Some(start));
    }

    #[test]
    fn test_set_stage_field() {
        let mut project = Project::new("P".to_string(), "C".to_string());
        project
            .set_stage_field(StageId::Infra, StageField::Status, "in-progress")
            .unwrap();
        project
            .set_stage_field(StageId::Infra, StageField::StartDate, "2024-02-10")
            .unwrap();
        project
            .set_stage_field(StageId::Environment, StageField::ApprovedByInfra, "sim")
            .unwrap();

        assert_eq!(project.status(StageId::Infra), StageStatus::InProgress);
        assert_eq!(
            project.stage(StageId::Infra).start_date,
            Some("2024-02-10T00:00:00Z".parse().unwrap())
        );
        assert!(project.stages.environment.approved_by_infra);

        project
            .set_stage_field(StageId::Infra, StageField::StartDate, "")
            .unwrap();
        assert!(project.stage(StageId::Infra).start_date.is_none());
    }

    #[test]
    fn test_set_stage_field_rejects_field_on_wrong_stage() {
        let mut project = Project::new("P".to_string(), "C".to_string());
        let err = project
            .set_stage_field(StageId::Infra, StageField::SentAt, "2024-01-01")
            .unwrap_err();
        assert!(matches!(err, ProjectError::FieldNotOnStage { .. }));
        assert!(project.stages.conversion.sent_at.is_none());
    }

    #[test]
    fn test_set_stage_field_invalid_value_leaves_project_untouched() {
        let mut project = Project::new("P".to_string(), "C".to_string());
        let before = project.clone();
        assert!(project
            .set_stage_field(StageId::Adherence, StageField::Status, "finished")
            .is_err());
        assert!(project
            .set_stage_field(StageId::Adherence, StageField::EndDate, "31/12/2024")
            .is_err());
        assert_eq!(project, before);
    }
}
