//! Stage readiness
//!
//! A stage is *ready* when every prerequisite is satisfied and the stage
//! itself has not started yet (`todo`). Prerequisites only ever look at
//! predecessor stages, so the graph is acyclic:
//!
//! ```text
//! infra ─► adherence ─┬─► environment ─(approvedByInfra)─┐
//!                     └─► conversion ──(done)────────────┴─► implementation ─► post
//! ```

use super::models::{Project, StageId, StageStatus};
use serde::{Deserialize, Serialize};

/// Readiness of one stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StageReadiness {
    pub stage: StageId,
    /// Prerequisites satisfied and the stage is still `todo`
    pub is_ready: bool,
    pub prerequisites_met: bool,
    /// pt-BR explanation; wording is presentation only
    pub reason: String,
}

/// Overall completion of a project
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProjectProgress {
    pub done: usize,
    pub total: usize,
    pub percent: f64,
}

/// A single condition gating a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prerequisite {
    StageDone(StageId),
    /// `environment.approvedByInfra`
    InfraApproval,
}

impl Prerequisite {
    fn is_met(&self, project: &Project) -> bool {
        match self {
            Prerequisite::StageDone(id) => project.status(*id) == StageStatus::Done,
            Prerequisite::InfraApproval => project.stages.environment.approved_by_infra,
        }
    }

    fn describe(&self) -> String {
        match self {
            Prerequisite::StageDone(id) => format!("conclusão de {}", id.label()),
            Prerequisite::InfraApproval => "aprovação do ambiente pela Infraestrutura".to_string(),
        }
    }
}

const AFTER_INFRA: &[Prerequisite] = &[Prerequisite::StageDone(StageId::Infra)];
const AFTER_ADHERENCE: &[Prerequisite] = &[
    Prerequisite::StageDone(StageId::Infra),
    Prerequisite::StageDone(StageId::Adherence),
];
const BEFORE_IMPLEMENTATION: &[Prerequisite] = &[
    Prerequisite::StageDone(StageId::Conversion),
    Prerequisite::InfraApproval,
];
const AFTER_IMPLEMENTATION: &[Prerequisite] =
    &[Prerequisite::StageDone(StageId::Implementation)];

fn prerequisites(stage: StageId) -> &'static [Prerequisite] {
    match stage {
        StageId::Infra => &[],
        StageId::Adherence => AFTER_INFRA,
        StageId::Environment | StageId::Conversion => AFTER_ADHERENCE,
        StageId::Implementation => BEFORE_IMPLEMENTATION,
        StageId::Post => AFTER_IMPLEMENTATION,
    }
}

/// Evaluate one stage against its prerequisites
pub fn stage_readiness(project: &Project, stage: StageId) -> StageReadiness {
    let pending: Vec<String> = prerequisites(stage)
        .iter()
        .filter(|p| !p.is_met(project))
        .map(Prerequisite::describe)
        .collect();

    let prerequisites_met = pending.is_empty();
    let status = project.status(stage);
    let is_ready = prerequisites_met && status == StageStatus::Todo;

    let reason = if !prerequisites_met {
        format!("Aguardando {}", pending.join(" e "))
    } else if is_ready {
        if prerequisites(stage).is_empty() {
            "Sem pré-requisitos; pronta para iniciar".to_string()
        } else {
            "Pré-requisitos atendidos; pronta para iniciar".to_string()
        }
    } else {
        format!("Pré-requisitos atendidos; etapa {}", status.label())
    };

    StageReadiness {
        stage,
        is_ready,
        prerequisites_met,
        reason,
    }
}

/// Readiness of every stage, always six entries in fixed stage order
pub fn get_stage_readiness(project: &Project) -> Vec<StageReadiness> {
    StageId::ALL
        .into_iter()
        .map(|stage| stage_readiness(project, stage))
        .collect()
}

/// Stages that can be started right now
pub fn ready_stages(project: &Project) -> Vec<StageId> {
    get_stage_readiness(project)
        .into_iter()
        .filter(|r| r.is_ready)
        .map(|r| r.stage)
        .collect()
}

pub fn project_progress(project: &Project) -> ProjectProgress {
    let total = StageId::ALL.len();
    let done = StageId::ALL
        .into_iter()
        .filter(|id| project.status(*id) == StageStatus::Done)
        .count();
    ProjectProgress {
        done,
        total,
        percent: (done as f64 / total as f64 * 100.0).round(),
    }
}
