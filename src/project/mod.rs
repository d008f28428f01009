//! Project domain: stage models, readiness rules, bottleneck detection,
//! and the JSON file store projects are persisted to.

pub mod bottleneck;
pub mod models;
pub mod readiness;
pub mod store;

pub use bottleneck::{
    days_stuck, identify_bottleneck, identify_bottleneck_at, identify_bottlenecks,
    identify_bottlenecks_at, BottleneckIssue, Severity,
};
pub use models::{
    GlobalStatus, Project, ProjectError, StageCommon, StageField, StageId, StageStatus, Stages,
};
pub use readiness::{
    get_stage_readiness, project_progress, ready_stages, stage_readiness, ProjectProgress,
    StageReadiness,
};
pub use store::FileProjectStore;
