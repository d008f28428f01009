//! Bottleneck detection
//!
//! Flags in-progress stages that have been stuck for more than a week and
//! ranks them by severity. Classification is recomputed from
//! `(status, reference date, now)` on every call; nothing is stored.

use super::models::{Project, StageId, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stage stuck for more than this many days is a bottleneck
pub const BOTTLENECK_THRESHOLD_DAYS: i64 = 7;
/// Above this, severity is at least medium
pub const MEDIUM_THRESHOLD_DAYS: i64 = 10;
/// Above this, severity is high
pub const HIGH_THRESHOLD_DAYS: i64 = 14;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Stages whose delay is tracked. Implementation and post are excluded.
const CANDIDATES: [StageId; 4] = [
    StageId::Infra,
    StageId::Adherence,
    StageId::Environment,
    StageId::Conversion,
];

/// Severity of a bottleneck, ordered `None < Low < Medium < High`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Severity for a stage stuck `days` days
    pub fn from_days(days: i64) -> Self {
        if days > HIGH_THRESHOLD_DAYS {
            Severity::High
        } else if days > MEDIUM_THRESHOLD_DAYS {
            Severity::Medium
        } else if days > BOTTLENECK_THRESHOLD_DAYS {
            Severity::Low
        } else {
            Severity::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// A stalled stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BottleneckIssue {
    /// `None` only for the "no bottleneck" sentinel
    pub stage: Option<StageId>,
    pub severity: Severity,
    pub days_stuck: i64,
    pub reason: String,
}

impl BottleneckIssue {
    /// Sentinel returned by [`identify_bottleneck`] when nothing is stuck
    pub fn none() -> Self {
        Self {
            stage: None,
            severity: Severity::None,
            days_stuck: 0,
            reason: "Nenhum gargalo identificado".to_string(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.severity == Severity::None
    }
}

/// Whole days a stage has been in progress, rounded up.
///
/// Zero unless the stage is `in-progress` and has a reference date; never negative.
pub fn days_stuck(
    status: StageStatus,
    reference: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    if status != StageStatus::InProgress {
        return 0;
    }
    let Some(reference) = reference else {
        return 0;
    };
    let elapsed_ms = (now - reference).num_milliseconds();
    if elapsed_ms <= 0 {
        return 0;
    }
    // ceil for positive values
    (elapsed_ms + DAY_MS - 1) / DAY_MS
}

/// Bottlenecks of a project as of now
pub fn identify_bottlenecks(project: &Project) -> Vec<BottleneckIssue> {
    identify_bottlenecks_at(project, Utc::now())
}

/// Bottlenecks as of `now`, sorted by severity then days stuck (both descending)
pub fn identify_bottlenecks_at(project: &Project, now: DateTime<Utc>) -> Vec<BottleneckIssue> {
    let mut issues: Vec<BottleneckIssue> = CANDIDATES
        .into_iter()
        .filter_map(|stage| {
            let days = days_stuck(project.status(stage), project.reference_date(stage), now);
            if days <= BOTTLENECK_THRESHOLD_DAYS {
                return None;
            }
            Some(BottleneckIssue {
                stage: Some(stage),
                severity: Severity::from_days(days),
                days_stuck: days,
                reason: format!("{} em andamento há {} dias", stage.label(), days),
            })
        })
        .collect();

    issues.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.days_stuck.cmp(&a.days_stuck))
    });
    issues
}

/// Primary bottleneck for headline display, or the sentinel
pub fn identify_bottleneck(project: &Project) -> BottleneckIssue {
    identify_bottleneck_at(project, Utc::now())
}

pub fn identify_bottleneck_at(project: &Project, now: DateTime<Utc>) -> BottleneckIssue {
    identify_bottlenecks_at(project, now)
        .into_iter()
        .next()
        .unwrap_or_else(BottleneckIssue::none)
}
