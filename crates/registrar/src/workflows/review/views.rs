use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ApplicationId, ApplicationRecord, ApplicationStatus, OverallStatus, StepId};
use super::snapshot::WorkflowSnapshot;

/// Snapshot plus the aggregates the review screen renders.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowView {
    #[serde(flatten)]
    pub snapshot: WorkflowSnapshot,
    pub progress: f64,
    pub overall_status: OverallStatus,
}

impl From<WorkflowSnapshot> for WorkflowView {
    fn from(snapshot: WorkflowSnapshot) -> Self {
        let progress = snapshot.progress();
        let overall_status = snapshot.overall_status();
        Self {
            snapshot,
            progress,
            overall_status,
        }
    }
}

/// Result of a persisted transition.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionView {
    pub workflow: WorkflowView,
    pub record: ApplicationRecord,
}

/// Student-facing status without reviewer identities.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub status_code: u8,
    pub progress: f64,
    pub current_step: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_note: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl ApplicationStatusView {
    pub fn new(snapshot: &WorkflowSnapshot, record: &ApplicationRecord) -> Self {
        Self {
            application_id: snapshot.application_id.clone(),
            status: snapshot.overall_status().label(),
            status_code: snapshot.current_status.code(),
            progress: snapshot.progress(),
            current_step: snapshot.current().name,
            review_note: match snapshot.current_status {
                ApplicationStatus::Rejected | ApplicationStatus::Incomplete => {
                    record.review_note.clone()
                }
                _ => None,
            },
            last_updated: record.last_updated,
        }
    }
}

/// Staff dashboard row.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewQueueEntry {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub current_step: StepId,
    pub progress: f64,
    pub submitted_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl From<&WorkflowSnapshot> for ReviewQueueEntry {
    fn from(snapshot: &WorkflowSnapshot) -> Self {
        Self {
            application_id: snapshot.application_id.clone(),
            status: snapshot.current_status,
            current_step: snapshot.current().id,
            progress: snapshot.progress(),
            submitted_at: snapshot.created_at,
            last_updated: snapshot.updated_at,
        }
    }
}
