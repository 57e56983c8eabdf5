use chrono::{DateTime, Utc};

use super::blueprint::ReviewBlueprint;
use super::documents::DocumentChecklist;
use super::domain::{
    ActorId, ApplicationId, ApplicationRecord, ApplicationStatus, DecisionRecord, OverallStatus,
    StepId, StepStatus,
};
use super::snapshot::{compute_overall_status, compute_progress, WorkflowSnapshot};

/// Errors raised by workflow derivation and transitions. None of them are
/// retryable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("application {application_id} is malformed: {reason}")]
    MalformedApplication {
        application_id: ApplicationId,
        reason: String,
    },
    #[error("invalid transition on {step}: {reason}")]
    InvalidTransition { step: StepId, reason: String },
}

/// Staff decision on the active step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve { notes: Option<String> },
    Reject {
        notes: String,
    },
    MarkIncomplete {
        notes: String,
    },
}

impl Decision {
    pub fn approve() -> Self {
        Self::Approve { notes: None }
    }

    pub fn reject(notes: impl Into<String>) -> Self {
        Self::Reject {
            notes: notes.into(),
        }
    }

    pub fn mark_incomplete(notes: impl Into<String>) -> Self {
        Self::MarkIncomplete {
            notes: notes.into(),
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
            Self::Reject { .. } => "reject",
            Self::MarkIncomplete { .. } => "mark_incomplete",
        }
    }
}

/// New snapshot plus the write the caller must persist.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub snapshot: WorkflowSnapshot,
    pub record: DecisionRecord,
}

impl DecisionOutcome {
    pub fn next_step_index(&self) -> usize {
        self.record.step_index
    }
}

/// Stateless state machine over the fixed review blueprint.
#[derive(Debug, Clone, Default)]
pub struct WorkflowEngine {
    blueprint: ReviewBlueprint,
}

impl WorkflowEngine {
    pub fn new(blueprint: ReviewBlueprint) -> Self {
        Self { blueprint }
    }

    pub fn standard() -> Self {
        Self::new(ReviewBlueprint::standard())
    }

    pub fn blueprint(&self) -> &ReviewBlueprint {
        &self.blueprint
    }

    pub fn build_snapshot(
        &self,
        record: &ApplicationRecord,
    ) -> Result<WorkflowSnapshot, WorkflowError> {
        self.build_snapshot_with_documents(record, &DocumentChecklist::empty())
    }

    pub fn build_snapshot_with_documents(
        &self,
        record: &ApplicationRecord,
        documents: &DocumentChecklist,
    ) -> Result<WorkflowSnapshot, WorkflowError> {
        WorkflowSnapshot::derive(&self.blueprint, record, documents)
    }

    /// Marks the active step in-progress locally. Nothing needs persisting.
    pub fn start_step(
        &self,
        snapshot: &WorkflowSnapshot,
        step: StepId,
        actor: &ActorId,
    ) -> Result<WorkflowSnapshot, WorkflowError> {
        let index = ensure_active(snapshot, step)?;
        ensure_open(snapshot, step)?;
        let current = &snapshot.steps[index];
        if current.status != StepStatus::Pending {
            return Err(WorkflowError::InvalidTransition {
                step,
                reason: format!(
                    "step is {}, only pending steps can start",
                    current.status.label()
                ),
            });
        }

        let mut next = snapshot.clone();
        let started = &mut next.steps[index];
        started.status = StepStatus::InProgress;
        started.started_by = Some(actor.clone());
        Ok(next)
    }

    pub fn apply_decision(
        &self,
        snapshot: &WorkflowSnapshot,
        step: StepId,
        decision: Decision,
        actor: &ActorId,
        now: DateTime<Utc>,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let index = ensure_active(snapshot, step)?;
        ensure_open(snapshot, step)?;
        let status = snapshot.steps[index].status;
        if !matches!(status, StepStatus::Pending | StepStatus::InProgress) {
            return Err(WorkflowError::InvalidTransition {
                step,
                reason: format!("step is {}", status.label()),
            });
        }

        let mut next = snapshot.clone();
        next.updated_at = now;
        let target = &mut next.steps[index];

        let (application_status, step_index, note) = match decision {
            Decision::Approve { notes } => {
                target.status = StepStatus::Completed;
                target.completed_at = Some(now);
                target.completed_by = Some(actor.clone());
                target.notes = None;
                let application_status = if step.is_final() {
                    ApplicationStatus::Approved
                } else {
                    ApplicationStatus::InProgress
                };
                let next_index = (index + 1).min(StepId::COUNT - 1);
                (application_status, next_index, non_blank(notes))
            }
            Decision::Reject { notes } => {
                let notes = required_notes(step, notes)?;
                target.status = StepStatus::Rejected;
                target.notes = Some(notes.clone());
                (ApplicationStatus::Rejected, index, Some(notes))
            }
            Decision::MarkIncomplete { notes } => {
                let notes = required_notes(step, notes)?;
                target.status = StepStatus::Pending;
                target.started_by = None;
                target.notes = None;
                (ApplicationStatus::Incomplete, index, Some(notes))
            }
        };

        next.current_step = step_index;
        next.current_status = application_status;

        let record = DecisionRecord {
            application_id: snapshot.application_id.clone(),
            status: application_status,
            step_index,
            last_updated: now,
            reviewed_by: actor.clone(),
            note,
        };

        Ok(DecisionOutcome {
            snapshot: next,
            record,
        })
    }

    /// Explicit reset for a rejected or incomplete application. The active
    /// step returns to pending and progression resumes from it.
    pub fn reopen(
        &self,
        snapshot: &WorkflowSnapshot,
        actor: &ActorId,
        now: DateTime<Utc>,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let step = active_step(snapshot)?;
        let index = step.index();
        if !matches!(
            snapshot.current_status,
            ApplicationStatus::Rejected | ApplicationStatus::Incomplete
        ) {
            return Err(WorkflowError::InvalidTransition {
                step,
                reason: format!(
                    "only rejected or incomplete applications can reopen, application is {}",
                    snapshot.current_status.label()
                ),
            });
        }

        let application_status = if index == 0 {
            ApplicationStatus::Pending
        } else {
            ApplicationStatus::InProgress
        };

        let mut next = snapshot.clone();
        next.updated_at = now;
        next.current_status = application_status;
        let reopened = &mut next.steps[index];
        reopened.status = StepStatus::Pending;
        reopened.notes = None;
        reopened.started_by = None;

        let record = DecisionRecord {
            application_id: snapshot.application_id.clone(),
            status: application_status,
            step_index: index,
            last_updated: now,
            reviewed_by: actor.clone(),
            note: None,
        };

        Ok(DecisionOutcome {
            snapshot: next,
            record,
        })
    }

    pub fn compute_progress(&self, snapshot: &WorkflowSnapshot) -> f64 {
        compute_progress(snapshot)
    }

    pub fn compute_overall_status(&self, snapshot: &WorkflowSnapshot) -> OverallStatus {
        compute_overall_status(snapshot)
    }
}

fn active_step(snapshot: &WorkflowSnapshot) -> Result<StepId, WorkflowError> {
    StepId::from_index(snapshot.current_index()).ok_or_else(|| {
        WorkflowError::MalformedApplication {
            application_id: snapshot.application_id.clone(),
            reason: format!("step index {} is out of range", snapshot.current_index()),
        }
    })
}

fn ensure_active(snapshot: &WorkflowSnapshot, step: StepId) -> Result<usize, WorkflowError> {
    let active = active_step(snapshot)?;
    if active != step {
        return Err(WorkflowError::InvalidTransition {
            step,
            reason: format!("{} is the active step", active.key()),
        });
    }
    Ok(step.index())
}

/// Approved and rejected applications take no further step transitions.
fn ensure_open(snapshot: &WorkflowSnapshot, step: StepId) -> Result<(), WorkflowError> {
    if snapshot.current_status.is_settled() {
        return Err(WorkflowError::InvalidTransition {
            step,
            reason: format!(
                "application is already {}",
                snapshot.current_status.label()
            ),
        });
    }
    Ok(())
}

fn required_notes(step: StepId, notes: String) -> Result<String, WorkflowError> {
    non_blank(Some(notes)).ok_or_else(|| WorkflowError::InvalidTransition {
        step,
        reason: "notes are required".to_string(),
    })
}

fn non_blank(notes: Option<String>) -> Option<String> {
    notes
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
