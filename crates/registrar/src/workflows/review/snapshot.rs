use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::blueprint::ReviewBlueprint;
use super::documents::{DocumentChecklist, DocumentKind, DocumentLink};
use super::domain::{
    ActorId, ApplicationId, ApplicationRecord, ApplicationStatus, OverallStatus, StepId,
    StepStatus,
};
use super::engine::WorkflowError;

/// One review step as displayed for a single interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub id: StepId,
    pub name: &'static str,
    pub description: &'static str,
    pub status: StepStatus,
    /// What the reviewer confirms before deciding.
    pub checks: Vec<&'static str>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_by: Option<ActorId>,
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<DocumentLink>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_documents: Vec<DocumentKind>,
}

/// Derived view of an application's review state. Rebuilt from the persisted
/// record on every load and never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSnapshot {
    pub application_id: ApplicationId,
    /// Index of the active step. Only derivation and transitions set it, so
    /// it always addresses `steps`.
    pub(crate) current_step: usize,
    pub current_status: ApplicationStatus,
    pub steps: [Step; StepId::COUNT],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowSnapshot {
    pub(crate) fn derive(
        blueprint: &ReviewBlueprint,
        record: &ApplicationRecord,
        documents: &DocumentChecklist,
    ) -> Result<Self, WorkflowError> {
        let status = record.status.ok_or_else(|| WorkflowError::MalformedApplication {
            application_id: record.application_id.clone(),
            reason: "status is missing".to_string(),
        })?;
        let current = StepId::from_label(&record.current_step).ok_or_else(|| {
            WorkflowError::MalformedApplication {
                application_id: record.application_id.clone(),
                reason: format!("unknown step label '{}'", record.current_step),
            }
        })?;

        let steps = StepId::ordered().map(|id| {
            let template = blueprint.step(id);
            let step_status = derive_step_status(id.index(), current.index(), status);
            let notes = match step_status {
                StepStatus::Rejected => record
                    .review_note
                    .as_ref()
                    .filter(|note| !note.trim().is_empty())
                    .cloned(),
                _ => None,
            };
            let (attachments, missing_documents) = match id {
                StepId::DocumentVerification => (documents.links(), documents.missing()),
                _ => (Vec::new(), Vec::new()),
            };

            Step {
                id,
                name: template.name,
                description: template.description,
                status: step_status,
                checks: template.checks.clone(),
                completed_at: None,
                completed_by: None,
                started_by: None,
                notes,
                attachments,
                missing_documents,
            }
        });

        Ok(Self {
            application_id: record.application_id.clone(),
            current_step: current.index(),
            current_status: status,
            steps,
            created_at: record.submitted_at,
            updated_at: record.last_updated,
        })
    }

    pub fn current_index(&self) -> usize {
        self.current_step
    }

    pub fn current(&self) -> &Step {
        &self.steps[self.current_step]
    }

    pub fn step(&self, id: StepId) -> &Step {
        &self.steps[id.index()]
    }

    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Completed)
            .count()
    }

    pub fn progress(&self) -> f64 {
        compute_progress(self)
    }

    pub fn overall_status(&self) -> OverallStatus {
        compute_overall_status(self)
    }
}

/// Displayed status of the step at `index` given the application's current
/// step and status.
pub fn derive_step_status(
    index: usize,
    current_step: usize,
    status: ApplicationStatus,
) -> StepStatus {
    match index.cmp(&current_step) {
        Ordering::Less => StepStatus::Completed,
        Ordering::Greater => StepStatus::Pending,
        Ordering::Equal => match status {
            ApplicationStatus::Rejected => StepStatus::Rejected,
            // final approval completes the last step even though it stays current
            ApplicationStatus::Approved if index == StepId::COUNT - 1 => StepStatus::Completed,
            _ => StepStatus::Pending,
        },
    }
}

/// Percentage of completed steps, unrounded.
pub fn compute_progress(snapshot: &WorkflowSnapshot) -> f64 {
    snapshot.completed_steps() as f64 * 100.0 / StepId::COUNT as f64
}

pub fn compute_overall_status(snapshot: &WorkflowSnapshot) -> OverallStatus {
    OverallStatus::from(snapshot.current_status)
}
