//! Staff review of admission applications.
//!
//! Every application moves through three fixed steps: document verification,
//! eligibility check and final review. The engine derives a
//! [`WorkflowSnapshot`] from the persisted [`ApplicationRecord`] on each load,
//! validates transitions against it, and hands back a [`DecisionRecord`] for the
//! caller to persist. Writes go through [`ReviewService`], which conditions
//! them on the record's `last_updated` so a stale snapshot never overwrites a
//! newer decision.

pub mod blueprint;
pub mod documents;
pub mod domain;
pub mod engine;
pub mod repository;
pub mod router;
pub mod service;
pub mod snapshot;
pub mod views;

#[cfg(test)]
mod tests;

pub use blueprint::{ReviewBlueprint, StepTemplate};
pub use documents::{DocumentChecklist, DocumentEntry, DocumentKind, DocumentLink, DocumentStatus};
pub use domain::{
    ActorId, ApplicationId, ApplicationRecord, ApplicationStatus, DecisionRecord, OverallStatus,
    StepId, StepStatus, UnknownStep,
};
pub use engine::{Decision, DecisionOutcome, WorkflowEngine, WorkflowError};
pub use repository::{ApplicationRepository, DocumentStore, RepositoryError};
pub use router::review_router;
pub use service::{Clock, PersistedTransition, ReviewService, ReviewServiceError};
pub use snapshot::{
    compute_overall_status, compute_progress, derive_step_status, Step, WorkflowSnapshot,
};
pub use views::{ApplicationStatusView, ReviewQueueEntry, TransitionView, WorkflowView};
