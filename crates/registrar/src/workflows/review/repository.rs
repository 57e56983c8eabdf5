use chrono::{DateTime, Utc};

use super::documents::DocumentChecklist;
use super::domain::{ApplicationId, ApplicationRecord, DecisionRecord};

/// Storage abstraction over the externally managed application table.
pub trait ApplicationRepository: Send + Sync {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;

    /// Writes a transition only if the stored `last_updated` still equals
    /// `expected_last_updated`, returning the row as written.
    fn persist_decision(
        &self,
        decision: &DecisionRecord,
        expected_last_updated: DateTime<Utc>,
    ) -> Result<ApplicationRecord, RepositoryError>;

    /// Pending and in-progress applications, oldest submission first.
    fn awaiting_review(&self, limit: usize) -> Result<Vec<ApplicationRecord>, RepositoryError>;
}

/// Read side of the document upload collaborator.
pub trait DocumentStore: Send + Sync {
    fn checklist(&self, id: &ApplicationId) -> Result<DocumentChecklist, RepositoryError>;
}

/// Error enumeration for collaborator failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
