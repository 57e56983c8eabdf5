use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::ReviewConfig;

use super::domain::{ActorId, ApplicationId, ApplicationRecord, StepId};
use super::engine::{Decision, DecisionOutcome, WorkflowEngine, WorkflowError};
use super::repository::{ApplicationRepository, DocumentStore, RepositoryError};
use super::snapshot::WorkflowSnapshot;
use super::views::{ApplicationStatusView, ReviewQueueEntry};

/// Source of transition timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Service composing the workflow engine with the storage collaborators.
pub struct ReviewService<R, D> {
    engine: WorkflowEngine,
    repository: Arc<R>,
    documents: Arc<D>,
    config: ReviewConfig,
    clock: Clock,
}

/// Snapshot after a transition together with the row as persisted.
#[derive(Debug, Clone)]
pub struct PersistedTransition {
    pub snapshot: WorkflowSnapshot,
    pub record: ApplicationRecord,
}

impl<R, D> ReviewService<R, D>
where
    R: ApplicationRepository + 'static,
    D: DocumentStore + 'static,
{
    pub fn new(repository: Arc<R>, documents: Arc<D>) -> Self {
        Self {
            engine: WorkflowEngine::standard(),
            repository,
            documents,
            config: ReviewConfig::default(),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_config(mut self, config: ReviewConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    /// Current workflow snapshot including document links.
    pub fn snapshot(
        &self,
        application_id: &ApplicationId,
    ) -> Result<WorkflowSnapshot, ReviewServiceError> {
        let record = self.load(application_id)?;
        self.build(&record)
    }

    /// Starts the active step. The result is local; callers keep it in their
    /// own session state.
    pub fn start_step(
        &self,
        application_id: &ApplicationId,
        step: StepId,
        actor: &ActorId,
    ) -> Result<WorkflowSnapshot, ReviewServiceError> {
        let snapshot = self.snapshot(application_id)?;
        let started = self
            .engine
            .start_step(&snapshot, step, actor)
            .inspect_err(|err| warn!(%application_id, %step, %err, "step start refused"))?;
        debug!(%application_id, %step, %actor, "step started");
        Ok(started)
    }

    /// Applies a decision and persists it, conditioned on the record not
    /// having changed since it was read.
    pub fn decide(
        &self,
        application_id: &ApplicationId,
        step: StepId,
        decision: Decision,
        actor: &ActorId,
        expected_last_updated: Option<DateTime<Utc>>,
    ) -> Result<PersistedTransition, ReviewServiceError> {
        let record = self.load(application_id)?;
        self.ensure_fresh(&record, expected_last_updated)?;

        let snapshot = self.build(&record)?;
        let label = decision.label();
        let now = self.transition_time(&record);
        let outcome = self
            .engine
            .apply_decision(&snapshot, step, decision, actor, now)
            .inspect_err(|err| warn!(%application_id, %step, %err, "decision refused"))?;

        let transition = self.persist(&record, outcome)?;
        info!(
            %application_id,
            %step,
            decision = label,
            status = transition.snapshot.current_status.label(),
            %actor,
            "review decision recorded"
        );
        Ok(transition)
    }

    /// Returns a rejected or incomplete application to the active step.
    pub fn reopen(
        &self,
        application_id: &ApplicationId,
        actor: &ActorId,
        expected_last_updated: Option<DateTime<Utc>>,
    ) -> Result<PersistedTransition, ReviewServiceError> {
        let record = self.load(application_id)?;
        self.ensure_fresh(&record, expected_last_updated)?;

        let snapshot = self.build(&record)?;
        let now = self.transition_time(&record);
        let outcome = self
            .engine
            .reopen(&snapshot, actor, now)
            .inspect_err(|err| warn!(%application_id, %err, "reopen refused"))?;

        let transition = self.persist(&record, outcome)?;
        info!(
            %application_id,
            step = %transition.snapshot.current().id,
            %actor,
            "application reopened"
        );
        Ok(transition)
    }

    pub fn status_view(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationStatusView, ReviewServiceError> {
        let record = self.load(application_id)?;
        let snapshot = self.engine.build_snapshot(&record)?;
        Ok(ApplicationStatusView::new(&snapshot, &record))
    }

    /// Applications waiting on staff. Rows that fail to derive are logged and
    /// left out so one bad record does not hide the rest of the queue.
    pub fn queue(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<ReviewQueueEntry>, ReviewServiceError> {
        let limit = limit.unwrap_or(self.config.queue_limit);
        let records = self.repository.awaiting_review(limit)?;
        let entries = records
            .iter()
            .filter_map(|record| match self.engine.build_snapshot(record) {
                Ok(snapshot) => Some(ReviewQueueEntry::from(&snapshot)),
                Err(err) => {
                    warn!(
                        application_id = %record.application_id,
                        %err,
                        "skipping malformed application"
                    );
                    None
                }
            })
            .collect();
        Ok(entries)
    }

    fn load(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, ReviewServiceError> {
        self.repository
            .fetch(application_id)?
            .ok_or_else(|| ReviewServiceError::NotFound(application_id.clone()))
    }

    fn build(&self, record: &ApplicationRecord) -> Result<WorkflowSnapshot, ReviewServiceError> {
        let documents = self.documents.checklist(&record.application_id)?;
        let snapshot = self
            .engine
            .build_snapshot_with_documents(record, &documents)?;
        debug!(
            application_id = %record.application_id,
            current_step = snapshot.current_step,
            "workflow snapshot built"
        );
        Ok(snapshot)
    }

    /// `last_updated` is the only concurrency token, so every write must move
    /// it forward even when the clock has not.
    fn transition_time(&self, read: &ApplicationRecord) -> DateTime<Utc> {
        let now = (self.clock)();
        let floor = read.last_updated + Duration::nanoseconds(1);
        if now < floor {
            debug!(
                application_id = %read.application_id,
                %now,
                stored = %read.last_updated,
                "clock behind stored record, advancing transition time"
            );
            floor
        } else {
            now
        }
    }

    fn ensure_fresh(
        &self,
        record: &ApplicationRecord,
        expected_last_updated: Option<DateTime<Utc>>,
    ) -> Result<(), ReviewServiceError> {
        match expected_last_updated {
            Some(expected) if expected != record.last_updated => {
                warn!(
                    application_id = %record.application_id,
                    %expected,
                    stored = %record.last_updated,
                    "stale review snapshot"
                );
                Err(ReviewServiceError::Stale(record.application_id.clone()))
            }
            _ => Ok(()),
        }
    }

    fn persist(
        &self,
        read: &ApplicationRecord,
        outcome: DecisionOutcome,
    ) -> Result<PersistedTransition, ReviewServiceError> {
        let DecisionOutcome { snapshot, record } = outcome;
        let stored = self
            .repository
            .persist_decision(&record, read.last_updated)
            .map_err(|err| match err {
                RepositoryError::Conflict => {
                    warn!(
                        application_id = %read.application_id,
                        "concurrent review write rejected"
                    );
                    ReviewServiceError::Stale(read.application_id.clone())
                }
                other => ReviewServiceError::Repository(other),
            })?;

        Ok(PersistedTransition {
            snapshot,
            record: stored,
        })
    }
}

/// Error raised by the review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("application {0} changed since it was loaded; reload and retry")]
    Stale(ApplicationId),
}
