use chrono::{DateTime, Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use registrar::workflows::review::{
    ApplicationId, ApplicationRecord, ApplicationRepository, ApplicationStatus, DecisionRecord,
    DocumentChecklist, DocumentKind, DocumentStore, RepositoryError, StepId,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stand-in for the portal's application table.
#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl InMemoryApplicationRepository {
    pub(crate) fn insert(&self, record: ApplicationRecord) {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.application_id.clone(), record);
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn persist_decision(
        &self,
        decision: &DecisionRecord,
        expected_last_updated: DateTime<Utc>,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard
            .get_mut(&decision.application_id)
            .ok_or(RepositoryError::NotFound)?;
        if record.last_updated != expected_last_updated {
            return Err(RepositoryError::Conflict);
        }
        record.apply(decision);
        Ok(record.clone())
    }

    fn awaiting_review(&self, limit: usize) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<ApplicationRecord> = guard
            .values()
            .filter(|record| {
                matches!(
                    record.status,
                    Some(ApplicationStatus::Pending | ApplicationStatus::InProgress)
                )
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.application_id.0.cmp(&b.application_id.0))
        });
        records.truncate(limit);
        Ok(records)
    }
}

/// Stand-in for the upload service's per-application checklist.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDocumentStore {
    checklists: Arc<Mutex<HashMap<ApplicationId, DocumentChecklist>>>,
}

impl InMemoryDocumentStore {
    pub(crate) fn insert(&self, id: ApplicationId, checklist: DocumentChecklist) {
        let mut guard = self.checklists.lock().expect("document mutex poisoned");
        guard.insert(id, checklist);
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn checklist(&self, id: &ApplicationId) -> Result<DocumentChecklist, RepositoryError> {
        let guard = self.checklists.lock().expect("document mutex poisoned");
        Ok(guard.get(id).cloned().unwrap_or_default())
    }
}

/// Registers a handful of submitted applications so a fresh server or demo
/// has something to review. Returns the seeded ids, oldest first.
pub(crate) fn seed_sample_applications(
    repository: &InMemoryApplicationRepository,
    documents: &InMemoryDocumentStore,
    now: DateTime<Utc>,
) -> Vec<ApplicationId> {
    let samples = [
        ("APP-2025-0001", 5, ApplicationStatus::Pending, StepId::DocumentVerification),
        ("APP-2025-0002", 4, ApplicationStatus::InProgress, StepId::EligibilityCheck),
        ("APP-2025-0003", 2, ApplicationStatus::InProgress, StepId::FinalReview),
    ];

    samples
        .into_iter()
        .map(|(raw_id, days_ago, status, step)| {
            let id = ApplicationId(raw_id.to_string());
            let submitted_at = now - Duration::days(days_ago);
            let mut record = ApplicationRecord::submitted(id.clone(), submitted_at);
            record.status = Some(status);
            record.current_step = step.label().to_string();
            repository.insert(record);

            let checklist = DocumentChecklist::empty()
                .with_upload(
                    DocumentKind::IdentityDocument,
                    format!("https://uploads.registrar.local/{raw_id}/identity.pdf"),
                )
                .with_upload(
                    DocumentKind::AcademicTranscript,
                    format!("https://uploads.registrar.local/{raw_id}/transcript.pdf"),
                )
                .with_upload(
                    DocumentKind::Photograph,
                    format!("https://uploads.registrar.local/{raw_id}/photo.jpg"),
                );
            documents.insert(id.clone(), checklist);
            id
        })
        .collect()
}
