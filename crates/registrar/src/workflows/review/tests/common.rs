use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::workflows::review::documents::{DocumentChecklist, DocumentKind};
use crate::workflows::review::domain::{
    ActorId, ApplicationId, ApplicationRecord, ApplicationStatus, DecisionRecord, StepId,
};
use crate::workflows::review::repository::{
    ApplicationRepository, DocumentStore, RepositoryError,
};
use crate::workflows::review::service::ReviewService;

pub(super) fn submitted_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn decided_at() -> DateTime<Utc> {
    submitted_at() + Duration::days(3)
}

pub(super) fn registrar() -> ActorId {
    ActorId("staff-ayse".to_string())
}

pub(super) fn application(
    id: &str,
    status: Option<ApplicationStatus>,
    step: &str,
) -> ApplicationRecord {
    ApplicationRecord {
        application_id: ApplicationId(id.to_string()),
        status,
        current_step: step.to_string(),
        submitted_at: submitted_at(),
        last_updated: submitted_at(),
        review_note: None,
        reviewed_by: None,
    }
}

pub(super) fn new_application(id: &str) -> ApplicationRecord {
    ApplicationRecord::submitted(ApplicationId(id.to_string()), submitted_at())
}

pub(super) fn at_step(id: &str, status: ApplicationStatus, step: StepId) -> ApplicationRecord {
    application(id, Some(status), step.label())
}

pub(super) fn uploaded_documents() -> DocumentChecklist {
    DocumentChecklist::empty()
        .with_upload(
            DocumentKind::IdentityDocument,
            "https://storage.example/app/id.pdf",
        )
        .with_upload(
            DocumentKind::AcademicTranscript,
            "https://storage.example/app/transcript.pdf",
        )
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl MemoryRepository {
    pub(super) fn seed(&self, record: ApplicationRecord) {
        self.records
            .lock()
            .expect("lock")
            .insert(record.application_id.clone(), record);
    }

    pub(super) fn get(&self, id: &str) -> ApplicationRecord {
        self.records
            .lock()
            .expect("lock")
            .get(&ApplicationId(id.to_string()))
            .cloned()
            .expect("record present")
    }

    /// Simulates another reviewer writing between our read and our write.
    pub(super) fn touch(&self, id: &str, at: DateTime<Utc>) {
        let mut guard = self.records.lock().expect("lock");
        if let Some(record) = guard.get_mut(&ApplicationId(id.to_string())) {
            record.last_updated = at;
        }
    }
}

impl ApplicationRepository for MemoryRepository {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(self.records.lock().expect("lock").get(id).cloned())
    }

    fn persist_decision(
        &self,
        decision: &DecisionRecord,
        expected_last_updated: DateTime<Utc>,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("lock");
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
        let guard = self.records.lock().expect("lock");
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
        records.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDocuments {
    checklists: Arc<Mutex<HashMap<ApplicationId, DocumentChecklist>>>,
}

impl MemoryDocuments {
    pub(super) fn seed(&self, id: &str, checklist: DocumentChecklist) {
        self.checklists
            .lock()
            .expect("lock")
            .insert(ApplicationId(id.to_string()), checklist);
    }
}

impl DocumentStore for MemoryDocuments {
    fn checklist(&self, id: &ApplicationId) -> Result<DocumentChecklist, RepositoryError> {
        Ok(self
            .checklists
            .lock()
            .expect("lock")
            .get(id)
            .cloned()
            .unwrap_or_default())
    }
}

pub(super) fn build_service() -> (
    ReviewService<MemoryRepository, MemoryDocuments>,
    Arc<MemoryRepository>,
    Arc<MemoryDocuments>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let documents = Arc::new(MemoryDocuments::default());
    let service = ReviewService::new(repository.clone(), documents.clone())
        .with_clock(Arc::new(decided_at));
    (service, repository, documents)
}
