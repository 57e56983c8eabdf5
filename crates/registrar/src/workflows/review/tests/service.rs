use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::common::*;
use crate::config::ReviewConfig;
use crate::workflows::review::domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, DecisionRecord, OverallStatus, StepId,
    StepStatus,
};
use crate::workflows::review::engine::{Decision, WorkflowError};
use crate::workflows::review::repository::{ApplicationRepository, RepositoryError};
use crate::workflows::review::service::{ReviewService, ReviewServiceError};

fn id(value: &str) -> ApplicationId {
    ApplicationId(value.to_string())
}

/// Lets another writer land between the service's read and its write.
struct RacingRepository {
    inner: MemoryRepository,
}

impl ApplicationRepository for RacingRepository {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn persist_decision(
        &self,
        decision: &DecisionRecord,
        expected_last_updated: DateTime<Utc>,
    ) -> Result<ApplicationRecord, RepositoryError> {
        self.inner
            .touch(&decision.application_id.0, decided_at() + Duration::minutes(1));
        self.inner.persist_decision(decision, expected_last_updated)
    }

    fn awaiting_review(&self, limit: usize) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.inner.awaiting_review(limit)
    }
}

#[test]
fn decide_persists_the_transition() {
    let (service, repository, _) = build_service();
    repository.seed(new_application("app-1"));

    let transition = service
        .decide(
            &id("app-1"),
            StepId::DocumentVerification,
            Decision::approve(),
            &registrar(),
            Some(submitted_at()),
        )
        .expect("decision stored");

    assert_eq!(transition.snapshot.current_step, 1);
    assert_eq!(transition.record.status, Some(ApplicationStatus::InProgress));
    assert_eq!(transition.record.current_step, "Eligibility Check");
    assert_eq!(transition.record.last_updated, decided_at());
    assert_eq!(transition.record.reviewed_by, Some(registrar()));
    assert_eq!(repository.get("app-1"), transition.record);
}

#[test]
fn full_walk_reaches_approved() {
    let (service, repository, _) = build_service();
    repository.seed(new_application("app-2"));

    for step in StepId::ordered() {
        service
            .decide(&id("app-2"), step, Decision::approve(), &registrar(), None)
            .expect("approve");
    }

    let snapshot = service.snapshot(&id("app-2")).expect("snapshot");
    assert_eq!(snapshot.current_status, ApplicationStatus::Approved);
    assert_eq!(snapshot.overall_status(), OverallStatus::Approved);
    assert!(snapshot
        .steps
        .iter()
        .all(|step| step.status == StepStatus::Completed));
}

#[test]
fn stale_expectation_is_rejected_before_any_write() {
    let (service, repository, _) = build_service();
    repository.seed(new_application("app-3"));
    repository.touch("app-3", submitted_at() + Duration::hours(1));

    let err = service
        .decide(
            &id("app-3"),
            StepId::DocumentVerification,
            Decision::approve(),
            &registrar(),
            Some(submitted_at()),
        )
        .expect_err("stale");
    assert!(matches!(err, ReviewServiceError::Stale(_)));
    assert_eq!(
        repository.get("app-3").status,
        Some(ApplicationStatus::Pending)
    );
}

#[test]
fn concurrent_write_surfaces_as_stale() {
    let repository = Arc::new(RacingRepository {
        inner: MemoryRepository::default(),
    });
    repository.inner.seed(new_application("app-4"));
    let service = ReviewService::new(repository.clone(), Arc::new(MemoryDocuments::default()))
        .with_clock(Arc::new(decided_at));

    let err = service
        .decide(
            &id("app-4"),
            StepId::DocumentVerification,
            Decision::reject("blurry passport scan"),
            &registrar(),
            None,
        )
        .expect_err("lost race");
    assert!(matches!(err, ReviewServiceError::Stale(_)));
    assert_eq!(repository.inner.get("app-4").review_note, None);
}

#[test]
fn same_instant_writes_still_invalidate_older_snapshots() {
    let (service, repository, _) = build_service();
    let mut record = at_step("app-10", ApplicationStatus::InProgress, StepId::EligibilityCheck);
    record.last_updated = decided_at();
    repository.seed(record);

    let seen = service.snapshot(&id("app-10")).expect("snapshot").updated_at;
    let first = service
        .decide(
            &id("app-10"),
            StepId::EligibilityCheck,
            Decision::mark_incomplete("need transcript"),
            &registrar(),
            Some(seen),
        )
        .expect("first reviewer wins");
    assert!(first.record.last_updated > seen);

    let err = service
        .decide(
            &id("app-10"),
            StepId::EligibilityCheck,
            Decision::reject("ineligible"),
            &registrar(),
            Some(seen),
        )
        .expect_err("second reviewer holds an old snapshot");
    assert!(matches!(err, ReviewServiceError::Stale(_)));

    let stored = repository.get("app-10");
    assert_eq!(stored.status, Some(ApplicationStatus::Incomplete));
    assert_eq!(stored.review_note.as_deref(), Some("need transcript"));
}

#[test]
fn transition_time_never_moves_backwards() {
    let (service, repository, _) = build_service();
    let mut record = new_application("app-11");
    record.last_updated = decided_at() + Duration::hours(1);
    repository.seed(record);

    let transition = service
        .decide(
            &id("app-11"),
            StepId::DocumentVerification,
            Decision::approve(),
            &registrar(),
            None,
        )
        .expect("approve");
    assert_eq!(
        transition.record.last_updated,
        decided_at() + Duration::hours(1) + Duration::nanoseconds(1)
    );
}

#[test]
fn missing_application_is_not_found() {
    let (service, _, _) = build_service();
    let err = service.snapshot(&id("ghost")).expect_err("missing");
    assert!(matches!(err, ReviewServiceError::NotFound(_)));
    assert_eq!(err.to_string(), "application ghost not found");
}

#[test]
fn malformed_rows_fail_loudly_on_direct_load() {
    let (service, repository, _) = build_service();
    repository.seed(application("app-5", None, "Final Review"));

    let err = service.snapshot(&id("app-5")).expect_err("malformed");
    assert!(matches!(
        err,
        ReviewServiceError::Workflow(WorkflowError::MalformedApplication { .. })
    ));
}

#[test]
fn start_step_is_not_persisted() {
    let (service, repository, _) = build_service();
    repository.seed(new_application("app-6"));

    let started = service
        .start_step(&id("app-6"), StepId::DocumentVerification, &registrar())
        .expect("start");
    assert_eq!(started.steps[0].status, StepStatus::InProgress);
    assert_eq!(started.steps[0].started_by, Some(registrar()));
    assert_eq!(repository.get("app-6"), new_application("app-6"));
}

#[test]
fn reject_then_reopen_resumes_the_same_step() {
    let (service, repository, _) = build_service();
    repository.seed(at_step(
        "app-7",
        ApplicationStatus::InProgress,
        StepId::EligibilityCheck,
    ));

    let rejected = service
        .decide(
            &id("app-7"),
            StepId::EligibilityCheck,
            Decision::reject("missing transcript"),
            &registrar(),
            None,
        )
        .expect("reject");
    assert_eq!(
        rejected.record.review_note.as_deref(),
        Some("missing transcript")
    );

    let view = service.status_view(&id("app-7")).expect("status");
    assert_eq!(view.status, "rejected");
    assert_eq!(view.status_code, 4);
    assert_eq!(view.review_note.as_deref(), Some("missing transcript"));

    let reopened = service
        .reopen(&id("app-7"), &registrar(), Some(decided_at()))
        .expect("reopen");
    assert_eq!(reopened.record.status, Some(ApplicationStatus::InProgress));
    assert_eq!(reopened.record.current_step, "Eligibility Check");
    assert_eq!(reopened.record.review_note, None);

    service
        .decide(
            &id("app-7"),
            StepId::EligibilityCheck,
            Decision::approve(),
            &registrar(),
            None,
        )
        .expect("approve after reopen");
    assert_eq!(repository.get("app-7").current_step, "Final Review");
}

#[test]
fn status_view_hides_notes_once_progressing() {
    let (service, repository, _) = build_service();
    let mut record = at_step("app-8", ApplicationStatus::InProgress, StepId::FinalReview);
    record.review_note = Some("internal remark".to_string());
    repository.seed(record);

    let view = service.status_view(&id("app-8")).expect("status");
    assert_eq!(view.status, "in-progress");
    assert_eq!(view.current_step, "Final Review");
    assert!((view.progress - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(view.review_note, None);
}

#[test]
fn snapshot_includes_uploaded_documents() {
    let (service, repository, documents) = build_service();
    repository.seed(new_application("app-9"));
    documents.seed("app-9", uploaded_documents());

    let snapshot = service.snapshot(&id("app-9")).expect("snapshot");
    let urls: Vec<&str> = snapshot.steps[0]
        .attachments
        .iter()
        .map(|link| link.url.as_str())
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://storage.example/app/id.pdf",
            "https://storage.example/app/transcript.pdf"
        ]
    );
}

#[test]
fn queue_orders_by_submission_and_skips_settled_and_malformed() {
    let (service, repository, _) = build_service();
    let mut newest = new_application("app-new");
    newest.submitted_at = submitted_at() + Duration::days(2);
    repository.seed(newest);
    repository.seed(at_step(
        "app-old",
        ApplicationStatus::InProgress,
        StepId::EligibilityCheck,
    ));
    let mut middle = application("app-bad", Some(ApplicationStatus::Pending), "Interview");
    middle.submitted_at = submitted_at() + Duration::days(1);
    repository.seed(middle);
    repository.seed(at_step(
        "app-done",
        ApplicationStatus::Approved,
        StepId::FinalReview,
    ));

    let queue = service.queue(None).expect("queue");
    let ids: Vec<&str> = queue
        .iter()
        .map(|entry| entry.application_id.0.as_str())
        .collect();
    assert_eq!(ids, vec!["app-old", "app-new"]);
    assert_eq!(queue[0].current_step, StepId::EligibilityCheck);

    let limited = service.queue(Some(1)).expect("queue");
    assert_eq!(limited.len(), 1);
}

#[test]
fn queue_limit_defaults_from_config() {
    let (service, repository, _) = build_service();
    let service = service.with_config(ReviewConfig { queue_limit: 2 });
    for (offset, name) in ["q-1", "q-2", "q-3"].iter().enumerate() {
        let mut record = new_application(name);
        record.submitted_at = submitted_at() + Duration::hours(offset as i64);
        repository.seed(record);
    }

    let queue = service.queue(None).expect("queue");
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].application_id, id("q-1"));
}
