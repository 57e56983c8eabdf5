use crate::infra::{
    seed_sample_applications, InMemoryApplicationRepository, InMemoryDocumentStore,
};
use chrono::Utc;
use clap::Args;
use registrar::error::AppError;
use registrar::workflows::review::{
    ActorId, ApplicationId, Decision, ReviewService, ReviewServiceError, StepId, WorkflowSnapshot,
    WorkflowView,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Staff identifier recorded on every decision
    #[arg(long, default_value = "registrar-demo")]
    pub(crate) actor: String,
    /// Reason recorded when the demo rejects the second application
    #[arg(long, default_value = "Academic transcript is not certified")]
    pub(crate) rejection_note: String,
    /// Print the final workflow of each application as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

type DemoService = ReviewService<InMemoryApplicationRepository, InMemoryDocumentStore>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        actor,
        rejection_note,
        json,
    } = args;
    let actor = ActorId(actor);

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let documents = Arc::new(InMemoryDocumentStore::default());
    let seeded = seed_sample_applications(&repository, &documents, Utc::now());
    let service = ReviewService::new(repository, documents);

    println!("Application review demo");
    println!("Queue at start:");
    for entry in service.queue(None)? {
        println!(
            "  - {} | {} | {} | {:.0}%",
            entry.application_id,
            entry.status.label(),
            entry.current_step.label(),
            entry.progress
        );
    }

    let Some(first) = seeded.first() else {
        return Ok(());
    };
    println!("\nApproving every step of {first}");
    let snapshot = service.snapshot(first)?;
    render_snapshot(&snapshot);
    let started = service.start_step(first, snapshot.current().id, &actor)?;
    println!(
        "  started {} (local only, nothing persisted)",
        started.current().id
    );
    for step in StepId::ordered() {
        let transition = service.decide(first, step, Decision::approve(), &actor, None)?;
        println!(
            "  approved {:<22} -> status {:<11} progress {:.1}%",
            step.label(),
            transition.snapshot.current_status.label(),
            transition.snapshot.progress()
        );
    }
    let approved = service.snapshot(first)?;
    render_snapshot(&approved);

    if let Some(second) = seeded.get(1) {
        reject_and_reopen(&service, second, &actor, &rejection_note)?;
    }

    if json {
        for id in &seeded {
            let view = WorkflowView::from(service.snapshot(id)?);
            match serde_json::to_string_pretty(&view) {
                Ok(body) => println!("\n{body}"),
                Err(err) => println!("\nWorkflow payload unavailable: {err}"),
            }
        }
    }

    Ok(())
}

fn reject_and_reopen(
    service: &DemoService,
    id: &ApplicationId,
    actor: &ActorId,
    note: &str,
) -> Result<(), AppError> {
    let snapshot = service.snapshot(id)?;
    let step = snapshot.current().id;
    println!("\nRejecting {id} at {}", step.label());

    match service.decide(id, step, Decision::reject(""), actor, None) {
        Err(ReviewServiceError::Workflow(err)) => println!("  blank rejection refused: {err}"),
        Err(err) => return Err(err.into()),
        Ok(_) => println!("  blank rejection unexpectedly accepted"),
    }

    let rejected = service.decide(id, step, Decision::reject(note), actor, None)?;
    render_snapshot(&rejected.snapshot);

    let status = service.status_view(id)?;
    println!(
        "  student sees: {} ({}) note: {}",
        status.status,
        status.status_code,
        status.review_note.as_deref().unwrap_or("-")
    );

    let reopened = service.reopen(id, actor, Some(rejected.record.last_updated))?;
    println!(
        "  reopened -> status {} at {}",
        reopened.snapshot.current_status.label(),
        reopened.snapshot.current().name
    );
    render_snapshot(&reopened.snapshot);
    Ok(())
}

fn render_snapshot(snapshot: &WorkflowSnapshot) {
    println!(
        "  {} | overall {} | progress {:.1}%",
        snapshot.application_id,
        snapshot.overall_status().label(),
        snapshot.progress()
    );
    for (index, step) in snapshot.steps.iter().enumerate() {
        let marker = if index == snapshot.current_index() { ">" } else { " " };
        print!("   {marker} {:<22} {}", step.name, step.status.label());
        if let Some(notes) = &step.notes {
            print!(" ({notes})");
        }
        if !step.attachments.is_empty() {
            print!(" [{} documents]", step.attachments.len());
        }
        println!();
    }
}
