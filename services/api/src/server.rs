use crate::cli::ServeArgs;
use crate::infra::{
    seed_sample_applications, AppState, InMemoryApplicationRepository, InMemoryDocumentStore,
};
use crate::routes::with_review_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use registrar::config::AppConfig;
use registrar::error::AppError;
use registrar::telemetry;
use registrar::workflows::review::ReviewService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let documents = Arc::new(InMemoryDocumentStore::default());
    if args.seed {
        let seeded = seed_sample_applications(&repository, &documents, Utc::now());
        info!(count = seeded.len(), "seeded sample applications");
    }
    let review_service =
        Arc::new(ReviewService::new(repository, documents).with_config(config.review));

    let app = with_review_routes(review_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        queue_limit = config.review.queue_limit,
        "registrar review service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
