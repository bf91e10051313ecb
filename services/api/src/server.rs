use crate::cli::ServeArgs;
use crate::infra::{AppState, DocumentStoreRepository};
use crate::routes::{with_onboarding_routes, with_request_limits};
use applicant_intake::config::AppConfig;
use applicant_intake::error::AppError;
use applicant_intake::telemetry;
use applicant_intake::workflows::onboarding::{
    with_admin_sessions, AdminPages, ApplicantIntakeService, DiskUploadStore, OnboardingState,
    StaticCredentials,
};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
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

    let snapshot_path = config.storage.snapshot_path.clone();
    let repository = DocumentStoreRepository::open(snapshot_path.clone()).map_err(|source| {
        AppError::Storage {
            path: snapshot_path.unwrap_or_default(),
            source,
        }
    })?;
    let repository = Arc::new(repository);
    let uploads = DiskUploadStore::new(config.uploads.root.clone());
    let intake_service = Arc::new(ApplicantIntakeService::new(repository, uploads));
    let state = OnboardingState::new(
        intake_service,
        Arc::new(StaticCredentials::from_config(&config.admin)),
        AdminPages::from_public_dir(&config.server.public_dir),
    );

    let app = with_onboarding_routes(state, &config.server.public_dir);
    let app = with_request_limits(
        with_admin_sessions(app, &config.session),
        config.uploads.max_body_bytes,
        config.server.request_timeout,
    )
    .layer(TraceLayer::new_for_http())
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::Bind { addr, source })?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        uploads = %config.uploads.root.display(),
        persistent = config.storage.snapshot_path.is_some(),
        "applicant intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
