use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAccountDirectory, InMemoryAppraisalRepository};
use crate::routes::{cors_layer, with_appraisal_routes};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use faculty_appraisal::config::AppConfig;
use faculty_appraisal::error::AppError;
use faculty_appraisal::telemetry;
use faculty_appraisal::workflows::appraisal::AppraisalService;
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

    let policy = config.appraisal.policy();
    let appraisal_service = Arc::new(AppraisalService::new(
        Arc::new(InMemoryAppraisalRepository::default()),
        Arc::new(InMemoryAccountDirectory::default()),
        policy,
    ));

    let app = with_appraisal_routes(appraisal_service)
        .layer(Extension(app_state))
        .layer(cors_layer(&config.server.cors_origins))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        cors_origins = ?config.server.cors_origins,
        minimum_completion = policy.submission.minimum_completion,
        score_parsing = ?policy.scoring.parsing,
        "faculty appraisal service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
