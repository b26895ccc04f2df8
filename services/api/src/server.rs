use crate::cli::ServeArgs;
use crate::infra::{load_reference, load_weights, AppState, DeclarationState};
use crate::routes::router;
use asycuda_export::config::AppConfig;
use asycuda_export::error::AppError;
use asycuda_export::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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

    let reference = load_reference(config.files.reference_path.as_deref())?;
    info!(
        entries = reference.len(),
        path = ?config.files.reference_path,
        "reference data loaded"
    );
    let weights = load_weights(config.files.weights_path.as_deref())?;
    let declaration_state =
        DeclarationState::new(reference, config.resolution.clone()).with_weights(weights);

    let app = router()
        .layer(Extension(declaration_state))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "declaration service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
