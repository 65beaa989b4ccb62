use std::any::Any;

use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::Router;
use tokio::sync::watch;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

mod config;
mod handlers;
mod health;
pub mod s3;

pub use config::Config;

use crate::ServiceState;

const STATUS_PREFIX: &str = "/_status";
/// Older liveness path, kept for existing probes. Shadows a bucket named `health`.
const HEALTH_PATH: &str = "/health";

fn s3_route(route: MethodRouter<ServiceState>) -> MethodRouter<ServiceState> {
    route.fallback(s3::method_not_allowed)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = message, "request handler panicked");
    s3::S3Error::InternalError.into_response()
}

/// Build the full router: S3 routes, health probes and the fallback.
pub fn router(config: &Config, state: ServiceState) -> Router {
    let router = Router::new()
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .route(HEALTH_PATH, get(health::liveness_handler))
        .route("/", s3_route(get(s3::list_buckets::handler)))
        .route("/:bucket", s3_route(get(s3::list_objects::handler)))
        .route("/:bucket/", s3_route(get(s3::list_objects::handler)))
        .route("/:bucket/*key", s3_route(get(s3::get_object::handler)))
        .fallback(handlers::not_found_handler)
        .with_state(state);

    let router = if config.recover {
        router.layer(CatchPanicLayer::custom(panic_response))
    } else {
        router
    };

    if config.request_logging {
        let trace_layer = TraceLayer::new_for_http()
            .on_response(
                DefaultOnResponse::new()
                    .include_headers(false)
                    .level(config.log_level)
                    .latency_unit(LatencyUnit::Micros),
            )
            .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));
        router.layer(trace_layer)
    } else {
        router
    }
}

/// Run the S3 HTTP server until `shutdown_rx` fires.
pub async fn run(
    config: Config,
    state: ServiceState,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let listen_addr = config.listen_addr;
    let router = router(&config, state);

    tracing::info!(addr = ?listen_addr, "S3 server listening");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}
