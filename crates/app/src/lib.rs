#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::routes::{
    complete_lesson_handler, dashboard_handler, lesson_progress_handler, start_lesson_handler,
    topic_breakdown_handler,
};
pub use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route(
            "/progress/lessons/{lesson_id}/start",
            post(start_lesson_handler),
        )
        .route(
            "/progress/lessons/{lesson_id}/complete",
            post(complete_lesson_handler),
        )
        .route("/progress/lessons/{lesson_id}", get(lesson_progress_handler))
        .route("/progress/dashboard", get(dashboard_handler))
        .route(
            "/progress/subjects/{subject_id}/topics",
            get(topic_breakdown_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an I/O error if the listener cannot be bound or the server fails.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
