use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::blob::FsBlobStore;
use crate::command;
use crate::storage::SqliteStore;

pub mod routes;

pub type AnnotationRouter = command::Router<SqliteStore, FsBlobStore>;

/// Server state
///
/// The gateways are blocking and not shareable, so every command runs on a
/// blocking thread while holding this lock.
pub struct AppState {
    pub router: Mutex<AnnotationRouter>,
}

pub fn app(router: AnnotationRouter) -> Router {
    let state = Arc::new(AppState {
        router: Mutex::new(router),
    });

    Router::new()
        .route("/annotation", post(routes::post_command))
        .route("/annotation/{*command}", get(routes::get_command))
        .route("/stats", get(routes::get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(port: u16, router: AnnotationRouter) -> anyhow::Result<()> {
    let app = app(router);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
