//! HTTP surface — Axum REST server for the collection tracker.
//!
//! Thin layer over `ListStore`; all valuation logic lives below it.
//! CORS enabled for local development.

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use routes::AppState;

pub use routes::ServerState;

/// Start the API server.
///
/// This spawns a background task — it doesn't block.
pub fn spawn_server(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "API server starting on http://localhost:{port}");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind API port");

        axum::serve(listener, app).await.expect("API server error");
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/lists", post(routes::create_list))
        .route(
            "/api/lists/:id",
            get(routes::get_list).delete(routes::delete_list),
        )
        .route(
            "/api/lists/:id/cards",
            post(routes::add_card).delete(routes::remove_card),
        )
        .route("/api/lists/:id/cards/quantity", post(routes::update_quantity))
        .route("/api/lists/:id/cards/collected", post(routes::set_collected))
        .route("/api/revalue", post(routes::revalue))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}
