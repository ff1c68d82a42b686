pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, patch, post};
use axum::Router;
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware over an existing
/// application state. Used by `serve_on()` and by integration tests.
pub fn router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Flows
        .route("/api/flows", get(routes::flows::list_flows))
        .route("/api/flows", post(routes::flows::create_flow))
        .route("/api/flows/{id}", get(routes::flows::get_flow))
        .route("/api/flows/{id}/history", get(routes::flows::get_history))
        .route(
            "/api/flows/{id}/transition",
            post(routes::flows::transition_flow),
        )
        .route("/api/flows/{id}/endorse", post(routes::flows::endorse_flow))
        .route("/api/flows/{id}/abandon", post(routes::flows::abandon_flow))
        // Adoption matrix
        .route("/api/adoption", get(routes::adoption::evaluate_zone))
        .route("/api/adoption/matrix", get(routes::adoption::get_matrix))
        // Participants
        .route(
            "/api/participants",
            get(routes::participants::list_participants),
        )
        .route(
            "/api/participants",
            post(routes::participants::register_participant),
        )
        .route(
            "/api/participants/{id}",
            patch(routes::participants::update_participant),
        )
        // Roles
        .route("/api/roles", get(routes::roles::list_roles))
        .route(
            "/api/roles/{role}/participation/{stage}",
            get(routes::roles::get_participation),
        )
        // Config
        .route("/api/config", get(routes::config::get_config))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Open the project at `root` and build its router.
pub fn build_router(root: &Path) -> anyhow::Result<Router> {
    let app_state = state::AppState::open(root)?;
    Ok(router(app_state))
}

/// Serve the JSON API on `0.0.0.0:{port}`.
pub async fn serve(root: &Path, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    serve_on(root, listener).await
}

/// Serve the JSON API on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(root: &Path, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let app = build_router(root)?;
    let actual_port = listener.local_addr()?.port();

    tracing::info!("QUAD API listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
