//! Route definitions for the game portal
//!
//! This module configures all HTTP routes and maps them to their respective
//! handlers. It creates the Axum router with the application state.

use axum::routing::get;
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    get_engagement, get_like, post_engagement, post_like, serve_game_asset, serve_sprunki_asset,
};

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET|POST /api/games/{slug}/engagement` - Tri-state reaction API
/// - `GET|POST /api/games/{slug}/like` - Legacy single-boolean like API
/// - `GET /games/{*path}` - Game assets (local-first, remote fallback)
/// - `GET /r2/sprunki/{*path}` - Dedicated sprunki remote prefix
///
/// # Arguments
///
/// * `state` - Application state containing the store client and resolver
///
/// # Returns
///
/// Configured Axum Router ready to handle requests
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/games/{slug}/engagement",
            get(get_engagement).post(post_engagement),
        )
        .route("/games/{slug}/like", get(get_like).post(post_like));

    Router::new()
        // Asset namespace: local file wins, otherwise rewritten to the CDN
        .route("/games/{*path}", get(serve_game_asset))
        .route("/r2/sprunki/{*path}", get(serve_sprunki_asset))
        // Mount API routes under /api
        .nest("/api", api_routes)
        // Inject the application state into all handlers
        .with_state(state)
}
