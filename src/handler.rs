//! HTTP request handlers for the game portal API
//!
//! This module implements the request-path logic for:
//! - Reading and mutating per-game engagement state (up/down/collect)
//! - The legacy single-boolean like endpoint
//! - Serving game assets locally or via the remote origin
//!
//! Errors never propagate past a handler: invalid input becomes a 400 and
//! any store failure becomes a 503 with a generic message, so the process
//! survives a broken or unconfigured database.

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::{json, Value};

use crate::database::AppState;
use crate::identity::{resolve_visitor, set_cookie_value, VisitorIdentity};
use crate::media::content_type_for;
use crate::model::{is_valid_slug, ActionRequest, EngagementAction, LikeAction};
use crate::resolver::Resolution;
use crate::store::StoreError;

/// Error message returned when the engagement store is unavailable
const ENGAGEMENT_UNAVAILABLE: &str = "Engagement database is not configured";

/// Error message returned when the likes store is unavailable
const LIKES_UNAVAILABLE: &str = "Likes database is not configured";

/// Reads the engagement state for a game
///
/// # Path Parameters
///
/// - `slug` - The game slug
///
/// # Response
///
/// - **200 OK** - `{ok: true, counts: {...}, active: {...}}`
/// - **400 Bad Request** - Slug does not match `[a-z0-9-]{1,64}` (case-insensitive)
/// - **503 Service Unavailable** - Store unreachable; feature degrades, request survives
///
/// Always `Cache-Control: no-store`; sets the identity cookie when the
/// visitor id was freshly minted.
pub async fn get_engagement(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !is_valid_slug(&slug) {
        return invalid_input("Invalid slug");
    }

    let visitor = resolve_visitor(&headers);
    match state.store.get_state(&slug, &visitor.id.to_string()) {
        Ok(engagement) => ok_response(
            json!({ "ok": true, "counts": engagement.counts, "active": engagement.active }),
            &visitor,
        ),
        Err(err) => store_unavailable(ENGAGEMENT_UNAVAILABLE, err),
    }
}

/// Applies one engagement toggle for the requesting visitor
///
/// # Request Body
///
/// ```json
/// { "action": "toggle_up" }
/// ```
///
/// Accepted actions: `toggle_up`, `toggle_down`, `toggle_collect`.
///
/// # Response
///
/// - **200 OK** - Post-mutation state, same shape as GET (fresh read)
/// - **400 Bad Request** - Invalid slug, or action missing/unrecognized
/// - **503 Service Unavailable** - Store unreachable
pub async fn post_engagement(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_valid_slug(&slug) {
        return invalid_input("Invalid slug");
    }

    let visitor = resolve_visitor(&headers);

    // An unreadable body is treated the same as a missing action
    let request = serde_json::from_slice::<ActionRequest>(&body).unwrap_or_default();
    let action = match request.action.as_deref().and_then(EngagementAction::parse) {
        Some(action) => action,
        None => return invalid_input("Invalid action"),
    };

    match state
        .store
        .apply_action(&slug, &visitor.id.to_string(), action)
    {
        Ok(engagement) => ok_response(
            json!({ "ok": true, "counts": engagement.counts, "active": engagement.active }),
            &visitor,
        ),
        Err(err) => store_unavailable(ENGAGEMENT_UNAVAILABLE, err),
    }
}

/// Reads the legacy like state for a game
///
/// # Response
///
/// - **200 OK** - `{ok: true, count, liked}`
/// - **400 Bad Request** - Invalid slug
/// - **503 Service Unavailable** - Store unreachable
pub async fn get_like(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !is_valid_slug(&slug) {
        return invalid_input("Invalid slug");
    }

    let visitor = resolve_visitor(&headers);
    match state.store.like_state(&slug, &visitor.id.to_string()) {
        Ok(like) => ok_response(
            json!({ "ok": true, "count": like.count, "liked": like.liked }),
            &visitor,
        ),
        Err(err) => store_unavailable(LIKES_UNAVAILABLE, err),
    }
}

/// Applies one legacy like action for the requesting visitor
///
/// # Request Body
///
/// ```json
/// { "action": "toggle" }
/// ```
///
/// Accepted actions: `like`, `unlike`, `toggle`. A missing body or missing
/// action defaults to `toggle`; an unrecognized action is a 400.
pub async fn post_like(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_valid_slug(&slug) {
        return invalid_input("Invalid slug");
    }

    let visitor = resolve_visitor(&headers);

    let request = serde_json::from_slice::<ActionRequest>(&body).unwrap_or_default();
    let action = match request.action.as_deref() {
        None => LikeAction::Toggle,
        Some(name) => match LikeAction::parse(name) {
            Some(action) => action,
            None => return invalid_input("Invalid action"),
        },
    };

    match state
        .store
        .apply_like(&slug, &visitor.id.to_string(), action)
    {
        Ok(like) => ok_response(
            json!({ "ok": true, "count": like.count, "liked": like.liked }),
            &visitor,
        ),
        Err(err) => store_unavailable(LIKES_UNAVAILABLE, err),
    }
}

/// Serves an asset under the games namespace
///
/// Resolution is delegated to the configured [`crate::resolver::AssetResolver`]:
/// local files are served as-is with a content type from the media table,
/// remote rewrites become temporary redirects (the CDN keeps serving while
/// routing stays revisable), and everything else is a 404.
pub async fn serve_game_asset(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    serve_asset(&state, format!("/games/{}", rest), query).await
}

/// Serves an asset under the dedicated sprunki remote prefix
pub async fn serve_sprunki_asset(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    serve_asset(&state, format!("/r2/sprunki/{}", rest), query).await
}

async fn serve_asset(state: &AppState, path: String, query: Option<String>) -> Response {
    match state.assets.resolve(&path, query.as_deref()) {
        Resolution::Local(file) => match tokio::fs::read(&file).await {
            Ok(bytes) => (
                [(header::CONTENT_TYPE, content_type_for(&path))],
                bytes,
            )
                .into_response(),
            // The file vanished between the existence check and the read
            Err(_) => (StatusCode::NOT_FOUND, "Asset not found").into_response(),
        },
        Resolution::Remote(url) => Redirect::temporary(url.as_str()).into_response(),
        Resolution::NotFound => (StatusCode::NOT_FOUND, "Asset not found").into_response(),
    }
}

/// Builds a 200 engagement/like response: no-store, cookie applied if fresh
fn ok_response(body: Value, visitor: &VisitorIdentity) -> Response {
    let mut response = (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store")],
        Json(body),
    )
        .into_response();
    apply_visitor_cookie(&mut response, visitor);
    response
}

/// Builds the 400 response for malformed slugs and actions
fn invalid_input(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Builds the degraded-mode 503 response for store failures
fn store_unavailable(message: &str, err: StoreError) -> Response {
    tracing::error!(error = %err, "engagement store unavailable");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::CACHE_CONTROL, "no-store")],
        Json(json!({ "ok": false, "error": message })),
    )
        .into_response()
}

fn apply_visitor_cookie(response: &mut Response, visitor: &VisitorIdentity) {
    if !visitor.fresh {
        return;
    }
    // The cookie value is plain ASCII by construction
    let value = HeaderValue::from_str(&set_cookie_value(&visitor.id)).unwrap();
    response.headers_mut().append(header::SET_COOKIE, value);
}
