//! Integration tests for game-asset routing
//!
//! These tests drive the full router: local files are served directly,
//! everything else is rewritten to the remote origin as a temporary
//! redirect with the query string preserved.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tempfile::{NamedTempFile, TempDir};
use tower::ServiceExt;

use gameportal::database::{init_db, AppState};
use gameportal::resolver::{parse_origin, AssetResolver, RoutingMode, DEFAULT_REMOTE_ORIGIN};
use gameportal::route::create_app;

/// Helper to create a test application over a given routing mode
///
/// Returns the asset root so tests can drop local files into it.
fn setup_test_app(mode: RoutingMode) -> (axum::Router, NamedTempFile, TempDir) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let asset_root = TempDir::new().expect("Failed to create temp dir");
    let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize test database");
    let assets = AssetResolver::new(
        mode,
        parse_origin(DEFAULT_REMOTE_ORIGIN),
        asset_root.path().to_path_buf(),
    );
    (create_app(AppState::new(db, assets)), temp_db, asset_root)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_local_file_is_served_directly() {
    let (app, _temp_db, asset_root) = setup_test_app(RoutingMode::LocalFirst);

    let dir = asset_root.path().join("games/fishjoy/src");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("fishjoy.js"), "var fish = true;").unwrap();

    let response = app
        .oneshot(get("/games/fishjoy/src/fishjoy.js"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/javascript; charset=utf-8"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"var fish = true;");
}

#[tokio::test]
async fn test_missing_file_redirects_to_remote_with_query() {
    let (app, _temp_db, _asset_root) = setup_test_app(RoutingMode::LocalFirst);

    let response = app
        .oneshot(get("/games/fishjoy/src/absent.js?v=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "https://r2bucket.billybobgames.org/games/fishjoy/src/absent.js?v=2"
    );
}

#[tokio::test]
async fn test_sprunki_prefix_is_remote_even_with_a_local_copy() {
    let (app, _temp_db, asset_root) = setup_test_app(RoutingMode::LocalFirst);

    let dir = asset_root.path().join("games/incredibox-sprunki");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "<html></html>").unwrap();

    let response = app
        .oneshot(get("/games/incredibox-sprunki/index.html"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "https://r2bucket.billybobgames.org/sprunki/index.html"
    );
}

#[tokio::test]
async fn test_r2_sprunki_route_maps_to_the_sub_prefix() {
    let (app, _temp_db, _asset_root) = setup_test_app(RoutingMode::LocalFirst);

    let response = app.oneshot(get("/r2/sprunki/abc123.png")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "https://r2bucket.billybobgames.org/sprunki/abc123.png"
    );
}

#[tokio::test]
async fn test_always_remote_mode_ignores_local_files() {
    let (app, _temp_db, asset_root) = setup_test_app(RoutingMode::AlwaysRemote);

    let dir = asset_root.path().join("games/pac-man");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("game.js"), "var pac = 1;").unwrap();

    let response = app.oneshot(get("/games/pac-man/game.js")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "https://r2bucket.billybobgames.org/games/pac-man/game.js"
    );
}

#[tokio::test]
async fn test_without_an_origin_missing_files_are_404() {
    let temp_db = NamedTempFile::new().unwrap();
    let asset_root = TempDir::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();

    // Fail-closed resolver: no usable remote origin
    let assets = AssetResolver::new(
        RoutingMode::LocalFirst,
        None,
        asset_root.path().to_path_buf(),
    );
    let app = create_app(AppState::new(db, assets));

    let dir = asset_root.path().join("games/pac-man");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("game.js"), "var pac = 1;").unwrap();

    // Local files still work
    let response = app
        .clone()
        .oneshot(get("/games/pac-man/game.js"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Missing files become 404, never a broken redirect
    let response = app.oneshot(get("/games/pac-man/missing.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_traversal_paths_are_rejected() {
    let (app, _temp_db, _asset_root) = setup_test_app(RoutingMode::LocalFirst);

    let response = app
        .oneshot(get("/games/pac-man/%2e%2e/%2e%2e/etc/passwd"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
