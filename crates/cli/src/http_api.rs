use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{ALLOW, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Router,
};
use serde::Serialize;
use shadowcaster_indexer::{
    IndexCoordinator, IndexerError, MediaIndexType, RunLimitSnapshot, RunRecord,
};
use shadowcaster_protocol::{
    clean_request_path, is_root, serialize_json, JsonResponse, SetDirectoryRequest,
    JSON_CONTENT_TYPE,
};
use std::path::Path;
use tower_http::services::ServeDir;

#[derive(Clone)]
struct AppState {
    coordinator: IndexCoordinator,
}

/// Routes for the media API, with everything else served from `docroot`.
pub(crate) fn router(coordinator: IndexCoordinator, docroot: &Path) -> Router {
    let state = AppState { coordinator };
    Router::new()
        .route(
            "/movies/setdir",
            post(set_movie_dir).fallback(post_only),
        )
        .route("/movies/status", get(movie_status))
        .route("/movies/", any(not_implemented))
        .route("/movies/:section", any(not_implemented))
        .route("/tv/", any(not_implemented))
        .route("/tv/:section", any(not_implemented))
        .route("/music/", any(not_implemented))
        .route("/music/:section", any(not_implemented))
        .route("/pictures/", any(not_implemented))
        .route("/pictures/:section", any(not_implemented))
        .route("/settings/", any(not_implemented))
        .route("/settings/:section", any(not_implemented))
        .fallback_service(ServeDir::new(docroot))
        .with_state(state)
}

async fn set_movie_dir(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_json(&headers) {
        return json_error(
            StatusCode::BAD_REQUEST,
            "Content-Type must be application/json",
        );
    }

    let request: SetDirectoryRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => return json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };
    let movie_dir = clean_request_path(&request.path);
    if is_root(&movie_dir) {
        return json_error(StatusCode::BAD_REQUEST, "Bad path");
    }

    log::info!("Setting movies directory to {movie_dir:?}");
    match state
        .coordinator
        .index_directory(&movie_dir, MediaIndexType::Movie)
        .await
    {
        // The run continues in the background; its outcome lands on the status board.
        Ok(_task) => json_response(
            StatusCode::OK,
            &JsonResponse::ok(format!("Movie directory set to {movie_dir:?}")),
        ),
        Err(err) => {
            log::warn!("Movie indexing not started ({}): {err}", err.code());
            json_error(trigger_status(&err), err.to_string())
        }
    }
}

#[derive(Serialize)]
struct MovieStatus {
    runs: Vec<RunRecord>,
    limits: RunLimitSnapshot,
}

async fn movie_status(State(state): State<AppState>) -> Response {
    let status = MovieStatus {
        runs: state
            .coordinator
            .status()
            .snapshot(Some(MediaIndexType::Movie)),
        limits: state.coordinator.run_limits(),
    };
    let message = format!("{} movie index run(s)", status.runs.len());
    let data = match serde_json::to_value(&status) {
        Ok(data) => data,
        Err(err) => return json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };
    json_response(StatusCode::OK, &JsonResponse::ok(message).with_data(data))
}

async fn post_only() -> Response {
    let mut response = json_error(
        StatusCode::METHOD_NOT_ALLOWED,
        "Must be called with the POST method",
    );
    response
        .headers_mut()
        .insert(ALLOW, axum::http::HeaderValue::from_static("POST"));
    response
}

async fn not_implemented() -> Response {
    json_error(StatusCode::NOT_IMPLEMENTED, "Not implemented")
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
}

fn trigger_status(err: &IndexerError) -> StatusCode {
    match err {
        IndexerError::IndexBusy(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    json_response(status, &JsonResponse::error(status.as_u16(), message))
}

fn json_response(status: StatusCode, body: &JsonResponse) -> Response {
    match serialize_json(body) {
        Ok(json) => (status, [(CONTENT_TYPE, JSON_CONTENT_TYPE)], json).into_response(),
        Err(err) => {
            log::error!("Failed to encode response: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
