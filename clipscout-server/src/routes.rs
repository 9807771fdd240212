use crate::AppState;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use clipscout_common::snippet;
use clipscout_search::{AggregatedResult, PublishTime, SearchError, SearchRequest};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub publish_time: Option<String>,
    pub sort_by: Option<String>,
}

/// Body of a successful `/api/search` response.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: AggregatedResult,
}

#[derive(Debug, Deserialize)]
pub struct AuthBody {
    #[serde(default)]
    pub password: String,
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let Some(query) = non_blank(params.query) else {
        return error_response(StatusCode::BAD_REQUEST, "Query parameter is required");
    };
    let publish_time = non_blank(params.publish_time)
        .map(PublishTime::from)
        .unwrap_or_else(|| state.defaults.publish_time.clone());
    let sort_by = non_blank(params.sort_by).unwrap_or_else(|| state.defaults.sort_by.clone());
    let request = SearchRequest::new(query)
        .with_publish_time(publish_time)
        .with_sort_by(sort_by);

    let started = Instant::now();
    match state.orchestrator.run(&request).await {
        Ok(result) => {
            tracing::info!(
                target: "server.search",
                query = %snippet(request.query.trim(), 160),
                returned = result.items.len(),
                pages_fetched = result.pages_fetched,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "search.request.ok"
            );
            Json(SearchResponse {
                success: true,
                result,
            })
            .into_response()
        }
        Err(SearchError::EmptyQuery) => {
            error_response(StatusCode::BAD_REQUEST, "Query parameter is required")
        }
        Err(SearchError::MissingCredential) => {
            tracing::error!(target: "server.search", "search.request.no_api_key");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "API key not configured")
        }
        Err(err) => {
            tracing::error!(target: "server.search", error = %err, "search.request.failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch TikTok data",
            )
        }
    }
}

pub async fn auth(State(state): State<AppState>, Json(body): Json<AuthBody>) -> Response {
    let Some(gate) = state.gate.as_deref() else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "No password configured");
    };
    if !gate.verify_password(&body.password) {
        tracing::warn!(target: "server.gate", "gate.login.rejected");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid password");
    }

    tracing::info!(target: "server.gate", "gate.login.ok");
    (
        StatusCode::OK,
        [(header::SET_COOKIE, gate.session_cookie())],
        Json(serde_json::json!({ "success": true })),
    )
        .into_response()
}
