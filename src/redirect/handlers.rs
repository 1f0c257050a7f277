use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::links::{ClickMetadata, ClickRecorder, LinkResolver};

pub struct RedirectState {
    pub resolver: LinkResolver,
    pub recorder: ClickRecorder,
}

/// Redirect a short code to its original URL, capturing a click event for
/// tracked links on the way out.
///
/// Absent, soft-deleted and expired codes are all the same 404 so the
/// response leaks nothing about whether a code ever existed. Click
/// recording is best-effort: its outcome never changes the response.
pub async fn redirect_to_original(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let link = match state.resolver.lookup(&code).await {
        Ok(Some(link)) => link,
        Ok(None) => return not_found(),
        Err(err) => {
            tracing::error!(short_code = %code, error = %err, "link lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };

    if link.is_expired(chrono::Utc::now().timestamp()) {
        return not_found();
    }

    let metadata = ClickMetadata::new(
        Some(addr.ip().to_string()),
        header_value(&headers, header::USER_AGENT.as_str()),
        header_value(&headers, header::REFERER.as_str()),
    );
    state.recorder.record_if_eligible(&link, metadata).await;

    // Temporary so clients keep coming back through us instead of caching
    // the target, which would starve click capture.
    Redirect::temporary(&link.original_url).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Short link not found").into_response()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}
