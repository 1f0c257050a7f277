use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::links::{ClickRecorder, LinkResolver};
use crate::storage::Storage;

use super::handlers::{health_check, redirect_to_original, RedirectState};

pub fn create_redirect_router(storage: Arc<dyn Storage>) -> Router {
    let state = Arc::new(RedirectState {
        resolver: LinkResolver::new(Arc::clone(&storage)),
        recorder: ClickRecorder::new(storage),
    });

    Router::new()
        .route("/", get(health_check))
        .route("/{code}", get(redirect_to_original))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
