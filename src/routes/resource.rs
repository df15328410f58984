//! Resource routes: collection and item endpoints for every registered
//! resource. Handlers resolve the resource from the path segment. Existing
//! clients send trailing-slash paths, so both forms are routed.

use crate::handlers::resource::{create, destroy, list, retrieve, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/:resource", get(list).post(create))
        .route("/:resource/", get(list).post(create))
        .route("/:resource/:id", get(retrieve).patch(update).delete(destroy))
        .route(
            "/:resource/:id/",
            get(retrieve).patch(update).delete(destroy),
        )
        .with_state(state)
}
