//! Shared application state for all routes.

use crate::model::ResourceModel;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub model: Arc<ResourceModel>,
}
