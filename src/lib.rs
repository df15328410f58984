//! Roster: a student/course registry exposed as REST resources over SQLite,
//! with equality filtering on list endpoints.

pub mod error;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use error::{AppError, ModelError};
pub use model::{registry, FieldDef, FieldKind, LinkDef, Resource, ResourceModel};
pub use routes::{build_app, common_routes, resource_routes};
pub use service::{CrudService, RequestValidator};
pub use state::AppState;
pub use store::{connect, ensure_tables};
