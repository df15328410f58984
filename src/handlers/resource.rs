//! Resource CRUD handlers: list, create, retrieve, update, delete. Each
//! handler resolves the resource from the path segment, so one set of
//! handlers serves every registered resource.

use crate::error::AppError;
use crate::model::{FieldKind, Resource};
use crate::service::{CrudService, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

fn resource_for<'a>(state: &'a AppState, path: &str) -> Result<&'a Resource, AppError> {
    state
        .model
        .resource_by_path(path)
        .ok_or_else(|| AppError::NotFound(path.to_string()))
}

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest("invalid id".into()))
}

fn body_to_map(value: Value) -> Result<HashMap<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m.into_iter().collect()),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Pull link writes out of the body. Each declared link field must be an
/// array of integer ids; duplicates collapse, order is kept.
fn split_links(
    resource: &Resource,
    body: &mut HashMap<String, Value>,
) -> Result<HashMap<String, Vec<i64>>, AppError> {
    let mut links = HashMap::new();
    for l in &resource.links {
        let Some(v) = body.remove(&l.field) else { continue };
        let Value::Array(items) = v else {
            return Err(AppError::validation(&l.field, "must be an array of ids"));
        };
        let mut ids: Vec<i64> = Vec::with_capacity(items.len());
        for item in &items {
            let Some(id) = item.as_i64() else {
                return Err(AppError::validation(&l.field, "must be an array of ids"));
            };
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        links.insert(l.field.clone(), ids);
    }
    Ok(links)
}

/// Parse a filter query parameter according to the column's declared kind.
fn query_value_for_column(resource: &Resource, name: &str, raw: &str) -> Result<Value, AppError> {
    let kind = if name == resource.pk_column {
        FieldKind::Integer
    } else {
        resource
            .field(name)
            .map(|f| f.kind)
            .unwrap_or(FieldKind::Text)
    };
    Ok(match kind {
        FieldKind::Integer => {
            let n: i64 = raw
                .parse()
                .map_err(|_| AppError::validation(name, "must be an integer"))?;
            Value::Number(n.into())
        }
        FieldKind::Text | FieldKind::Date => Value::String(raw.to_string()),
    })
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Value>>, AppError> {
    let resource = resource_for(&state, &path_segment)?;

    let mut limit: Option<u32> = None;
    let mut offset: Option<u32> = None;
    let mut filters: Vec<(String, Value)> = Vec::new();
    for (k, v) in &params {
        match k.as_str() {
            "limit" => limit = v.parse().ok(),
            "offset" => offset = v.parse().ok(),
            _ => {
                // Undeclared parameters are ignored, matching the
                // fixed-filter-list contract.
                if resource.filterable.iter().any(|f| f == k) {
                    filters.push((k.clone(), query_value_for_column(resource, k, v)?));
                }
            }
        }
    }

    let rows = CrudService::list(&state.pool, resource, &filters, limit, offset).await?;
    Ok(Json(rows))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let resource = resource_for(&state, &path_segment)?;
    let mut body = body_to_map(body)?;
    let links = split_links(resource, &mut body)?;
    RequestValidator::validate(&body, resource)?;
    let row = CrudService::create(&state.pool, &state.model, resource, &body, &links).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let resource = resource_for(&state, &path_segment)?;
    let id = parse_id(&id_str)?;
    let row = CrudService::read(&state.pool, resource, id)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(Json(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let resource = resource_for(&state, &path_segment)?;
    let id = parse_id(&id_str)?;
    let mut body = body_to_map(body)?;
    let links = split_links(resource, &mut body)?;
    RequestValidator::validate_partial(&body, resource)?;
    let row = CrudService::update(&state.pool, &state.model, resource, id, &body, &links)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(Json(row))
}

pub async fn destroy(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let resource = resource_for(&state, &path_segment)?;
    let id = parse_id(&id_str)?;
    CrudService::delete(&state.pool, resource, id)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(StatusCode::NO_CONTENT)
}
