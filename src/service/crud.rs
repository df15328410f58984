//! Generic CRUD execution against SQLite.

use crate::error::AppError;
use crate::model::{FieldDef, FieldKind, LinkDef, Resource, ResourceModel};
use crate::sql::{self, BindValue, QueryBuf};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::{HashMap, HashSet};

pub struct CrudService;

impl CrudService {
    /// List rows with optional equality filters, in creation (pk) order, link
    /// arrays attached.
    pub async fn list(
        pool: &SqlitePool,
        resource: &Resource,
        filters: &[(String, Value)],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Value>, AppError> {
        let q = sql::select_list(resource, filters, limit, offset);
        let rows = Self::query_many(pool, resource, &q).await?;
        Self::attach_links(pool, resource, rows).await
    }

    /// Fetch one row by primary key, link arrays attached. None if missing.
    pub async fn read(
        pool: &SqlitePool,
        resource: &Resource,
        id: i64,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::select_by_id(resource);
        tracing::debug!(sql = %q.sql, id, "query");
        let row = sqlx::query(&q.sql).bind(id).fetch_optional(pool).await?;
        let Some(row) = row else { return Ok(None) };
        let value = row_to_json(resource, &row)?;
        let mut rows = Self::attach_links(pool, resource, vec![value]).await?;
        Ok(rows.pop())
    }

    /// Insert one row and write its link rows in a single transaction.
    /// Returns the created row with link arrays attached.
    pub async fn create(
        pool: &SqlitePool,
        model: &ResourceModel,
        resource: &Resource,
        body: &HashMap<String, Value>,
        links: &HashMap<String, Vec<i64>>,
    ) -> Result<Value, AppError> {
        Self::check_link_targets(pool, model, resource, links).await?;
        let mut tx = pool.begin().await?;
        let q = sql::insert(resource, body);
        let row = Self::execute_returning_one(&mut tx, resource, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        let id = pk_of(resource, &row)?;
        for l in &resource.links {
            let Some(ids) = links.get(&l.field) else { continue };
            Self::replace_links(&mut tx, l, id, ids).await?;
        }
        tx.commit().await?;
        let mut rows = Self::attach_links(pool, resource, vec![row]).await?;
        rows.pop().ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update fields present in the body and replace any link sets given, in
    /// one transaction. None if the id does not exist (nothing is written).
    pub async fn update(
        pool: &SqlitePool,
        model: &ResourceModel,
        resource: &Resource,
        id: i64,
        body: &HashMap<String, Value>,
        links: &HashMap<String, Vec<i64>>,
    ) -> Result<Option<Value>, AppError> {
        Self::check_link_targets(pool, model, resource, links).await?;
        let mut tx = pool.begin().await?;
        let q = sql::update(resource, id, body);
        let Some(row) = Self::execute_returning_one(&mut tx, resource, &q).await? else {
            return Ok(None);
        };
        for l in &resource.links {
            let Some(ids) = links.get(&l.field) else { continue };
            Self::replace_links(&mut tx, l, id, ids).await?;
        }
        tx.commit().await?;
        let mut rows = Self::attach_links(pool, resource, vec![row]).await?;
        Ok(rows.pop())
    }

    /// Delete one row by primary key. Join rows go with it via FK cascade.
    /// Returns the deleted row, or None if the id does not exist.
    pub async fn delete(
        pool: &SqlitePool,
        resource: &Resource,
        id: i64,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::delete(resource);
        tracing::debug!(sql = %q.sql, id, "query");
        let row = sqlx::query(&q.sql).bind(id).fetch_optional(pool).await?;
        row.map(|r| row_to_json(resource, &r)).transpose()
    }

    /// Reject link writes naming ids that do not exist in the related table.
    async fn check_link_targets(
        pool: &SqlitePool,
        model: &ResourceModel,
        resource: &Resource,
        links: &HashMap<String, Vec<i64>>,
    ) -> Result<(), AppError> {
        for l in &resource.links {
            let Some(ids) = links.get(&l.field) else { continue };
            if ids.is_empty() {
                continue;
            }
            let Some(related) = model.resource_by_path(&l.related_path) else { continue };
            let q = sql::select_pks_in(related, ids);
            let rows = bind_query(&q)?.fetch_all(pool).await?;
            let existing: HashSet<i64> = rows
                .iter()
                .map(|r| r.try_get::<i64, _>(0))
                .collect::<Result<_, _>>()?;
            let missing: Vec<i64> = ids
                .iter()
                .copied()
                .filter(|id| !existing.contains(id))
                .collect();
            if !missing.is_empty() {
                return Err(AppError::Validation {
                    field: l.field.clone(),
                    message: format!("unknown ids: {:?}", missing),
                });
            }
        }
        Ok(())
    }

    /// Replace the full link set for one owner row.
    async fn replace_links(
        conn: &mut SqliteConnection,
        link: &LinkDef,
        owner: i64,
        ids: &[i64],
    ) -> Result<(), AppError> {
        let q = sql::link_delete(link);
        sqlx::query(&q.sql).bind(owner).execute(&mut *conn).await?;
        let q = sql::link_insert(link);
        for related in ids {
            sqlx::query(&q.sql)
                .bind(owner)
                .bind(*related)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Batch-load join rows for every link of the resource and set the link
    /// arrays on each serialized row (empty array when unlinked).
    async fn attach_links(
        pool: &SqlitePool,
        resource: &Resource,
        mut rows: Vec<Value>,
    ) -> Result<Vec<Value>, AppError> {
        if resource.links.is_empty() || rows.is_empty() {
            return Ok(rows);
        }
        let ids: Vec<i64> = rows
            .iter()
            .map(|r| pk_of(resource, r))
            .collect::<Result<_, _>>()?;
        for link in &resource.links {
            let q = sql::link_select(link, &ids);
            tracing::debug!(sql = %q.sql, params = ?q.params, "query");
            let fetched = bind_query(&q)?.fetch_all(pool).await?;
            let mut by_owner: HashMap<i64, Vec<Value>> = HashMap::new();
            for row in &fetched {
                let owner: i64 = row.try_get(0)?;
                let related: i64 = row.try_get(1)?;
                by_owner
                    .entry(owner)
                    .or_default()
                    .push(Value::Number(related.into()));
            }
            for (value, id) in rows.iter_mut().zip(&ids) {
                if let Value::Object(map) = value {
                    let linked = by_owner.remove(id).unwrap_or_default();
                    map.insert(link.field.clone(), Value::Array(linked));
                }
            }
        }
        Ok(rows)
    }

    async fn query_many(
        pool: &SqlitePool,
        resource: &Resource,
        q: &QueryBuf,
    ) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_query(q)?.fetch_all(pool).await?;
        rows.iter().map(|r| row_to_json(resource, r)).collect()
    }

    async fn execute_returning_one(
        conn: &mut SqliteConnection,
        resource: &Resource,
        q: &QueryBuf,
    ) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
        let row = bind_query(q)?.fetch_optional(&mut *conn).await?;
        row.map(|r| row_to_json(resource, &r)).transpose()
    }
}

fn bind_query<'a>(
    q: &'a QueryBuf,
) -> Result<sqlx::query::Query<'a, Sqlite, SqliteArguments<'a>>, AppError> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(BindValue::from_json(p)?);
    }
    Ok(query)
}

fn pk_of(resource: &Resource, row: &Value) -> Result<i64, AppError> {
    row.get(&resource.pk_column)
        .and_then(Value::as_i64)
        .ok_or_else(|| AppError::Db(sqlx::Error::ColumnNotFound(resource.pk_column.clone())))
}

/// Serialize a row using the declared field kinds, pk first.
fn row_to_json(resource: &Resource, row: &SqliteRow) -> Result<Value, AppError> {
    let mut map = Map::new();
    let id: i64 = row.try_get(resource.pk_column.as_str())?;
    map.insert(resource.pk_column.clone(), Value::Number(id.into()));
    for f in &resource.fields {
        map.insert(f.name.clone(), decode_field(row, f)?);
    }
    Ok(Value::Object(map))
}

fn decode_field(row: &SqliteRow, field: &FieldDef) -> Result<Value, AppError> {
    let name = field.name.as_str();
    Ok(match field.kind {
        FieldKind::Integer => row
            .try_get::<Option<i64>, _>(name)?
            .map(|n| Value::Number(n.into()))
            .unwrap_or(Value::Null),
        FieldKind::Text => row
            .try_get::<Option<String>, _>(name)?
            .map(Value::String)
            .unwrap_or(Value::Null),
        FieldKind::Date => row
            .try_get::<Option<NaiveDate>, _>(name)?
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
    })
}
