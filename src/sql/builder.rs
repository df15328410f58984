//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a resource
//! definition. SQLite placeholders are positional, so params are pushed in
//! clause order.

use crate::model::{LinkDef, Resource};
use serde_json::Value;
use std::collections::HashMap;

/// Quote an identifier (safe: identifiers come from the static model only).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) {
        self.params.push(v);
    }
}

/// Quoted pk + declared fields, in declaration order.
fn column_list(resource: &Resource) -> String {
    let mut cols = vec![quoted(&resource.pk_column)];
    cols.extend(resource.fields.iter().map(|f| quoted(&f.name)));
    cols.join(", ")
}

fn limit_offset_clause(limit: Option<u32>, offset: Option<u32>) -> String {
    match (limit, offset) {
        (None, None) => String::new(),
        // SQLite only accepts OFFSET after LIMIT; -1 means unbounded.
        (None, Some(o)) => format!(" LIMIT -1 OFFSET {}", o),
        (Some(l), None) => format!(" LIMIT {}", l),
        (Some(l), Some(o)) => format!(" LIMIT {} OFFSET {}", l, o),
    }
}

/// SELECT list with optional equality filters (ANDed), ORDER BY pk so rows
/// come back in creation order, optional LIMIT/OFFSET.
pub fn select_list(
    resource: &Resource,
    filters: &[(String, Value)],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = quoted(&resource.table_name);

    let mut where_parts = Vec::new();
    for (col, val) in filters {
        if resource.has_column(col) {
            q.push_param(val.clone());
            where_parts.push(format!("{} = ?", quoted(col)));
        }
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };

    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}",
        column_list(resource),
        table,
        where_clause,
        quoted(&resource.pk_column),
        limit_offset_clause(limit, offset),
    );
    q
}

/// SELECT by primary key. Caller binds the id as sole param.
pub fn select_by_id(resource: &Resource) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        column_list(resource),
        quoted(&resource.table_name),
        quoted(&resource.pk_column),
    );
    q
}

/// SELECT pk FROM resource WHERE pk IN (ids). Used to check that ids named in
/// a link write actually exist.
pub fn select_pks_in(resource: &Resource, ids: &[i64]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = quoted(&resource.pk_column);
    if ids.is_empty() {
        q.sql = format!(
            "SELECT {} FROM {} WHERE 1 = 0",
            pk,
            quoted(&resource.table_name)
        );
        return q;
    }
    let placeholders: Vec<&str> = ids
        .iter()
        .map(|id| {
            q.params.push(Value::Number((*id).into()));
            "?"
        })
        .collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({})",
        pk,
        quoted(&resource.table_name),
        pk,
        placeholders.join(", "),
    );
    q
}

/// INSERT from body: declared fields present in the body only, so absent
/// columns take their NULL/default. RETURNING serializes the created row
/// without a second round trip.
pub fn insert(resource: &Resource, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for f in &resource.fields {
        let Some(val) = body.get(&f.name) else { continue };
        q.push_param(val.clone());
        cols.push(quoted(&f.name));
        placeholders.push("?");
    }
    if cols.is_empty() {
        q.sql = format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quoted(&resource.table_name),
            column_list(resource),
        );
        return q;
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(&resource.table_name),
        cols.join(", "),
        placeholders.join(", "),
        column_list(resource),
    );
    q
}

/// UPDATE by id: SET only declared fields present in the body. An empty SET
/// degenerates to a SELECT so the caller still gets the current row back.
pub fn update(resource: &Resource, id: i64, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = quoted(&resource.table_name);
    let pk = quoted(&resource.pk_column);
    let mut sets = Vec::new();
    for f in &resource.fields {
        let Some(val) = body.get(&f.name) else { continue };
        q.push_param(val.clone());
        sets.push(format!("{} = ?", quoted(&f.name)));
    }
    if sets.is_empty() {
        q.sql = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            column_list(resource),
            table,
            pk
        );
        q.push_param(Value::Number(id.into()));
        return q;
    }
    q.push_param(Value::Number(id.into()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ? RETURNING {}",
        table,
        sets.join(", "),
        pk,
        column_list(resource),
    );
    q
}

/// DELETE by id. Caller binds the id; RETURNING distinguishes a real delete
/// from a missing row.
pub fn delete(resource: &Resource) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ? RETURNING {}",
        quoted(&resource.table_name),
        quoted(&resource.pk_column),
        column_list(resource),
    );
    q
}

/// Join rows for a set of owner ids, in insertion order (rowid).
pub fn link_select(link: &LinkDef, owner_ids: &[i64]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let our = quoted(&link.our_key);
    let their = quoted(&link.their_key);
    let table = quoted(&link.join_table);
    if owner_ids.is_empty() {
        q.sql = format!("SELECT {}, {} FROM {} WHERE 1 = 0", our, their, table);
        return q;
    }
    let placeholders: Vec<&str> = owner_ids
        .iter()
        .map(|id| {
            q.params.push(Value::Number((*id).into()));
            "?"
        })
        .collect();
    q.sql = format!(
        "SELECT {}, {} FROM {} WHERE {} IN ({}) ORDER BY rowid",
        our,
        their,
        table,
        our,
        placeholders.join(", "),
    );
    q
}

/// DELETE all join rows for one owner. Caller binds the owner id.
pub fn link_delete(link: &LinkDef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        quoted(&link.join_table),
        quoted(&link.our_key),
    );
    q
}

/// INSERT one join row. Caller binds (owner id, related id).
pub fn link_insert(link: &LinkDef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "INSERT INTO {} ({}, {}) VALUES (?, ?)",
        quoted(&link.join_table),
        quoted(&link.our_key),
        quoted(&link.their_key),
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDef, FieldKind};
    use serde_json::json;

    fn course_resource() -> Resource {
        Resource {
            path_segment: "courses".into(),
            table_name: "courses".into(),
            pk_column: "id".into(),
            fields: vec![FieldDef {
                name: "name".into(),
                kind: FieldKind::Text,
                required: true,
            }],
            filterable: vec!["id".into(), "name".into()],
            links: Vec::new(),
        }
    }

    #[test]
    fn select_list_without_filters_orders_by_pk() {
        let q = select_list(&course_resource(), &[], None, None);
        assert_eq!(
            q.sql,
            r#"SELECT "id", "name" FROM "courses" ORDER BY "id""#
        );
        assert!(q.params.is_empty());
    }

    #[test]
    fn select_list_ands_filters_in_order() {
        let filters = vec![
            ("id".to_string(), json!(8)),
            ("name".to_string(), json!("IT")),
        ];
        let q = select_list(&course_resource(), &filters, None, None);
        assert_eq!(
            q.sql,
            r#"SELECT "id", "name" FROM "courses" WHERE "id" = ? AND "name" = ? ORDER BY "id""#
        );
        assert_eq!(q.params, vec![json!(8), json!("IT")]);
    }

    #[test]
    fn select_list_ignores_undeclared_columns() {
        let filters = vec![("rowid".to_string(), json!(1))];
        let q = select_list(&course_resource(), &filters, None, None);
        assert!(!q.sql.contains("WHERE"));
        assert!(q.params.is_empty());
    }

    #[test]
    fn offset_without_limit_gets_unbounded_limit() {
        let q = select_list(&course_resource(), &[], None, Some(10));
        assert!(q.sql.ends_with("LIMIT -1 OFFSET 10"));
    }

    #[test]
    fn insert_skips_absent_fields() {
        let body = HashMap::from([("name".to_string(), json!("IT"))]);
        let q = insert(&course_resource(), &body);
        assert_eq!(
            q.sql,
            r#"INSERT INTO "courses" ("name") VALUES (?) RETURNING "id", "name""#
        );
        assert_eq!(q.params, vec![json!("IT")]);
    }

    #[test]
    fn update_with_empty_body_degenerates_to_select() {
        let q = update(&course_resource(), 3, &HashMap::new());
        assert_eq!(
            q.sql,
            r#"SELECT "id", "name" FROM "courses" WHERE "id" = ?"#
        );
        assert_eq!(q.params, vec![json!(3)]);
    }

    #[test]
    fn update_binds_sets_before_id() {
        let body = HashMap::from([("name".to_string(), json!("IT"))]);
        let q = update(&course_resource(), 3, &body);
        assert_eq!(
            q.sql,
            r#"UPDATE "courses" SET "name" = ? WHERE "id" = ? RETURNING "id", "name""#
        );
        assert_eq!(q.params, vec![json!("IT"), json!(3)]);
    }

    #[test]
    fn delete_returns_deleted_row() {
        let q = delete(&course_resource());
        assert_eq!(
            q.sql,
            r#"DELETE FROM "courses" WHERE "id" = ? RETURNING "id", "name""#
        );
    }
}
