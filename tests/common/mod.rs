//! Shared test harness: in-memory database, app router, request helpers, and
//! row factories for seeding.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use roster::{build_app, connect, ensure_tables, registry, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;

/// Fresh in-memory database with the schema bootstrapped, plus the full app
/// router on top of it.
pub async fn setup() -> (Router, SqlitePool) {
    let pool = connect("sqlite::memory:").await.expect("open in-memory db");
    ensure_tables(&pool).await.expect("bootstrap schema");
    let state = AppState {
        pool: pool.clone(),
        model: Arc::new(registry().expect("resource model")),
    };
    (build_app(state), pool)
}

pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).expect("build request"))
        .await
        .expect("infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response is JSON")
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    request(app, "GET", uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    request(app, "POST", uri, Some(body)).await
}

pub async fn patch(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    request(app, "PATCH", uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    request(app, "DELETE", uri, None).await
}

pub async fn insert_student(pool: &SqlitePool, name: &str, birth_date: &str) -> i64 {
    let row: (i64,) =
        sqlx::query_as("INSERT INTO students (name, birth_date) VALUES (?, ?) RETURNING id")
            .bind(name)
            .bind(birth_date)
            .fetch_one(pool)
            .await
            .expect("insert student");
    row.0
}

pub async fn insert_course(pool: &SqlitePool, name: &str, student_ids: &[i64]) -> i64 {
    let row: (i64,) = sqlx::query_as("INSERT INTO courses (name) VALUES (?) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("insert course");
    for sid in student_ids {
        sqlx::query("INSERT INTO course_students (course_id, student_id) VALUES (?, ?)")
            .bind(row.0)
            .bind(*sid)
            .execute(pool)
            .await
            .expect("link student");
    }
    row.0
}

/// Insert n numbered students with a fixed birth date.
pub async fn seed_students(pool: &SqlitePool, n: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        ids.push(insert_student(pool, &format!("student {}", i + 1), "2000-01-01").await);
    }
    ids
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("count rows");
    row.0
}
