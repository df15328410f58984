//! Student endpoint tests: the symmetrical CRUD surface plus date handling.

mod common;

use common::*;
use serde_json::json;

#[tokio::test]
async fn list_and_filter_students() {
    let (app, pool) = setup().await;
    let ids = seed_students(&pool, 3).await;

    let (status, data) = get(&app, "/api/v1/students/").await;
    assert_eq!(status, 200);
    assert_eq!(data.as_array().unwrap().len(), 3);

    let (status, data) = get(&app, &format!("/api/v1/students/?id={}", ids[0])).await;
    assert_eq!(status, 200);
    let items = data.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "student 1");
}

#[tokio::test]
async fn create_student_echoes_fields() {
    let (app, pool) = setup().await;
    let (status, body) = post(
        &app,
        "/api/v1/students/",
        json!({"name": "Ada Lovelace", "birth_date": "1815-12-10"}),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["name"], "Ada Lovelace");
    assert_eq!(body["birth_date"], "1815-12-10");
    assert_eq!(count(&pool, "students").await, 1);
}

#[tokio::test]
async fn create_student_requires_birth_date() {
    let (app, pool) = setup().await;
    let (status, body) = post(&app, "/api/v1/students/", json!({"name": "Ada"})).await;
    assert_eq!(status, 400);
    assert!(body["error"]["details"]["birth_date"].is_array());
    assert_eq!(count(&pool, "students").await, 0);
}

#[tokio::test]
async fn create_student_rejects_malformed_date() {
    let (app, _pool) = setup().await;
    let (status, body) = post(
        &app,
        "/api/v1/students/",
        json!({"name": "Ada", "birth_date": "tenth of december"}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn patch_student_updates_only_given_fields() {
    let (app, pool) = setup().await;
    let id = insert_student(&pool, "Ada Lovelace", "1815-12-10").await;

    let (status, body) = patch(
        &app,
        &format!("/api/v1/students/{}/", id),
        json!({"name": "Ada King"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "Ada King");
    assert_eq!(body["birth_date"], "1815-12-10");
}

#[tokio::test]
async fn delete_student_keeps_linked_course() {
    let (app, pool) = setup().await;
    let id = insert_student(&pool, "Ada Lovelace", "1815-12-10").await;
    insert_course(&pool, "Algebra", &[id]).await;

    let (status, _) = delete(&app, &format!("/api/v1/students/{}/", id)).await;
    assert_eq!(status, 204);
    assert_eq!(count(&pool, "students").await, 0);
    assert_eq!(count(&pool, "course_students").await, 0);
    assert_eq!(count(&pool, "courses").await, 1);
}
