mod common;

use axum::http::StatusCode;
use common::{
    create_class, create_level, create_student, create_tree, create_user, delete, get, ids,
    login, patch, post,
};
use serde_json::json;
use siges_models::Role;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_create_class_requires_level(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, body) = post(
        &pool,
        "/api/classes/",
        &token,
        json!({ "name": "B", "academic_year": "2024-2025" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["level"][0], "This field is required.");

    let (status, body) = post(
        &pool,
        "/api/classes/",
        &token,
        json!({ "name": "B", "academic_year": "2024-2025", "level": tree.level }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["level"], tree.level.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_class_under_foreign_level_is_forbidden(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let other = create_tree(&pool).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, _) = post(
        &pool,
        "/api/classes/",
        &token,
        json!({ "name": "B", "academic_year": "2024-2025", "level": other.level }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_class_under_unknown_level(pool: PgPool) {
    let admin = create_user(&pool, Role::SuperAdmin, None).await;
    let token = login(&pool, &admin.email).await;

    let (status, body) = post(
        &pool,
        "/api/classes/",
        &token,
        json!({ "name": "B", "academic_year": "2024-2025", "level": uuid::Uuid::new_v4() }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["level"].is_array());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_class_uniqueness_includes_academic_year(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let token = login(&pool, &tree.director.email).await;
    let uri = format!("/api/levels/{}/classes/", tree.level);

    let (status, body) = post(
        &pool,
        &uri,
        &token,
        json!({ "name": "A", "academic_year": "2024-2025" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["non_field_errors"][0],
        "The fields name, level, academic_year must make a unique set."
    );

    let (status, _) = post(
        &pool,
        &uri,
        &token,
        json!({ "name": "A", "academic_year": "2025-2026" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_nested_class_create_checks_body_level(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let sibling = create_level(&pool, tree.school, "CM1").await;
    let token = login(&pool, &tree.director.email).await;

    let (status, body) = post(
        &pool,
        &format!("/api/levels/{}/classes/", tree.level),
        &token,
        json!({ "name": "B", "academic_year": "2024-2025", "level": sibling }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["level"].is_array());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_class_listing_is_scoped_and_ordered(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let c = create_class(&pool, tree.level, "C").await;
    let b = create_class(&pool, tree.level, "B").await;
    let other = create_tree(&pool).await;

    let token = login(&pool, &tree.director.email).await;
    let (status, body) = get(&pool, "/api/classes/", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ids(&body),
        vec![tree.class.to_string(), b.to_string(), c.to_string()]
    );

    let (status, _) = get(&pool, &format!("/api/classes/{}/", other.class), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&pool, &format!("/api/levels/{}/classes/", tree.level), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_class_patch(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, body) = patch(
        &pool,
        &format!("/api/classes/{}/", tree.class),
        &token,
        json!({ "academic_year": "2025-2026" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["academic_year"], "2025-2026");
    assert_eq!(body["name"], "A");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_class_with_students_conflicts(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let student = create_student(&pool, tree.class, "Diallo", &[]).await;
    let token = login(&pool, &tree.director.email).await;
    let uri = format!("/api/classes/{}/", tree.class);

    let (status, body) = delete(&pool, &uri, &token).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["detail"],
        "Cannot delete this class: students are still enrolled in it."
    );

    sqlx::query("DELETE FROM students WHERE id = $1")
        .bind(student)
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = delete(&pool, &uri, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
}
