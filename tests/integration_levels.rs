mod common;

use axum::http::StatusCode;
use common::{
    create_level, create_school, create_student, create_tree, create_user, delete, get, ids,
    login, patch, post, put, unique_name,
};
use serde_json::json;
use siges_models::Role;
use sqlx::PgPool;

const AMBIGUOUS: &str = "The target school is ambiguous; specify it explicitly.";

#[sqlx::test(migrations = "./migrations")]
async fn test_single_school_director_may_omit_school(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, body) = post(
        &pool,
        "/api/levels/",
        &token,
        json!({ "name": "CM1", "cycle": "primary" }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["school"], tree.school.to_string());
    assert_eq!(body["cycle"], "primary");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_multi_school_director_must_name_school(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let second = create_school(&pool, &unique_name("School"), Some(tree.director.id)).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, body) = post(
        &pool,
        "/api/levels/",
        &token,
        json!({ "name": "CM1", "cycle": "primary" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["school"][0], AMBIGUOUS);

    let (status, body) = post(
        &pool,
        "/api/levels/",
        &token,
        json!({ "name": "CM1", "cycle": "primary", "school": second }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["school"], second.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_super_admin_must_name_school(pool: PgPool) {
    let admin = create_user(&pool, Role::SuperAdmin, None).await;
    let school = create_school(&pool, &unique_name("School"), None).await;
    let token = login(&pool, &admin.email).await;

    let (status, body) = post(
        &pool,
        "/api/levels/",
        &token,
        json!({ "name": "CP", "cycle": "primary" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["school"][0], AMBIGUOUS);

    let (status, _) = post(
        &pool,
        "/api/levels/",
        &token,
        json!({ "name": "CP", "cycle": "primary", "school": school }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_director_cannot_create_level_in_foreign_school(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let other = create_tree(&pool).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, _) = post(
        &pool,
        "/api/levels/",
        &token,
        json!({ "name": "CM1", "cycle": "primary", "school": other.school }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post(
        &pool,
        &format!("/api/schools/{}/levels/", other.school),
        &token,
        json!({ "name": "CM1", "cycle": "primary" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_cannot_create_levels(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let teacher = create_user(&pool, Role::Teacher, Some(tree.school)).await;
    let token = login(&pool, &teacher.email).await;

    let (status, _) = post(
        &pool,
        "/api/levels/",
        &token,
        json!({ "name": "CM1", "cycle": "primary", "school": tree.school }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_nested_level_create_checks_body_school(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let token = login(&pool, &tree.director.email).await;
    let uri = format!("/api/schools/{}/levels/", tree.school);

    let (status, body) = post(
        &pool,
        &uri,
        &token,
        json!({ "name": "CE2", "cycle": "primary", "school": uuid::Uuid::new_v4() }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["school"][0], "Must match the school in the URL.");

    let (status, body) = post(&pool, &uri, &token, json!({ "name": "CE2", "cycle": "primary" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["school"], tree.school.to_string());

    let (status, body) = get(&pool, &uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["name"], "CE2");
    assert_eq!(body[1]["name"], "CM2");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_level_name_in_school(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, body) = post(
        &pool,
        "/api/levels/",
        &token,
        json!({ "name": "CM2", "cycle": "primary" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["non_field_errors"][0],
        "The fields name, school must make a unique set."
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_level_reads_are_scoped(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let other = create_tree(&pool).await;

    let token = login(&pool, &tree.director.email).await;
    let (status, body) = get(&pool, "/api/levels/", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![tree.level.to_string()]);

    let (status, _) = get(&pool, &format!("/api/levels/{}/", other.level), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let parent = create_user(&pool, Role::Parent, None).await;
    let token = login(&pool, &parent.email).await;
    let (status, body) = get(&pool, "/api/levels/", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_level_updates(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let token = login(&pool, &tree.director.email).await;
    let uri = format!("/api/levels/{}/", tree.level);

    let (status, body) = patch(&pool, &uri, &token, json!({ "cycle": "lower_secondary" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cycle"], "lower_secondary");
    assert_eq!(body["name"], "CM2");

    let (status, body) = put(
        &pool,
        &uri,
        &token,
        json!({ "name": "6ème", "cycle": "lower_secondary", "school": uuid::Uuid::new_v4() }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["school"].is_array());

    let (status, body) = put(
        &pool,
        &uri,
        &token,
        json!({ "name": "6ème", "cycle": "lower_secondary" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "6ème");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_level_with_students_conflicts(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let empty = create_level(&pool, tree.school, "CM1").await;
    create_student(&pool, tree.class, "Traoré", &[]).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, _) = delete(&pool, &format!("/api/levels/{}/", tree.level), &token).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = delete(&pool, &format!("/api/levels/{}/", empty), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_director_reassigned_mid_request_cannot_create_level(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let successor = create_user(&pool, Role::Director, None).await;
    let token = login(&pool, &tree.director.email).await;

    let mut reassign = pool.begin().await.unwrap();
    sqlx::query("UPDATE schools SET director_id = $1 WHERE id = $2")
        .bind(successor.id)
        .bind(tree.school)
        .execute(&mut *reassign)
        .await
        .unwrap();

    let request = tokio::spawn({
        let pool = pool.clone();
        let school = tree.school;
        async move {
            post(
                &pool,
                "/api/levels/",
                &token,
                json!({ "name": "CM1", "cycle": "primary", "school": school }),
            )
            .await
        }
    });

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    reassign.commit().await.unwrap();

    let (status, _) = request.await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let levels: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM levels WHERE school_id = $1")
        .bind(tree.school)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(levels, 1);
}
