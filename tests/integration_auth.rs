mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Utc};
use common::{PASSWORD, create_user, get, login, send};
use serde_json::json;
use siges_models::Role;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_login_returns_token_pair_and_stamps_last_login(pool: PgPool) {
    let user = create_user(&pool, Role::Parent, None).await;

    let (status, body) = send(
        &pool,
        Method::POST,
        "/api/token/",
        None,
        Some(json!({ "email": user.email.to_uppercase(), "password": PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].as_str().is_some());
    assert!(body["refresh"].as_str().is_some());

    let last_login: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT last_login FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(last_login.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_with_wrong_password(pool: PgPool) {
    let user = create_user(&pool, Role::Parent, None).await;

    let (status, body) = send(
        &pool,
        Method::POST,
        "/api/token/",
        None,
        Some(json!({ "email": user.email, "password": "not-the-password" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["detail"],
        "No active account found with the given credentials"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_for_unknown_account(pool: PgPool) {
    let (status, _) = send(
        &pool,
        Method::POST,
        "/api/token/",
        None,
        Some(json!({ "email": "nobody@test.com", "password": PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_without_password_is_a_validation_error(pool: PgPool) {
    let (status, body) = send(
        &pool,
        Method::POST,
        "/api/token/",
        None,
        Some(json!({ "email": "someone@test.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["password"][0], "This field is required.");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_issues_a_working_access_token(pool: PgPool) {
    let user = create_user(&pool, Role::Director, None).await;

    let (_, pair) = send(
        &pool,
        Method::POST,
        "/api/token/",
        None,
        Some(json!({ "email": user.email, "password": PASSWORD })),
    )
    .await;

    let (status, body) = send(
        &pool,
        Method::POST,
        "/api/token/refresh/",
        None,
        Some(json!({ "refresh": pair["refresh"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let access = body["access"].as_str().unwrap();
    let (status, me) = get(&pool, "/api/users/me/", access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user.id.to_string());
    assert_eq!(me["role"], "director");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_token_types_are_not_interchangeable(pool: PgPool) {
    let user = create_user(&pool, Role::Parent, None).await;

    let (_, pair) = send(
        &pool,
        Method::POST,
        "/api/token/",
        None,
        Some(json!({ "email": user.email, "password": PASSWORD })),
    )
    .await;

    let refresh = pair["refresh"].as_str().unwrap();
    let (status, _) = get(&pool, "/api/users/me/", refresh).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &pool,
        Method::POST,
        "/api/token/refresh/",
        None,
        Some(json!({ "refresh": pair["access"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_requests_without_token_are_unauthenticated(pool: PgPool) {
    let (status, body) = send(&pool, Method::GET, "/api/schools/", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["detail"],
        "Authentication credentials were not provided."
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_token_of_deleted_account_is_rejected(pool: PgPool) {
    let user = create_user(&pool, Role::Parent, None).await;
    let token = login(&pool, &user.email).await;

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    let (status, _) = get(&pool, "/api/users/me/", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_health(pool: PgPool) {
    let (status, body) = send(&pool, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
