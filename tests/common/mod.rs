#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use siges::router::init_app;
use siges::state::AppState;
use siges_core::hash_password;
use siges_models::{ClassId, LevelId, Role, SchoolId, StudentId, UserId};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "testpass123";

pub struct TestUser {
    pub id: UserId,
    pub email: String,
}

pub fn unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

pub fn unique_name(prefix: &str) -> String {
    format!("{} {}", prefix, Uuid::new_v4())
}

pub async fn create_user(pool: &PgPool, role: Role, school: Option<SchoolId>) -> TestUser {
    let email = unique_email();
    let hashed = hash_password(PASSWORD).unwrap();

    let id: UserId = sqlx::query_scalar(
        "INSERT INTO users (email, password, first_name, last_name, role, school_id)
         VALUES ($1, $2, 'Test', 'User', $3, $4)
         RETURNING id",
    )
    .bind(&email)
    .bind(&hashed)
    .bind(role)
    .bind(school)
    .fetch_one(pool)
    .await
    .unwrap();

    TestUser { id, email }
}

pub async fn create_school(pool: &PgPool, name: &str, director: Option<UserId>) -> SchoolId {
    sqlx::query_scalar(
        "INSERT INTO schools (name, address, director_id) VALUES ($1, 'Test Address', $2) RETURNING id",
    )
    .bind(name)
    .bind(director)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_level(pool: &PgPool, school: SchoolId, name: &str) -> LevelId {
    sqlx::query_scalar(
        "INSERT INTO levels (name, cycle, school_id) VALUES ($1, 'primary', $2) RETURNING id",
    )
    .bind(name)
    .bind(school)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_class(pool: &PgPool, level: LevelId, name: &str) -> ClassId {
    sqlx::query_scalar(
        "INSERT INTO classes (name, academic_year, level_id) VALUES ($1, '2024-2025', $2) RETURNING id",
    )
    .bind(name)
    .bind(level)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_student(
    pool: &PgPool,
    class: ClassId,
    last_name: &str,
    parents: &[UserId],
) -> StudentId {
    let id: StudentId = sqlx::query_scalar(
        "INSERT INTO students (first_name, last_name, date_of_birth, gender, school_class_id)
         VALUES ('Test', $1, '2012-05-04', 'FEMALE', $2)
         RETURNING id",
    )
    .bind(last_name)
    .bind(class)
    .fetch_one(pool)
    .await
    .unwrap();

    for parent in parents {
        sqlx::query("INSERT INTO student_parents (student_id, parent_id) VALUES ($1, $2)")
            .bind(id)
            .bind(parent)
            .execute(pool)
            .await
            .unwrap();
    }

    id
}

/// A school directed by a fresh director, with one level and one class.
pub struct TestTree {
    pub director: TestUser,
    pub school: SchoolId,
    pub level: LevelId,
    pub class: ClassId,
}

pub async fn create_tree(pool: &PgPool) -> TestTree {
    let director = create_user(pool, Role::Director, None).await;
    let school = create_school(pool, &unique_name("School"), Some(director.id)).await;
    let level = create_level(pool, school, "CM2").await;
    let class = create_class(pool, level, "A").await;
    TestTree {
        director,
        school,
        level,
        class,
    }
}

pub fn setup_app(pool: PgPool) -> tower_http::normalize_path::NormalizePath<axum::Router> {
    dotenvy::dotenv().ok();
    init_app(AppState::new(pool))
}

/// Sends one request through a fresh app and returns the status and the
/// decoded JSON body (`Value::Null` when the body is empty).
pub async fn send(
    pool: &PgPool,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = setup_app(pool.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}

pub async fn get(pool: &PgPool, uri: &str, token: &str) -> (StatusCode, Value) {
    send(pool, Method::GET, uri, Some(token), None).await
}

pub async fn post(pool: &PgPool, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(pool, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put(pool: &PgPool, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(pool, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn patch(pool: &PgPool, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(pool, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete(pool: &PgPool, uri: &str, token: &str) -> (StatusCode, Value) {
    send(pool, Method::DELETE, uri, Some(token), None).await
}

pub async fn login(pool: &PgPool, email: &str) -> String {
    let (status, body) = send(
        pool,
        Method::POST,
        "/api/token/",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["access"].as_str().unwrap().to_string()
}

/// Ids of a JSON array of objects, in order.
pub fn ids(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}
