mod common;

use axum::http::StatusCode;
use common::{
    create_level, create_school, create_student, create_tree, create_user, delete, get, ids,
    login, patch, post, put, unique_name,
};
use serde_json::json;
use siges_models::Role;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_super_admin_creates_school_with_director(pool: PgPool) {
    let admin = create_user(&pool, Role::SuperAdmin, None).await;
    let director = create_user(&pool, Role::Director, None).await;
    let token = login(&pool, &admin.email).await;

    let (status, body) = post(
        &pool,
        "/api/schools/",
        &token,
        json!({
            "name": "Lycée A",
            "address": "12 Rue des Jardins",
            "contact_info": "+225 01 02 03 04",
            "director": director.id,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Lycée A");
    assert_eq!(body["director"], director.id.to_string());
    assert_eq!(body["is_active"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_school_director_must_have_director_role(pool: PgPool) {
    let admin = create_user(&pool, Role::SuperAdmin, None).await;
    let teacher = create_user(&pool, Role::Teacher, None).await;
    let token = login(&pool, &admin.email).await;

    let (status, body) = post(
        &pool,
        "/api/schools/",
        &token,
        json!({ "name": "Lycée B", "address": "Rue 1", "director": teacher.id }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["director"].is_array());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_super_admin_creates_schools(pool: PgPool) {
    for role in [Role::Director, Role::Admin, Role::Teacher, Role::Parent] {
        let user = create_user(&pool, role, None).await;
        let token = login(&pool, &user.email).await;

        let (status, _) = post(
            &pool,
            "/api/schools/",
            &token,
            json!({ "name": unique_name("School"), "address": "Rue 1" }),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN, "role {role}");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_any_account_lists_schools_by_name(pool: PgPool) {
    let b = create_school(&pool, "B School", None).await;
    let a = create_school(&pool, "A School", None).await;

    let parent = create_user(&pool, Role::Parent, None).await;
    let token = login(&pool, &parent.email).await;

    let (status, body) = get(&pool, "/api/schools", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![a.to_string(), b.to_string()]);

    let (status, body) = get(&pool, &format!("/api/schools/{}/", b), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "B School");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_director_updates_only_directed_school(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let other = create_tree(&pool).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, body) = patch(
        &pool,
        &format!("/api/schools/{}/", tree.school),
        &token,
        json!({ "address": "New address" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["address"], "New address");

    let (status, _) = patch(
        &pool,
        &format!("/api/schools/{}/", other.school),
        &token,
        json!({ "address": "Hijacked" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = delete(&pool, &format!("/api/schools/{}/", other.school), &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_staff_and_parents_cannot_modify_schools(pool: PgPool) {
    let tree = create_tree(&pool).await;

    for role in [Role::Admin, Role::Teacher, Role::Accountant, Role::Parent] {
        let user = create_user(&pool, role, Some(tree.school)).await;
        let token = login(&pool, &user.email).await;

        let (status, _) = patch(
            &pool,
            &format!("/api/schools/{}/", tree.school),
            &token,
            json!({ "name": "Renamed" }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "role {role}");

        let (status, _) =
            delete(&pool, &format!("/api/schools/{}/", tree.school), &token).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "role {role}");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_director_cannot_reassign_director(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let replacement = create_user(&pool, Role::Director, None).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, body) = patch(
        &pool,
        &format!("/api/schools/{}/", tree.school),
        &token,
        json!({ "director": replacement.id }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["detail"],
        "Only a super-admin can change the director of a school."
    );

    // restating the current director is not a change
    let (status, _) = patch(
        &pool,
        &format!("/api/schools/{}/", tree.school),
        &token,
        json!({ "director": tree.director.id, "name": "Renamed" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_replace_school_keeps_absent_optional_fields(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, body) = put(
        &pool,
        &format!("/api/schools/{}", tree.school),
        &token,
        json!({ "name": "Replaced", "address": "Replaced address" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Replaced");
    assert_eq!(body["director"], tree.director.id.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_school_patch_rejects_bad_logo_url(pool: PgPool) {
    let tree = create_tree(&pool).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, body) = patch(
        &pool,
        &format!("/api/schools/{}/", tree.school),
        &token,
        json!({ "logo_url": "not a url" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["logo_url"][0], "Enter a valid URL.");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_school_with_students_conflicts(pool: PgPool) {
    let tree = create_tree(&pool).await;
    create_student(&pool, tree.class, "Koné", &[]).await;
    let token = login(&pool, &tree.director.email).await;

    let (status, body) = delete(&pool, &format!("/api/schools/{}/", tree.school), &token).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].as_str().unwrap().contains("enrolled students"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_empty_school_cascades_to_levels(pool: PgPool) {
    let admin = create_user(&pool, Role::SuperAdmin, None).await;
    let school = create_school(&pool, &unique_name("School"), None).await;
    create_level(&pool, school, "CP").await;
    let token = login(&pool, &admin.email).await;

    let (status, _) = delete(&pool, &format!("/api/schools/{}/", school), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let levels: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM levels WHERE school_id = $1")
        .bind(school)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(levels, 0);

    let (status, _) = get(&pool, &format!("/api/schools/{}/", school), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
