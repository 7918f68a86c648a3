//! HTTP-level integration tests for saved cohort queries.
//!
//! Saving a query must also spawn its QUERY_EXECUTION job; the executor is
//! not running here, so the job stays PENDING and the query stays SAVED.

mod common;

use axum::http::StatusCode;
use common::{auth_token, body_json, create_test_study, create_test_user, get_auth, post_json_auth};
use sqlx::PgPool;

/// Seed an admin with a study and return (token, admin_id, study_id).
async fn setup_study(pool: &PgPool) -> (String, i64, i64) {
    let (admin, _) = create_test_user(pool, "queryadmin", 1).await;
    let study = create_test_study(pool, admin.id, "Query Lab").await;
    (auth_token(admin.id, "admin"), admin.id, study.id)
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /queries saves the row and spawns a QUERY_EXECUTION job carrying
/// the query id.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_query_spawns_job(pool: PgPool) {
    let (token, _admin_id, study_id) = setup_study(&pool).await;

    let app = common::build_test_app(pool.clone()).await;
    let body = serde_json::json!({
        "name": "Adults over 60",
        "query": { "field": "AGE", "op": "gt", "value": 60 }
    });
    let response =
        post_json_auth(app, &format!("/api/v1/studies/{study_id}/queries"), body, &token).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["query"]["name"], "Adults over 60");
    assert_eq!(json["data"]["query"]["status_id"], 1); // SAVED
    assert!(json["data"]["query"]["result"].is_null());
    let query_id = json["data"]["query"]["id"].as_i64().unwrap();
    let job_id = json["data"]["job_id"].as_i64().unwrap();

    // The spawned job is visible through the jobs API, PENDING, with the
    // query id in its payload.
    let app = common::build_test_app(pool).await;
    let response = get_auth(
        app,
        &format!("/api/v1/studies/{study_id}/jobs/{job_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["job_type"], "QUERY_EXECUTION");
    assert_eq!(json["data"]["status_id"], 1);
    assert_eq!(json["data"]["payload"]["query_id"], query_id);
}

/// The query document must be a JSON object.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_query_rejects_non_object(pool: PgPool) {
    let (token, _admin_id, study_id) = setup_study(&pool).await;

    let app = common::build_test_app(pool).await;
    let body = serde_json::json!({ "name": "Bad", "query": [1, 2, 3] });
    let response =
        post_json_auth(app, &format!("/api/v1/studies/{study_id}/queries"), body, &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "query must be a JSON object");
}

/// An empty name is rejected.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_query_rejects_empty_name(pool: PgPool) {
    let (token, _admin_id, study_id) = setup_study(&pool).await;

    let app = common::build_test_app(pool).await;
    let body = serde_json::json!({ "name": "", "query": {} });
    let response =
        post_json_auth(app, &format!("/api/v1/studies/{study_id}/queries"), body, &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// List / get
// ---------------------------------------------------------------------------

/// Queries list per study and resolve by id within their study only.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_list_and_get_queries(pool: PgPool) {
    let (token, admin_id, study_id) = setup_study(&pool).await;
    let other = create_test_study(&pool, admin_id, "Other Lab").await;

    let app = common::build_test_app(pool.clone()).await;
    let body = serde_json::json!({ "name": "Q1", "query": {} });
    let response =
        post_json_auth(app, &format!("/api/v1/studies/{study_id}/queries"), body, &token).await;
    let json = body_json(response).await;
    let query_id = json["data"]["query"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone()).await;
    let response = get_auth(app, &format!("/api/v1/studies/{study_id}/queries"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let app = common::build_test_app(pool.clone()).await;
    let response = get_auth(
        app,
        &format!("/api/v1/studies/{study_id}/queries/{query_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "Q1");

    // The same query through the other study's URL is a 404.
    let app = common::build_test_app(pool).await;
    let response = get_auth(
        app,
        &format!("/api/v1/studies/{}/queries/{query_id}", other.id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
