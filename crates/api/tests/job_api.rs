//! HTTP-level integration tests for job submission, listing, and
//! cancellation.
//!
//! The executor's poll loop is not running here; jobs stay PENDING, which
//! is exactly what submission and cancellation need.

mod common;

use axum::http::StatusCode;
use common::{
    add_study_member, auth_token, body_json, create_test_study, create_test_user, get_auth,
    post_auth, post_json_auth,
};
use sqlx::PgPool;

/// Seed an admin with a study and return (token, admin_id, study_id).
async fn setup_study(pool: &PgPool) -> (String, i64, i64) {
    let (admin, _) = create_test_user(pool, "jobadmin", 1).await;
    let study = create_test_study(pool, admin.id, "Job Lab").await;
    (auth_token(admin.id, "admin"), admin.id, study.id)
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// POST /jobs creates a PENDING row and publishes the matching event.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_submit_job(pool: PgPool) {
    let (token, admin_id, study_id) = setup_study(&pool).await;

    let (app, bus) = common::build_test_app_with_bus(pool).await;
    let mut events = bus.subscribe();

    let body = serde_json::json!({
        "job_type": "DATA_UPLOAD_CSV",
        "payload": { "file_id": 7, "data_version_id": 3 }
    });
    let response =
        post_json_auth(app, &format!("/api/v1/studies/{study_id}/jobs"), body, &token).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["job_type"], "DATA_UPLOAD_CSV");
    assert_eq!(json["data"]["status_id"], 1); // PENDING
    assert_eq!(json["data"]["requested_by"], admin_id);
    assert_eq!(json["data"]["cancelled"], false);
    assert_eq!(json["data"]["payload"]["file_id"], 7);
    let job_id = json["data"]["id"].as_i64().unwrap();

    let event = events.try_recv().expect("a PENDING event should be published");
    assert_eq!(event.job_id, job_id);
    assert_eq!(event.study_id, study_id);
    assert_eq!(event.job_type, "DATA_UPLOAD_CSV");
    assert_eq!(event.status, "PENDING");
    assert!(event.error.is_empty());
}

/// Unknown job types are accepted; routing is the executor's concern.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_submit_unknown_job_type_accepted(pool: PgPool) {
    let (token, _admin_id, study_id) = setup_study(&pool).await;

    let app = common::build_test_app(pool).await;
    let body = serde_json::json!({ "job_type": "FUTURE_PIPELINE", "payload": {} });
    let response =
        post_json_auth(app, &format!("/api/v1/studies/{study_id}/jobs"), body, &token).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status_id"], 1);
}

/// An empty job_type is rejected.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_submit_empty_job_type(pool: PgPool) {
    let (token, _admin_id, study_id) = setup_study(&pool).await;

    let app = common::build_test_app(pool).await;
    let body = serde_json::json!({ "job_type": "  ", "payload": {} });
    let response =
        post_json_auth(app, &format!("/api/v1/studies/{study_id}/jobs"), body, &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "job_type must not be empty");
}

/// A project_id from another study is rejected with 404.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_submit_cross_study_project(pool: PgPool) {
    let (token, admin_id, study_id) = setup_study(&pool).await;
    let other = create_test_study(&pool, admin_id, "Other Lab").await;
    let project = cohort_db::repositories::ProjectRepo::create(
        &pool,
        other.id,
        admin_id,
        &cohort_db::models::project::CreateProject {
            name: "Elsewhere".into(),
            approved_fields: None,
        },
    )
    .await
    .expect("project creation should succeed");

    let app = common::build_test_app(pool).await;
    let body = serde_json::json!({
        "job_type": "QUERY_EXECUTION",
        "project_id": project.id,
        "payload": {}
    });
    let response =
        post_json_auth(app, &format!("/api/v1/studies/{study_id}/jobs"), body, &token).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Listing / get
// ---------------------------------------------------------------------------

/// GET /jobs lists newest first and honours the status filter.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_list_jobs_with_status_filter(pool: PgPool) {
    let (token, _admin_id, study_id) = setup_study(&pool).await;

    for _ in 0..3 {
        let app = common::build_test_app(pool.clone()).await;
        let body = serde_json::json!({ "job_type": "DATA_UPLOAD_CSV", "payload": {} });
        post_json_auth(app, &format!("/api/v1/studies/{study_id}/jobs"), body, &token).await;
    }

    let app = common::build_test_app(pool.clone()).await;
    let response = get_auth(app, &format!("/api/v1/studies/{study_id}/jobs"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 3);

    // No ERROR jobs exist yet.
    let app = common::build_test_app(pool).await;
    let response = get_auth(
        app,
        &format!("/api/v1/studies/{study_id}/jobs?status_id=4"),
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);
}

/// A job fetched through the wrong study's URL is a 404.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_get_job_cross_study(pool: PgPool) {
    let (token, admin_id, study_id) = setup_study(&pool).await;
    let other = create_test_study(&pool, admin_id, "Other Lab").await;

    let app = common::build_test_app(pool.clone()).await;
    let body = serde_json::json!({ "job_type": "DATA_UPLOAD_CSV", "payload": {} });
    let response =
        post_json_auth(app, &format!("/api/v1/studies/{study_id}/jobs"), body, &token).await;
    let json = body_json(response).await;
    let job_id = json["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool).await;
    let response = get_auth(
        app,
        &format!("/api/v1/studies/{}/jobs/{job_id}", other.id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// The requester can cancel their own PENDING job exactly once.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_cancel_own_job(pool: PgPool) {
    let (token, _admin_id, study_id) = setup_study(&pool).await;

    let app = common::build_test_app(pool.clone()).await;
    let body = serde_json::json!({ "job_type": "DATA_UPLOAD_CSV", "payload": {} });
    let response =
        post_json_auth(app, &format!("/api/v1/studies/{study_id}/jobs"), body, &token).await;
    let json = body_json(response).await;
    let job_id = json["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone()).await;
    let response = post_auth(
        app,
        &format!("/api/v1/studies/{study_id}/jobs/{job_id}/cancel"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let app = common::build_test_app(pool.clone()).await;
    let response = get_auth(
        app,
        &format!("/api/v1/studies/{study_id}/jobs/{job_id}"),
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["cancelled"], true);
    assert!(!json["data"]["cancelled_at"].is_null());

    // A second cancel finds nothing cancellable.
    let app = common::build_test_app(pool).await;
    let response = post_auth(
        app,
        &format!("/api/v1/studies/{study_id}/jobs/{job_id}/cancel"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Only pending jobs can be cancelled");
}

/// Plain members cannot cancel someone else's job; managers can.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_cancel_requires_requester_or_manager(pool: PgPool) {
    let (admin_token, _admin_id, study_id) = setup_study(&pool).await;
    let (member, _) = create_test_user(&pool, "bystander", 2).await;
    let (manager, _) = create_test_user(&pool, "supervisor", 2).await;
    add_study_member(&pool, study_id, member.id, false).await;
    add_study_member(&pool, study_id, manager.id, true).await;

    let app = common::build_test_app(pool.clone()).await;
    let body = serde_json::json!({ "job_type": "DATA_UPLOAD_CSV", "payload": {} });
    let response = post_json_auth(
        app,
        &format!("/api/v1/studies/{study_id}/jobs"),
        body,
        &admin_token,
    )
    .await;
    let json = body_json(response).await;
    let job_id = json["data"]["id"].as_i64().unwrap();

    let member_token = auth_token(member.id, "standard");
    let app = common::build_test_app(pool.clone()).await;
    let response = post_auth(
        app,
        &format!("/api/v1/studies/{study_id}/jobs/{job_id}/cancel"),
        &member_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let manager_token = auth_token(manager.id, "standard");
    let app = common::build_test_app(pool).await;
    let response = post_auth(
        app,
        &format!("/api/v1/studies/{study_id}/jobs/{job_id}/cancel"),
        &manager_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
