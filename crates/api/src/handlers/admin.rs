//! Handlers for the `/admin/users` resource.
//!
//! All endpoints require the `admin` role via [`RequireAdmin`]. Passwords
//! never travel past this module: requests carry plaintext, the database
//! stores Argon2id PHC strings.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cohort_core::error::CoreError;
use cohort_core::types::DbId;
use cohort_db::models::user::{CreateUser, UpdateUser, User, UserResponse};
use cohort_db::repositories::{RoleRepo, UserRepo};
use serde::Deserialize;

use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Minimum password length accepted for new and reset passwords.
const MIN_PASSWORD_LENGTH: usize = 12;

// ---------------------------------------------------------------------------
// Request types / helpers
// ---------------------------------------------------------------------------

/// Request body for `POST /admin/users`. Carries the plaintext password;
/// hashing happens here before the repository sees it.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role_id: DbId,
    pub organisation: Option<String>,
    pub description: Option<String>,
}

/// Request body for `POST /admin/users/{id}/reset-password`.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Build the safe API representation of a user row.
pub fn to_user_response(user: User, role: String) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        role,
        role_id: user.role_id,
        organisation: user.organisation,
        is_active: user.is_active,
        last_login_at: user.last_login_at,
        created_at: user.created_at,
    }
}

/// Role id -> name map for list responses, one query instead of N.
async fn role_names(pool: &cohort_db::DbPool) -> AppResult<HashMap<DbId, String>> {
    let roles = RoleRepo::list(pool).await?;
    Ok(roles.into_iter().map(|r| (r.id, r.name)).collect())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/users
///
/// List all users, including deactivated ones.
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let names = role_names(&state.pool).await?;
    let users = UserRepo::list(&state.pool).await?;

    let data = users
        .into_iter()
        .map(|u| {
            let role = names.get(&u.role_id).cloned().unwrap_or_else(|| "unknown".into());
            to_user_response(u, role)
        })
        .collect();

    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/admin/users
///
/// Create a user. Returns 201 with the created user.
pub async fn create_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    if input.username.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Username must not be empty".into(),
        )));
    }
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    if RoleRepo::find_by_id(&state.pool, input.role_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Role",
            id: input.role_id,
        }));
    }

    // Pre-check for a clean message; the unique indexes still defend
    // against races.
    if UserRepo::find_by_username(&state.pool, &input.username).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "Username already in use".into(),
        )));
    }
    if UserRepo::find_by_email(&state.pool, &input.email).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "Email already in use".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username,
            email: input.email,
            password_hash,
            role_id: input.role_id,
            organisation: input.organisation,
            description: input.description,
        },
    )
    .await?;

    tracing::info!(
        user_id = user.id,
        username = %user.username,
        created_by = admin.user_id,
        "User created",
    );

    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: to_user_response(user, role) }),
    ))
}

/// GET /api/v1/admin/users/{id}
pub async fn get_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok(Json(DataResponse { data: to_user_response(user, role) }))
}

/// PUT /api/v1/admin/users/{id}
///
/// Update email, role, organisation, description, or active flag.
pub async fn update_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUser>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    if let Some(role_id) = input.role_id {
        if RoleRepo::find_by_id(&state.pool, role_id).await?.is_none() {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Role",
                id: role_id,
            }));
        }
    }

    let user = UserRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    tracing::info!(user_id = id, updated_by = admin.user_id, "User updated");

    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok(Json(DataResponse { data: to_user_response(user, role) }))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Deactivate a user. Rows are never deleted; historical jobs and uploads
/// keep their `requested_by` references. Returns 204.
pub async fn deactivate_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(AppError::Core(CoreError::Validation(
            "Cannot deactivate your own account".into(),
        )));
    }

    let deactivated = UserRepo::deactivate(&state.pool, id).await?;
    if !deactivated {
        return Err(AppError::Core(CoreError::NotFound { entity: "User", id }));
    }

    tracing::info!(user_id = id, deactivated_by = admin.user_id, "User deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/users/{id}/reset-password
///
/// Replace a user's password. Returns 204.
pub async fn reset_password(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let updated = UserRepo::update_password(&state.pool, id, &password_hash).await?;
    if !updated {
        return Err(AppError::Core(CoreError::NotFound { entity: "User", id }));
    }

    tracing::info!(user_id = id, reset_by = admin.user_id, "Password reset");
    Ok(StatusCode::NO_CONTENT)
}
