use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::credentials::{self, Profile};
use crate::db::models::{Role, User};
use crate::error::AppResult;
use crate::extractors::{ApiJson, CurrentUser};
use crate::response::ApiResponse;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct Registered {
    pub message: &'static str,
    pub user: User,
}

#[derive(Serialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

#[derive(Serialize)]
pub struct LoggedIn {
    pub token: String,
    pub user: SessionUser,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/profile", get(profile))
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<ApiResponse<Registered>> {
    let user = credentials::register(
        &state.db,
        state.config.auth.bcrypt_cost,
        &req.username,
        &req.email,
        &req.password,
    )
    .await?;

    Ok(ApiResponse::created(Registered {
        message: "User registered successfully",
        user,
    }))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<ApiResponse<LoggedIn>> {
    let outcome = credentials::login(&state.db, &state.tokens, &req.email, &req.password).await?;

    Ok(ApiResponse::ok(LoggedIn {
        token: outcome.token,
        user: SessionUser {
            id: outcome.user.id,
            username: outcome.user.username,
            role: outcome.user.role,
        },
    }))
}

/// GET /api/auth/profile
async fn profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<Profile>> {
    let conn = state.db.get()?;
    let profile = credentials::get_profile(&conn, &user.id)?;
    Ok(ApiResponse::ok(profile))
}
