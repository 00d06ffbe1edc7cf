//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use shared::{ApiResponse, User};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::auth::{AuthResponse, LoginInput, RegisterInput};
use crate::services::AuthService;
use crate::AppState;

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Register endpoint handler
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    let auth_service = AuthService::new(state.db.clone(), state.keys.clone());
    let result = auth_service.register(body).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(result).with_message("Account created")),
    ))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let auth_service = AuthService::new(state.db.clone(), state.keys.clone());
    let result = auth_service.login(body).await?;

    Ok(Json(ApiResponse::ok(result)))
}

/// Refresh token endpoint handler
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let auth_service = AuthService::new(state.db.clone(), state.keys.clone());
    let result = auth_service.refresh(&body.refresh_token).await?;

    Ok(Json(ApiResponse::ok(result)))
}

/// Current user endpoint handler
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let auth_service = AuthService::new(state.db.clone(), state.keys.clone());
    let user = auth_service.get_user(user.user_id).await?;

    Ok(Json(ApiResponse::ok(user)))
}
