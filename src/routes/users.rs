use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{
        EmailCheckResponse, LoginRequest, LoginResponse, PasswordResetRequest, ProfileDto,
        ProfileUpdate, SignupRequest, SocialLoginRequest, UserNumResponse,
    },
    routes::AppState,
};

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    Ok(Json(state.users.authenticate(&request).await?))
}

pub async fn social_login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SocialLoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    Ok(Json(state.users.social_login(&request).await?))
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> AppResult<&'static str> {
    state.users.register(&request).await?;
    Ok("Registration complete. Please log in.")
}

/// 200 after a reset mail went out, 404 for an unknown email
pub async fn check_email(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> AppResult<(StatusCode, Json<EmailCheckResponse>)> {
    let is_duplicated = state.users.request_password_reset(&email).await?;
    let status = if is_duplicated {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((status, Json(EmailCheckResponse { is_duplicated })))
}

pub async fn password_reset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PasswordResetRequest>,
) -> AppResult<&'static str> {
    state
        .users
        .reset_password(&request.user_email, &request.user_pw)
        .await?;
    Ok("Password has been reset.")
}

pub async fn mypage(user: AuthUser) -> Json<serde_json::Value> {
    Json(json!({ "userName": user.0.name }))
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_num): Path<i32>,
) -> AppResult<Json<ProfileDto>> {
    user.ensure_owner(user_num)?;
    Ok(Json(state.users.lookup_profile(user_num).await?))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_num): Path<i32>,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<ProfileDto>> {
    user.ensure_owner(user_num)?;
    Ok(Json(state.users.update_profile(user_num, &update).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNumQuery {
    user_name: String,
}

pub async fn user_num(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserNumQuery>,
) -> Response {
    match state.users.user_num_by_name(&params.user_name).await {
        Ok(Some(user_num)) => Json(UserNumResponse { user_num }).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "User not found" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "User number lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Error retrieving user number" })),
            )
                .into_response()
        }
    }
}
