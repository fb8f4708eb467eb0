// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Account profile endpoints. All routes require a live access token.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::{service, AuthContext};
use crate::error::ApiError;
use crate::models::UserProfile;
use crate::response::success;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/me/password", put(change_password))
        .route("/me", delete(delete_account))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    security(("bearer" = [])),
    responses((status = 200, body = UserProfile)),
    tag = "users"
)]
pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .store
        .read(|db| {
            db.user_by_id(auth.user.id)
                .map(|user| UserProfile::project(user, db.profile_for_user(user.id)))
        })
        .await
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(success("Profile retrieved", profile))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/me/password",
    security(("bearer" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Current password incorrect"),
    ),
    tag = "users"
)]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    service::change_password(&state, auth.user.id, body.current_password, body.new_password)
        .await?;
    Ok(success("Password changed successfully", ()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/me",
    security(("bearer" = [])),
    responses((status = 200, description = "Account deleted")),
    tag = "users"
)]
pub async fn delete_account(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, ApiError> {
    service::delete_account(&state, auth.user.id).await?;
    Ok(success("Account deleted", ()))
}
