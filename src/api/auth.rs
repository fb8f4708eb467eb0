// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Authentication endpoints.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::{service, AuthContext};
use crate::error::ApiError;
use crate::response::{created, success};
use crate::state::AppState;

use super::DeviceInfo;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/resend-verification", post(resend_verification))
        .route("/verify-email", post(verify_email))
        .route("/initiate-auth", post(initiate_auth))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh))
        .route("/logout", delete(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/forgot-password/verify", post(verify_forgot_password))
        .route("/reset-password", post(reset_password))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub phone: String,
    pub password: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChallengeAnswer {
    pub verification_token: String,
    pub otp: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub verification_token: String,
    pub new_password: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, verification OTP emailed", body = service::SignupOutcome),
        (status = 400, description = "Invalid input or blacklisted identity"),
        (status = 409, description = "Email or phone already registered"),
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    DeviceInfo(device): DeviceInfo,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = service::signup(
        &state,
        body.email,
        body.phone,
        body.password,
        body.timezone,
        device,
    )
    .await?;
    Ok(created("Account created successfully", outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/resend-verification",
    request_body = EmailRequest,
    responses((status = 200, body = service::ChallengeOutcome)),
    tag = "auth"
)]
pub async fn resend_verification(
    State(state): State<AppState>,
    DeviceInfo(device): DeviceInfo,
    Json(body): Json<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = service::resend_email_verification(&state, body.email, device).await?;
    Ok(success("Verification code sent", outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-email",
    request_body = ChallengeAnswer,
    responses(
        (status = 200, description = "Email verified", body = crate::models::UserProfile),
        (status = 400, description = "Wrong or expired code"),
    ),
    tag = "auth"
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<ChallengeAnswer>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = service::verify_email(&state, body.verification_token, body.otp).await?;
    Ok(success("Email verified successfully", profile))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/initiate-auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, login OTP emailed", body = service::ChallengeOutcome),
        (status = 400, description = "Invalid credentials"),
    ),
    tag = "auth"
)]
pub async fn initiate_auth(
    State(state): State<AppState>,
    DeviceInfo(device): DeviceInfo,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = service::initiate_auth(&state, body.email, body.password, device).await?;
    Ok(success("Login code sent to your email", outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = ChallengeAnswer,
    responses(
        (status = 200, description = "Logged in", body = service::LoginOutcome),
        (status = 400, description = "Wrong or expired code"),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<ChallengeAnswer>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = service::login(&state, body.verification_token, body.otp).await?;
    Ok(success("Login successful", outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh-token",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Access token rotated", body = service::RefreshOutcome),
        (status = 401, description = "Invalid or expired refresh token"),
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = service::refresh(&state, body.refresh_token).await?;
    Ok(success("Token refreshed", outcome))
}

#[utoipa::path(
    delete,
    path = "/api/v1/auth/logout",
    security(("bearer" = [])),
    responses((status = 200, description = "Session ended")),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, ApiError> {
    service::logout(&state, auth.user.id, auth.session.id).await?;
    Ok(success("Logged out successfully", ()))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    request_body = EmailRequest,
    responses((status = 200, description = "Reset code sent if the account exists")),
    tag = "auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    DeviceInfo(device): DeviceInfo,
    Json(body): Json<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = service::forgot_password(&state, body.email, device).await?;
    // Identical message whether or not the account exists
    Ok(success(
        "If the email is registered, a reset code has been sent",
        outcome,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password/verify",
    request_body = ChallengeAnswer,
    responses(
        (status = 200, description = "Code accepted, reset token issued", body = service::ChallengeOutcome),
        (status = 400, description = "Wrong or expired code"),
    ),
    tag = "auth"
)]
pub async fn verify_forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ChallengeAnswer>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome =
        service::verify_forgot_password(&state, body.verification_token, body.otp).await?;
    Ok(success("Code verified", outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 401, description = "Reset token invalid or not OTP-verified"),
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    service::reset_password(&state, body.verification_token, body.new_password).await?;
    Ok(success("Password reset successfully", ()))
}
