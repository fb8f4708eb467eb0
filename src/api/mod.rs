// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! # HTTP API
//!
//! Route tree, OpenAPI document and the device-identity extractor.
//!
//! | Prefix | Module |
//! |--------|--------|
//! | `/api/v1/auth` | [`auth`] |
//! | `/api/v1/users` | [`users`] |
//! | `/api/v1/wallets` | [`wallets`] |
//! | `/api/v1/transactions` | [`transactions`] |
//!
//! Interactive docs are served at `/docs`.

pub mod auth;
pub mod transactions;
pub mod users;
pub mod wallets;

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::service::DeviceContext;
use crate::response::success;
use crate::state::AppState;

/// Device identity from request headers. Missing headers degrade to
/// placeholders rather than rejecting the request.
pub struct DeviceInfo(pub DeviceContext);

impl<S: Send + Sync> FromRequestParts<S> for DeviceInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str, fallback: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or(fallback)
                .to_string()
        };
        Ok(DeviceInfo(DeviceContext {
            device_id: header("x-device-id", "unknown"),
            ip_address: header("x-forwarded-for", "0.0.0.0")
                .split(',')
                .next()
                .unwrap_or("0.0.0.0")
                .trim()
                .to_string(),
            user_agent: header("user-agent", "unknown"),
        }))
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "health"
)]
async fn health() -> impl IntoResponse {
    success("OK", serde_json::json!({ "status": "up" }))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        auth::signup,
        auth::resend_verification,
        auth::verify_email,
        auth::initiate_auth,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::forgot_password,
        auth::verify_forgot_password,
        auth::reset_password,
        users::me,
        users::change_password,
        users::delete_account,
        wallets::get_wallet,
        wallets::set_pin,
        wallets::set_settlement_account,
        wallets::name_enquiry,
        wallets::fund,
        wallets::initiate_bvn,
        wallets::verify_bvn,
        wallets::transfer,
        wallets::withdraw,
        transactions::history,
        transactions::get_one,
    ),
    components(schemas(
        crate::models::UserProfile,
        crate::models::AuthenticatedUser,
        crate::models::Wallet,
        crate::models::Transaction,
        crate::models::SettlementAccount,
        crate::models::PartyDetails,
        crate::auth::service::SignupOutcome,
        crate::auth::service::ChallengeOutcome,
        crate::auth::service::LoginOutcome,
        crate::auth::service::RefreshOutcome,
        crate::ledger::TransferOrder,
        crate::ledger::WithdrawalOrder,
        crate::store::transactions::TransactionPage,
        crate::token::KycSubmission,
        auth::SignupRequest,
        auth::EmailRequest,
        auth::ChallengeAnswer,
        auth::LoginRequest,
        auth::RefreshRequest,
        auth::ResetPasswordRequest,
        users::ChangePasswordRequest,
        wallets::SetPinRequest,
        wallets::FundRequest,
        wallets::BvnChallengeAnswer,
    )),
    tags(
        (name = "auth", description = "Signup, login and verification flows"),
        (name = "users", description = "Account profile operations"),
        (name = "wallets", description = "Wallet setup and money movement"),
        (name = "transactions", description = "Ledger history"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

/// The full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/auth", auth::routes())
        .nest("/api/v1/users", users::routes())
        .nest("/api/v1/wallets", wallets::routes())
        .nest("/api/v1/transactions", transactions::routes())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
