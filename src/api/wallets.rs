// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Wallet endpoints: KYC onboarding, wallet setup and money movement.
//! All routes require a live access token.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{service as auth_service, AuthContext};
use crate::error::ApiError;
use crate::ledger;
use crate::models::{PartyDetails, SettlementAccount};
use crate::response::{created, success};
use crate::state::AppState;
use crate::token::KycSubmission;

use super::transactions;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_wallet))
        .route("/bvn", post(initiate_bvn))
        .route("/bvn/verify", post(verify_bvn))
        .route("/pin", post(set_pin))
        .route("/settlement-account", post(set_settlement_account))
        .route("/name-enquiry/{account_number}", get(name_enquiry))
        .route("/fund", post(fund))
        .route("/{wallet_id}/transfer", post(transfer))
        .route("/{wallet_id}/withdraw", post(withdraw))
        .route(
            "/{wallet_id}/transactions/history",
            get(transactions::history),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPinRequest {
    pub transaction_pin: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FundRequest {
    pub amount: Decimal,
    pub sender_account_details: Option<PartyDetails>,
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BvnChallengeAnswer {
    pub verification_token: String,
    pub otp: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/wallets",
    security(("bearer" = [])),
    responses(
        (status = 200, body = crate::models::Wallet),
        (status = 404, description = "No wallet yet, complete KYC first"),
    ),
    tag = "wallets"
)]
pub async fn get_wallet(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, ApiError> {
    let wallet = ledger::get_wallet(&state, auth.user.id).await?;
    Ok(success("Wallet retrieved", wallet))
}

#[utoipa::path(
    post,
    path = "/api/v1/wallets/bvn",
    security(("bearer" = [])),
    request_body = KycSubmission,
    responses(
        (status = 200, description = "BVN challenge issued", body = auth_service::ChallengeOutcome),
        (status = 400, description = "Already verified or invalid submission"),
    ),
    tag = "wallets"
)]
pub async fn initiate_bvn(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<KycSubmission>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome =
        auth_service::initiate_bvn_verification(&state, &auth.user, &auth.session, body).await?;
    Ok(success("Verification code sent to your email", outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/wallets/bvn/verify",
    security(("bearer" = [])),
    request_body = BvnChallengeAnswer,
    responses(
        (status = 201, description = "KYC completed, wallet provisioned", body = crate::models::UserProfile),
        (status = 400, description = "Wrong code or BVN record mismatch"),
    ),
    tag = "wallets"
)]
pub async fn verify_bvn(
    State(state): State<AppState>,
    _auth: AuthContext,
    Json(body): Json<BvnChallengeAnswer>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = auth_service::verify_bvn(&state, body.verification_token, body.otp).await?;
    Ok(created("Identity verified, wallet created", profile))
}

#[utoipa::path(
    post,
    path = "/api/v1/wallets/pin",
    security(("bearer" = [])),
    request_body = SetPinRequest,
    responses(
        (status = 200, description = "Pin set"),
        (status = 400, description = "Pin already set or malformed"),
    ),
    tag = "wallets"
)]
pub async fn set_pin(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<SetPinRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ledger::set_transaction_pin(&state, auth.user.id, body.transaction_pin).await?;
    Ok(success("Transaction pin set", ()))
}

#[utoipa::path(
    post,
    path = "/api/v1/wallets/settlement-account",
    security(("bearer" = [])),
    request_body = SettlementAccount,
    responses(
        (status = 200, description = "Settlement account set"),
        (status = 400, description = "Already set or malformed"),
    ),
    tag = "wallets"
)]
pub async fn set_settlement_account(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<SettlementAccount>,
) -> Result<impl IntoResponse, ApiError> {
    ledger::set_settlement_account(&state, auth.user.id, body).await?;
    Ok(success("Settlement account set", ()))
}

#[utoipa::path(
    get,
    path = "/api/v1/wallets/name-enquiry/{account_number}",
    security(("bearer" = [])),
    params(("account_number" = String, Path, description = "Wallet account number")),
    responses(
        (status = 200, body = crate::models::PartyDetails),
        (status = 404, description = "Unknown account number"),
    ),
    tag = "wallets"
)]
pub async fn name_enquiry(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(account_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let party = ledger::name_enquiry(&state, &account_number).await?;
    Ok(success("Account resolved", party))
}

#[utoipa::path(
    post,
    path = "/api/v1/wallets/fund",
    security(("bearer" = [])),
    request_body = FundRequest,
    responses(
        (status = 200, description = "Wallet credited", body = crate::models::Transaction),
    ),
    tag = "wallets"
)]
pub async fn fund(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<FundRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let leg = ledger::fund(
        &state,
        auth.user.id,
        body.amount,
        body.sender_account_details,
        body.remark,
    )
    .await?;
    Ok(success("Wallet funded", leg))
}

#[utoipa::path(
    post,
    path = "/api/v1/wallets/{wallet_id}/transfer",
    security(("bearer" = [])),
    params(("wallet_id" = Uuid, Path, description = "The caller's wallet id")),
    request_body = ledger::TransferOrder,
    responses(
        (status = 200, description = "Transfer completed", body = crate::models::Transaction),
        (status = 400, description = "Insufficient funds, wrong pin or inactive wallet"),
        (status = 404, description = "Foreign wallet id or receiver account not found"),
    ),
    tag = "wallets"
)]
pub async fn transfer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(wallet_id): Path<Uuid>,
    Json(body): Json<ledger::TransferOrder>,
) -> Result<impl IntoResponse, ApiError> {
    ledger::ensure_wallet_owner(&state, auth.user.id, wallet_id).await?;
    let leg = ledger::transfer(&state, auth.user.id, body).await?;
    Ok(success("Transfer successful", leg))
}

#[utoipa::path(
    post,
    path = "/api/v1/wallets/{wallet_id}/withdraw",
    security(("bearer" = [])),
    params(("wallet_id" = Uuid, Path, description = "The caller's wallet id")),
    request_body = ledger::WithdrawalOrder,
    responses(
        (status = 200, description = "Withdrawal initiated", body = crate::models::Transaction),
        (status = 400, description = "Insufficient funds, wrong pin or no settlement account"),
        (status = 404, description = "Foreign wallet id"),
    ),
    tag = "wallets"
)]
pub async fn withdraw(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(wallet_id): Path<Uuid>,
    Json(body): Json<ledger::WithdrawalOrder>,
) -> Result<impl IntoResponse, ApiError> {
    ledger::ensure_wallet_owner(&state, auth.user.id, wallet_id).await?;
    let leg = ledger::withdraw(&state, auth.user.id, body).await?;
    Ok(success("Withdrawal initiated", leg))
}
