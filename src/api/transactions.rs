// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Ledger history endpoints. The paginated listing is mounted under the
//! wallet router at `/wallets/{wallet_id}/transactions/history`.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::ledger;
use crate::response::success;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/{id}", get(get_one))
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[utoipa::path(
    get,
    path = "/api/v1/wallets/{wallet_id}/transactions/history",
    security(("bearer" = [])),
    params(
        ("wallet_id" = Uuid, Path, description = "The caller's wallet id"),
        HistoryQuery,
    ),
    responses(
        (status = 200, body = crate::store::transactions::TransactionPage),
        (status = 404, description = "No wallet yet or foreign wallet id"),
    ),
    tag = "transactions"
)]
pub async fn history(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(wallet_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    ledger::ensure_wallet_owner(&state, auth.user.id, wallet_id).await?;
    let limit = query.limit.clamp(1, 100);
    let page = ledger::history(&state, auth.user.id, query.page, limit).await?;
    Ok(success("Transactions retrieved", page))
}

#[utoipa::path(
    get,
    path = "/api/v1/transactions/{id}",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, body = crate::models::Transaction),
        (status = 404, description = "Unknown or foreign transaction"),
    ),
    tag = "transactions"
)]
pub async fn get_one(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction = ledger::get_transaction(&state, auth.user.id, id).await?;
    Ok(success("Transaction retrieved", transaction))
}
