// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! # Ledger Engine
//!
//! Wallet operations and money movement. Every movement writes immutable
//! ledger legs and updates wallet balances in one storage transaction,
//! so either both legs and both balances commit or nothing does.
//!
//! Leg arithmetic:
//!
//! * debit leg: `closing = opening - amount - fee`
//! * credit leg: `closing = opening + amount`
//!
//! A wallet's balance always equals the closing balance of its most
//! recent leg. Pin checks, status checks and the affordability check all
//! run inside the same transaction as the balance mutation, so a
//! concurrent spend cannot slip between check and debit.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    PartyDetails, SettlementAccount, Transaction, TransactionChannel, TransactionMetadata,
    TransactionStatus, TransactionType, Wallet, WalletStatus,
};
use crate::state::AppState;
use crate::store::database::Database;
use crate::store::transactions::TransactionPage;

/// Institution code prefixing every trace id.
const INSTITUTION_CODE: &str = "000000";

/// External counterparty used on funding legs.
const FUNDING_SOURCE_NAME: &str = "Demo Bank";
const FUNDING_SOURCE_ACCOUNT: &str = "0000000000";

/// A wallet-to-wallet transfer order.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferOrder {
    pub receiver_account_number: String,
    pub amount: Decimal,
    pub remark: Option<String>,
    pub transaction_pin: String,
}

/// A withdrawal to the configured settlement account.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WithdrawalOrder {
    pub amount: Decimal,
    pub remark: Option<String>,
    pub transaction_pin: String,
}

/// Transfer and withdrawal fee by amount tier.
pub fn movement_fee(amount: Decimal) -> Decimal {
    if amount <= dec!(5000) {
        dec!(10)
    } else if amount <= dec!(50000) {
        dec!(25)
    } else {
        dec!(50)
    }
}

fn validate_amount(amount: Decimal) -> Result<(), ApiError> {
    if amount <= Decimal::ZERO {
        return Err(ApiError::validation("Amount must be greater than zero"));
    }
    if amount.scale() > 2 {
        return Err(ApiError::validation(
            "Amount cannot have more than two decimal places",
        ));
    }
    Ok(())
}

fn validate_pin_format(pin: &str) -> Result<(), ApiError> {
    if pin.len() == 4 && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ApiError::validation("Transaction pin must be 4 digits"))
    }
}

/// Globally unique trace id for one ledger leg: institution code,
/// timestamp, store serial, random tail. Every leg gets its own.
fn generate_trace_id(db: &mut Database, now: DateTime<Utc>) -> String {
    let serial = db.next_trace_serial() % 1_000_000;
    let random: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!(
        "{INSTITUTION_CODE}{}{serial:06}{random:06}",
        now.format("%y%m%d%H%M%S")
    )
}

fn party_of(wallet: &Wallet) -> PartyDetails {
    PartyDetails {
        account_name: wallet.account_name.clone(),
        account_number: wallet.account_number.clone(),
    }
}

fn active_wallet_for_user(db: &Database, user_id: Uuid) -> Result<Wallet, ApiError> {
    let wallet = db
        .wallet_for_user(user_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Wallet not found"))?;
    if wallet.status != WalletStatus::Active {
        return Err(ApiError::state_conflict("Wallet is not active"));
    }
    Ok(wallet)
}

fn check_pin(state: &AppState, wallet: &Wallet, pin: &str) -> Result<(), ApiError> {
    let stored = wallet
        .transaction_pin
        .as_deref()
        .ok_or_else(|| ApiError::state_conflict("Transaction pin not set"))?;
    if !state.hasher.verify_pin(pin, stored) {
        return Err(ApiError::state_conflict("Invalid transaction pin"));
    }
    Ok(())
}

/// The caller's wallet.
pub async fn get_wallet(state: &AppState, user_id: Uuid) -> Result<Wallet, ApiError> {
    state
        .store
        .read(|db| db.wallet_for_user(user_id).cloned())
        .await
        .ok_or_else(|| ApiError::not_found("Wallet not found"))
}

/// Check that a path-addressed wallet belongs to the caller. Foreign and
/// unknown ids read the same as having no wallet.
pub async fn ensure_wallet_owner(
    state: &AppState,
    user_id: Uuid,
    wallet_id: Uuid,
) -> Result<(), ApiError> {
    let owned = state
        .store
        .read(|db| db.wallet_for_user(user_id).map(|w| w.id))
        .await
        .ok_or_else(|| ApiError::not_found("Wallet not found"))?;
    if owned != wallet_id {
        return Err(ApiError::not_found("Wallet not found"));
    }
    Ok(())
}

/// Resolve an account number to its holder's details.
pub async fn name_enquiry(
    state: &AppState,
    account_number: &str,
) -> Result<PartyDetails, ApiError> {
    state
        .store
        .read(|db| db.wallet_by_account_number(account_number).map(party_of))
        .await
        .ok_or_else(|| ApiError::not_found("Account not found"))
}

/// Set the transaction pin. One-shot; an existing pin is never
/// overwritten through this path.
pub async fn set_transaction_pin(
    state: &AppState,
    user_id: Uuid,
    pin: String,
) -> Result<(), ApiError> {
    validate_pin_format(&pin)?;
    let hashed = state.hasher.hash_pin(&pin);
    state
        .store
        .transaction(move |db| {
            let wallet = db
                .wallet_for_user_mut(user_id)
                .ok_or_else(|| ApiError::not_found("Wallet not found"))?;
            if wallet.is_transaction_pin_set {
                return Err(ApiError::state_conflict("Transaction pin already set"));
            }
            wallet.transaction_pin = Some(hashed);
            wallet.is_transaction_pin_set = true;
            wallet.updated_at = Utc::now();
            Ok(())
        })
        .await
}

/// Set the settlement account. Also one-shot.
pub async fn set_settlement_account(
    state: &AppState,
    user_id: Uuid,
    account: SettlementAccount,
) -> Result<(), ApiError> {
    if account.account_number.len() != 10
        || !account.account_number.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ApiError::validation(
            "A valid 10-digit settlement account number is required",
        ));
    }
    if account.account_name.trim().is_empty() || account.bank_code.trim().is_empty() {
        return Err(ApiError::validation(
            "Settlement account name and bank code are required",
        ));
    }

    state
        .store
        .transaction(move |db| {
            let wallet = db
                .wallet_for_user_mut(user_id)
                .ok_or_else(|| ApiError::not_found("Wallet not found"))?;
            if wallet.is_settlement_account_set {
                return Err(ApiError::state_conflict("Settlement account already set"));
            }
            wallet.settlement_account_name = Some(account.account_name);
            wallet.settlement_account_number = Some(account.account_number);
            wallet.settlement_bank_code = Some(account.bank_code);
            wallet.is_settlement_account_set = true;
            wallet.updated_at = Utc::now();
            Ok(())
        })
        .await
}

/// Credit the caller's wallet from an external source. No fee; the
/// credit leg settles immediately. Callers may name the sending
/// account, otherwise the simulated bank is recorded.
pub async fn fund(
    state: &AppState,
    user_id: Uuid,
    amount: Decimal,
    sender: Option<PartyDetails>,
    remark: Option<String>,
) -> Result<Transaction, ApiError> {
    validate_amount(amount)?;
    let now = Utc::now();

    let (leg, email) = state
        .store
        .transaction(move |db| {
            let wallet = active_wallet_for_user(db, user_id)?;
            let email = db
                .user_by_id(user_id)
                .map(|u| u.email.clone())
                .ok_or_else(|| ApiError::internal("Wallet owner missing"))?;

            let opening = wallet.balance;
            let closing = opening + amount;
            let trace = generate_trace_id(db, now);

            let leg = Transaction {
                id: Uuid::new_v4(),
                wallet_id: wallet.id,
                user_id,
                amount,
                fee: Decimal::ZERO,
                opening_balance: opening,
                closing_balance: closing,
                currency: wallet.currency.clone(),
                channel: TransactionChannel::BankTransfer,
                kind: TransactionType::Credit,
                status: TransactionStatus::Completed,
                session_id: trace,
                remark: remark.unwrap_or_else(|| "Wallet funding".to_string()),
                metadata: TransactionMetadata {
                    sender: sender.unwrap_or_else(|| PartyDetails {
                        account_name: FUNDING_SOURCE_NAME.to_string(),
                        account_number: FUNDING_SOURCE_ACCOUNT.to_string(),
                    }),
                    receiver: party_of(&wallet),
                },
                settlement_date: Some(now),
                created_at: now,
            };

            let stored = db
                .wallet_by_id_mut(wallet.id)
                .ok_or_else(|| ApiError::internal("Wallet disappeared"))?;
            stored.balance = closing;
            stored.updated_at = now;
            db.record_transaction(leg.clone());
            Ok((leg, email))
        })
        .await?;

    state
        .mailer
        .send_receipt(
            &email,
            "Wallet funded",
            &format!("Your wallet was credited with {} {}.", leg.currency, amount),
        )
        .await;
    Ok(leg)
}

/// Move money to another wallet. Writes a debit leg for the sender and a
/// credit leg for the receiver atomically. The legs share metadata but
/// each carries its own trace id.
pub async fn transfer(
    state: &AppState,
    user_id: Uuid,
    order: TransferOrder,
) -> Result<Transaction, ApiError> {
    validate_amount(order.amount)?;
    let amount = order.amount;
    let fee = movement_fee(amount);
    let now = Utc::now();

    let (debit_leg, sender_email, receiver_email) = {
        let state_ref = state.clone();
        state
            .store
            .transaction(move |db| {
                let sender = active_wallet_for_user(db, user_id)?;
                check_pin(&state_ref, &sender, &order.transaction_pin)?;

                let receiver = db
                    .wallet_by_account_number(&order.receiver_account_number)
                    .cloned()
                    .ok_or_else(|| ApiError::not_found("Receiver account not found"))?;
                if receiver.id == sender.id {
                    return Err(ApiError::validation("Cannot transfer to your own wallet"));
                }
                if receiver.status != WalletStatus::Active {
                    return Err(ApiError::state_conflict("Receiver wallet is not active"));
                }

                let total = amount + fee;
                if sender.balance < total {
                    return Err(ApiError::state_conflict("Insufficient funds"));
                }

                let sender_email = db
                    .user_by_id(sender.user_id)
                    .map(|u| u.email.clone())
                    .ok_or_else(|| ApiError::internal("Wallet owner missing"))?;
                let receiver_email = db
                    .user_by_id(receiver.user_id)
                    .map(|u| u.email.clone())
                    .ok_or_else(|| ApiError::internal("Wallet owner missing"))?;

                let debit_trace = generate_trace_id(db, now);
                let credit_trace = generate_trace_id(db, now);
                let remark = order
                    .remark
                    .unwrap_or_else(|| "Wallet transfer".to_string());
                let metadata = TransactionMetadata {
                    sender: party_of(&sender),
                    receiver: party_of(&receiver),
                };

                let debit = Transaction {
                    id: Uuid::new_v4(),
                    wallet_id: sender.id,
                    user_id: sender.user_id,
                    amount,
                    fee,
                    opening_balance: sender.balance,
                    closing_balance: sender.balance - total,
                    currency: sender.currency.clone(),
                    channel: TransactionChannel::Wallet,
                    kind: TransactionType::Debit,
                    status: TransactionStatus::Completed,
                    session_id: debit_trace,
                    remark: remark.clone(),
                    metadata: metadata.clone(),
                    settlement_date: Some(now),
                    created_at: now,
                };
                let credit = Transaction {
                    id: Uuid::new_v4(),
                    wallet_id: receiver.id,
                    user_id: receiver.user_id,
                    amount,
                    fee: Decimal::ZERO,
                    opening_balance: receiver.balance,
                    closing_balance: receiver.balance + amount,
                    currency: receiver.currency.clone(),
                    channel: TransactionChannel::Wallet,
                    kind: TransactionType::Credit,
                    status: TransactionStatus::Completed,
                    session_id: credit_trace,
                    remark,
                    metadata,
                    settlement_date: Some(now),
                    created_at: now,
                };

                let sender_stored = db
                    .wallet_by_id_mut(sender.id)
                    .ok_or_else(|| ApiError::internal("Wallet disappeared"))?;
                sender_stored.balance = debit.closing_balance;
                sender_stored.updated_at = now;
                let receiver_stored = db
                    .wallet_by_id_mut(receiver.id)
                    .ok_or_else(|| ApiError::internal("Wallet disappeared"))?;
                receiver_stored.balance = credit.closing_balance;
                receiver_stored.updated_at = now;

                db.record_transaction(debit.clone());
                db.record_transaction(credit);
                Ok((debit, sender_email, receiver_email))
            })
            .await?
    };

    let currency = debit_leg.currency.clone();
    state
        .mailer
        .send_receipt(
            &sender_email,
            "Transfer sent",
            &format!(
                "You sent {currency} {amount} to {}.",
                debit_leg.metadata.receiver.account_name
            ),
        )
        .await;
    state
        .mailer
        .send_receipt(
            &receiver_email,
            "Transfer received",
            &format!(
                "You received {currency} {amount} from {}.",
                debit_leg.metadata.sender.account_name
            ),
        )
        .await;

    tracing::info!(trace = %debit_leg.session_id, %amount, "transfer completed");
    Ok(debit_leg)
}

/// Move money out to the settlement account. Single pending debit leg;
/// settlement is asynchronous and out of scope here.
pub async fn withdraw(
    state: &AppState,
    user_id: Uuid,
    order: WithdrawalOrder,
) -> Result<Transaction, ApiError> {
    validate_amount(order.amount)?;
    let amount = order.amount;
    let fee = movement_fee(amount);
    let now = Utc::now();

    let (leg, email) = {
        let state_ref = state.clone();
        state
            .store
            .transaction(move |db| {
                let wallet = active_wallet_for_user(db, user_id)?;
                check_pin(&state_ref, &wallet, &order.transaction_pin)?;

                if !wallet.is_settlement_account_set {
                    return Err(ApiError::state_conflict("Settlement account not set"));
                }
                let (settlement_name, settlement_number) = match (
                    &wallet.settlement_account_name,
                    &wallet.settlement_account_number,
                ) {
                    (Some(name), Some(number)) => (name.clone(), number.clone()),
                    _ => return Err(ApiError::internal("Settlement account incomplete")),
                };

                let total = amount + fee;
                if wallet.balance < total {
                    return Err(ApiError::state_conflict("Insufficient funds"));
                }

                let email = db
                    .user_by_id(user_id)
                    .map(|u| u.email.clone())
                    .ok_or_else(|| ApiError::internal("Wallet owner missing"))?;

                let trace = generate_trace_id(db, now);
                let leg = Transaction {
                    id: Uuid::new_v4(),
                    wallet_id: wallet.id,
                    user_id,
                    amount,
                    fee,
                    opening_balance: wallet.balance,
                    closing_balance: wallet.balance - total,
                    currency: wallet.currency.clone(),
                    channel: TransactionChannel::BankTransfer,
                    kind: TransactionType::Debit,
                    status: TransactionStatus::Pending,
                    session_id: trace,
                    remark: order
                        .remark
                        .unwrap_or_else(|| "Wallet withdrawal".to_string()),
                    metadata: TransactionMetadata {
                        sender: party_of(&wallet),
                        receiver: PartyDetails {
                            account_name: settlement_name,
                            account_number: settlement_number,
                        },
                    },
                    settlement_date: None,
                    created_at: now,
                };

                let stored = db
                    .wallet_by_id_mut(wallet.id)
                    .ok_or_else(|| ApiError::internal("Wallet disappeared"))?;
                stored.balance = leg.closing_balance;
                stored.updated_at = now;
                db.record_transaction(leg.clone());
                Ok((leg, email))
            })
            .await?
    };

    state
        .mailer
        .send_receipt(
            &email,
            "Withdrawal initiated",
            &format!(
                "Your withdrawal of {} {amount} is being processed.",
                leg.currency
            ),
        )
        .await;

    tracing::info!(trace = %leg.session_id, %amount, "withdrawal initiated");
    Ok(leg)
}

/// Paginated ledger history for the caller's wallet, newest first.
pub async fn history(
    state: &AppState,
    user_id: Uuid,
    page: u32,
    limit: u32,
) -> Result<TransactionPage, ApiError> {
    state
        .store
        .read(|db| {
            let wallet = db
                .wallet_for_user(user_id)
                .ok_or_else(|| ApiError::not_found("Wallet not found"))?;
            Ok(db.transactions_for_wallet(wallet.id, page, limit))
        })
        .await
}

/// A single ledger record, visible to its owner only.
pub async fn get_transaction(
    state: &AppState,
    user_id: Uuid,
    transaction_id: Uuid,
) -> Result<Transaction, ApiError> {
    state
        .store
        .read(|db| db.transaction_for_user(user_id, transaction_id).cloned())
        .await
        .ok_or_else(|| ApiError::not_found("Transaction not found"))
}
