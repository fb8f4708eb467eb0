// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Ledger trail access. Records are append-only; nothing in this module
//! hands out a mutable reference to a stored transaction.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Transaction;

use super::Database;

/// One page of ledger history, most recent first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl Database {
    /// Append a ledger record.
    pub fn record_transaction(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    /// A wallet's history, newest first, paginated. `page` is 1-based;
    /// a page past the end is empty, not an error.
    pub fn transactions_for_wallet(
        &self,
        wallet_id: Uuid,
        page: u32,
        limit: u32,
    ) -> TransactionPage {
        let page = page.max(1);
        let limit = limit.max(1);

        let mut rows: Vec<&Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.wallet_id == wallet_id)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = rows.len();
        let total_pages = (total as u32).div_ceil(limit);
        // `page` is attacker-controlled query input; the offset must not
        // overflow for any u32 page
        let start = (page as usize - 1).saturating_mul(limit as usize);

        let transactions = rows
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();

        TransactionPage {
            transactions,
            total,
            page,
            limit,
            total_pages,
        }
    }

    /// A single ledger record, scoped to its owner.
    pub fn transaction_for_user(&self, user_id: Uuid, transaction_id: Uuid) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|t| t.id == transaction_id && t.user_id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        PartyDetails, TransactionChannel, TransactionMetadata, TransactionStatus, TransactionType,
    };
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn record(wallet_id: Uuid, user_id: Uuid, minutes_ago: i64) -> Transaction {
        let party = PartyDetails {
            account_name: "Ada Obi".into(),
            account_number: "8011111111".into(),
        };
        Transaction {
            id: Uuid::new_v4(),
            wallet_id,
            user_id,
            amount: dec!(100.00),
            fee: dec!(10.00),
            opening_balance: dec!(500.00),
            closing_balance: dec!(390.00),
            currency: "NGN".into(),
            channel: TransactionChannel::Wallet,
            kind: TransactionType::Debit,
            status: TransactionStatus::Completed,
            session_id: format!("trace-{minutes_ago}"),
            remark: "test".into(),
            metadata: TransactionMetadata {
                sender: party.clone(),
                receiver: party,
            },
            settlement_date: None,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn history_is_newest_first_and_paginated() {
        let mut db = Database::default();
        let wallet_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        for minutes_ago in [30, 10, 20] {
            db.record_transaction(record(wallet_id, user_id, minutes_ago));
        }
        db.record_transaction(record(Uuid::new_v4(), user_id, 5));

        let page = db.transactions_for_wallet(wallet_id, 1, 2);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.transactions.len(), 2);
        assert_eq!(page.transactions[0].session_id, "trace-10");
        assert_eq!(page.transactions[1].session_id, "trace-20");

        let last = db.transactions_for_wallet(wallet_id, 2, 2);
        assert_eq!(last.transactions.len(), 1);
        assert_eq!(last.transactions[0].session_id, "trace-30");
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let mut db = Database::default();
        let wallet_id = Uuid::new_v4();
        db.record_transaction(record(wallet_id, Uuid::new_v4(), 1));

        let page = db.transactions_for_wallet(wallet_id, 9, 10);
        assert!(page.transactions.is_empty());
        assert_eq!(page.total, 1);
    }

    #[test]
    fn extreme_page_number_is_just_an_empty_page() {
        let mut db = Database::default();
        let wallet_id = Uuid::new_v4();
        db.record_transaction(record(wallet_id, Uuid::new_v4(), 1));

        let page = db.transactions_for_wallet(wallet_id, u32::MAX, 100);
        assert!(page.transactions.is_empty());
        assert_eq!(page.total, 1);
    }

    #[test]
    fn single_lookup_is_owner_scoped() {
        let mut db = Database::default();
        let wallet_id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let row = record(wallet_id, owner, 1);
        let id = row.id;
        db.record_transaction(row);

        assert!(db.transaction_for_user(owner, id).is_some());
        assert!(db.transaction_for_user(Uuid::new_v4(), id).is_none());
    }
}
