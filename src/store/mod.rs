// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! # Storage
//!
//! In-memory store behind an async `RwLock`, split into one file per
//! table family:
//!
//! | Module | Tables |
//! |--------|--------|
//! | [`database`] | Table container, snapshot support |
//! | [`users`] | Users, KYC profiles |
//! | [`sessions`] | Device sessions |
//! | [`wallets`] | Wallets |
//! | [`transactions`] | Immutable ledger trail |
//!
//! ## Transactions
//!
//! [`Store::transaction`] gives multi-record atomicity: the closure runs
//! against a snapshot of the database under the write lock, and the
//! snapshot replaces the live database only if the closure returns `Ok`.
//! Any error rolls the whole batch back. Because the write lock is held
//! for the duration, concurrent ledger operations on the same wallet are
//! serialized and each one reads balances no earlier than the previous
//! one's commit.

pub mod database;
pub mod sessions;
pub mod transactions;
pub mod users;
pub mod wallets;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::ApiError;

pub use database::Database;

/// Handle to the shared database. Cheap to clone.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<Database>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a read-only closure against the live database.
    pub async fn read<T>(&self, f: impl FnOnce(&Database) -> T) -> T {
        let db = self.inner.read().await;
        f(&db)
    }

    /// Run a closure atomically. The closure mutates a snapshot; the
    /// snapshot is committed only on `Ok`, so a failure part-way through
    /// a multi-record batch leaves the live database untouched.
    pub async fn transaction<T>(
        &self,
        f: impl FnOnce(&mut Database) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut db = self.inner.write().await;
        let mut snapshot = db.clone();
        let out = f(&mut snapshot)?;
        *db = snapshot;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn user(email: &str, phone: &str) -> User {
        User::new(email.into(), phone.into(), "hash".into(), "UTC".into())
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let store = Store::new();
        store
            .transaction(|db| db.insert_user(user("a@x.com", "08011111111")))
            .await
            .unwrap();

        let found = store.read(|db| db.user_by_email("a@x.com").cloned()).await;
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn failed_transaction_rolls_back_everything() {
        let store = Store::new();
        store
            .transaction(|db| db.insert_user(user("a@x.com", "08011111111")))
            .await
            .unwrap();

        // First insert inside the batch succeeds, second fails on the
        // duplicate phone; neither may survive.
        let result = store
            .transaction(|db| {
                db.insert_user(user("b@x.com", "08022222222"))?;
                db.insert_user(user("c@x.com", "08011111111"))?;
                Ok(())
            })
            .await;
        assert!(result.is_err());

        let partial = store.read(|db| db.user_by_email("b@x.com").cloned()).await;
        assert!(partial.is_none());
    }
}
