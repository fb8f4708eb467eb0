// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! The table container. All tables live in one cloneable struct so a
//! storage transaction can snapshot and restore the whole database.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{Profile, Session, Transaction, User, Wallet};

/// Every table in the store. `Clone` is the snapshot mechanism used by
/// [`super::Store::transaction`].
#[derive(Debug, Clone, Default)]
pub struct Database {
    /// Users by id
    pub(super) users: HashMap<Uuid, User>,
    /// KYC profiles by user id
    pub(super) profiles: HashMap<Uuid, Profile>,
    /// Sessions by user id; one active session per user by construction
    pub(super) sessions: HashMap<Uuid, Session>,
    /// Wallets by wallet id
    pub(super) wallets: HashMap<Uuid, Wallet>,
    /// Append-only ledger trail in insertion order
    pub(super) transactions: Vec<Transaction>,
    /// Serial component of ledger trace ids
    pub(super) next_trace_serial: u64,
}

impl Database {
    /// Next serial for a ledger trace id. Monotonic across commits since
    /// the increment rides in the transaction snapshot.
    pub fn next_trace_serial(&mut self) -> u64 {
        self.next_trace_serial += 1;
        self.next_trace_serial
    }
}
