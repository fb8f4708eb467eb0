// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Wallet table access. Balance arithmetic lives in the ledger engine;
//! this module only stores and finds wallet rows.

use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Wallet;

use super::Database;

impl Database {
    /// Insert a wallet, enforcing one wallet per user and a globally
    /// unique account number.
    pub fn insert_wallet(&mut self, wallet: Wallet) -> Result<(), ApiError> {
        if self.wallets.values().any(|w| w.user_id == wallet.user_id) {
            return Err(ApiError::state_conflict("Wallet already exists"));
        }
        if self
            .wallets
            .values()
            .any(|w| w.account_number == wallet.account_number)
        {
            return Err(ApiError::conflict("Account number already in use"));
        }
        self.wallets.insert(wallet.id, wallet);
        Ok(())
    }

    pub fn wallet_by_id(&self, id: Uuid) -> Option<&Wallet> {
        self.wallets.get(&id)
    }

    pub fn wallet_by_id_mut(&mut self, id: Uuid) -> Option<&mut Wallet> {
        self.wallets.get_mut(&id)
    }

    pub fn wallet_for_user(&self, user_id: Uuid) -> Option<&Wallet> {
        self.wallets.values().find(|w| w.user_id == user_id)
    }

    pub fn wallet_for_user_mut(&mut self, user_id: Uuid) -> Option<&mut Wallet> {
        self.wallets.values_mut().find(|w| w.user_id == user_id)
    }

    pub fn wallet_by_account_number(&self, account_number: &str) -> Option<&Wallet> {
        self.wallets
            .values()
            .find(|w| w.account_number == account_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_wallet_per_user() {
        let mut db = Database::default();
        let user_id = Uuid::new_v4();
        db.insert_wallet(Wallet::new(user_id, "Ada Obi".into(), "8011111111".into()))
            .unwrap();

        let err = db
            .insert_wallet(Wallet::new(user_id, "Ada Obi".into(), "8022222222".into()))
            .unwrap_err();
        assert_eq!(err, ApiError::state_conflict("Wallet already exists"));
    }

    #[test]
    fn account_numbers_are_unique() {
        let mut db = Database::default();
        db.insert_wallet(Wallet::new(
            Uuid::new_v4(),
            "Ada Obi".into(),
            "8011111111".into(),
        ))
        .unwrap();

        let err = db
            .insert_wallet(Wallet::new(
                Uuid::new_v4(),
                "Bola Ade".into(),
                "8011111111".into(),
            ))
            .unwrap_err();
        assert_eq!(err, ApiError::conflict("Account number already in use"));
    }

    #[test]
    fn lookup_by_account_number() {
        let mut db = Database::default();
        let wallet = Wallet::new(Uuid::new_v4(), "Ada Obi".into(), "8011111111".into());
        let id = wallet.id;
        db.insert_wallet(wallet).unwrap();

        assert_eq!(db.wallet_by_account_number("8011111111").unwrap().id, id);
        assert!(db.wallet_by_account_number("0000000000").is_none());
    }
}
