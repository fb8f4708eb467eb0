// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! User and KYC-profile table access.

use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Profile, User};

use super::Database;

impl Database {
    /// Insert a user, enforcing global email and phone uniqueness.
    /// Soft-deleted users still occupy their email and phone.
    pub fn insert_user(&mut self, user: User) -> Result<(), ApiError> {
        if self.users.values().any(|u| u.email == user.email) {
            return Err(ApiError::conflict("Email already registered"));
        }
        if self.users.values().any(|u| u.phone == user.phone) {
            return Err(ApiError::conflict("Phone number already registered"));
        }
        self.users.insert(user.id, user);
        Ok(())
    }

    pub fn user_by_id(&self, id: Uuid) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_by_id_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    /// Upsert the KYC profile captured at BVN verification.
    pub fn put_profile(&mut self, profile: Profile) {
        self.profiles.insert(profile.user_id, profile);
    }

    pub fn profile_for_user(&self, user_id: Uuid) -> Option<&Profile> {
        self.profiles.get(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserStatus;

    fn user(email: &str, phone: &str) -> User {
        User::new(email.into(), phone.into(), "hash".into(), "UTC".into())
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let mut db = Database::default();
        db.insert_user(user("a@x.com", "08011111111")).unwrap();
        let err = db.insert_user(user("a@x.com", "08022222222")).unwrap_err();
        assert_eq!(err, ApiError::conflict("Email already registered"));
    }

    #[test]
    fn duplicate_phone_is_rejected() {
        let mut db = Database::default();
        db.insert_user(user("a@x.com", "08011111111")).unwrap();
        let err = db.insert_user(user("b@x.com", "08011111111")).unwrap_err();
        assert_eq!(err, ApiError::conflict("Phone number already registered"));
    }

    #[test]
    fn soft_deleted_user_still_occupies_identifiers() {
        let mut db = Database::default();
        let mut deleted = user("a@x.com", "08011111111");
        deleted.status = UserStatus::Deleted;
        let id = deleted.id;
        db.insert_user(deleted).unwrap();
        db.user_by_id_mut(id).unwrap().deleted_at = Some(chrono::Utc::now());

        assert!(db.insert_user(user("a@x.com", "08033333333")).is_err());
        assert!(db.insert_user(user("c@x.com", "08011111111")).is_err());
    }

    #[test]
    fn lookup_by_email() {
        let mut db = Database::default();
        let u = user("a@x.com", "08011111111");
        let id = u.id;
        db.insert_user(u).unwrap();
        assert_eq!(db.user_by_email("a@x.com").unwrap().id, id);
        assert!(db.user_by_email("b@x.com").is_none());
    }
}
