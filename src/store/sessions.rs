// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Session table access.
//!
//! The table is keyed by user id, so a user can never hold two sessions:
//! a new login overwrites the old row wholesale and the replaced tokens
//! die with it.

use uuid::Uuid;

use crate::models::Session;

use super::Database;

impl Database {
    /// Install a fresh session for the user, replacing any existing one.
    pub fn replace_session(&mut self, session: Session) {
        self.sessions.insert(session.user_id, session);
    }

    pub fn session_for_user(&self, user_id: Uuid) -> Option<&Session> {
        self.sessions.get(&user_id)
    }

    pub fn session_for_user_mut(&mut self, user_id: Uuid) -> Option<&mut Session> {
        self.sessions.get_mut(&user_id)
    }

    /// Drop the user's session. Logout and fail-closed guard paths.
    pub fn delete_session(&mut self, user_id: Uuid) -> Option<Session> {
        self.sessions.remove(&user_id)
    }
}
