// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! # Domain Models
//!
//! Core records owned by the store: users, sessions, wallets and the
//! immutable transaction trail, plus the read-only projections served to
//! API clients.
//!
//! Monetary fields use [`rust_decimal::Decimal`] (2 dp, non-negative);
//! the ledger never touches floating point.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// =============================================================================
// User
// =============================================================================

/// User lifecycle status.
///
/// Users are never hard-deleted; deletion is a transition to `Deleted`
/// with email/phone retained for uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Signed up, email not yet verified
    Unverified,
    /// Email verified
    Verified,
    /// Suspended pending review
    Suspended,
    /// Blacklisted by the karma lookup
    Blacklisted,
    /// Soft-deleted
    Deleted,
}

/// A registered user. The password field holds a keyed hash, never the
/// plaintext, and is skipped on serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Globally unique
    pub email: String,
    /// Globally unique
    pub phone: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub timezone: String,
    pub status: UserStatus,
    pub is_email_verified: bool,
    pub is_kyc_verified: bool,
    pub is_password_reset_required: bool,
    pub is_two_factor_enabled: bool,
    pub is_blacklisted: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a fresh unverified user. `password` must already be hashed.
    pub fn new(email: String, phone: String, password: String, timezone: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            phone,
            password,
            timezone,
            status: UserStatus::Unverified,
            is_email_verified: false,
            is_kyc_verified: false,
            is_password_reset_required: false,
            is_two_factor_enabled: false,
            is_blacklisted: false,
            last_login: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether the access guard must reject this user outright.
    pub fn is_barred(&self) -> bool {
        matches!(
            self.status,
            UserStatus::Blacklisted | UserStatus::Deleted | UserStatus::Suspended
        )
    }
}

// =============================================================================
// Session
// =============================================================================

/// The single active device session for a user.
///
/// There is at most one session per user; a new login replaces the old
/// session wholesale. The embedded OTP slot carries the pending
/// two-factor challenge and is cleared on successful verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
    /// Mirrors the refresh-token expiry; the session dies with it
    pub expires_at: DateTime<Utc>,
    pub two_factor_code: Option<String>,
    pub two_factor_code_expires_at: Option<DateTime<Utc>>,
    pub is_two_factor_verified: bool,
    pub two_factor_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Arm the OTP slot with a fresh code, un-verifying the session.
    pub fn arm_two_factor(&mut self, code: String, expires_at: DateTime<Utc>) {
        self.two_factor_code = Some(code);
        self.two_factor_code_expires_at = Some(expires_at);
        self.is_two_factor_verified = false;
        self.two_factor_verified_at = None;
        self.updated_at = Utc::now();
    }

    /// Clear the OTP slot and mark the session two-factor-verified.
    pub fn complete_two_factor(&mut self) {
        let now = Utc::now();
        self.two_factor_code = None;
        self.two_factor_code_expires_at = None;
        self.is_two_factor_verified = true;
        self.two_factor_verified_at = Some(now);
        self.updated_at = now;
    }

    /// OTP equality check against the stored slot, including code expiry.
    pub fn otp_matches(&self, submitted: &str, now: DateTime<Utc>) -> bool {
        match (&self.two_factor_code, self.two_factor_code_expires_at) {
            (Some(code), Some(expires_at)) => code == submitted && now < expires_at,
            _ => false,
        }
    }
}

// =============================================================================
// Wallet
// =============================================================================

/// Wallet status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    /// Provisioned but not yet usable
    Inactive,
    /// Usable for ledger operations
    Active,
    /// Administratively blocked
    Blocked,
}

impl std::fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletStatus::Inactive => write!(f, "inactive"),
            WalletStatus::Active => write!(f, "active"),
            WalletStatus::Blocked => write!(f, "blocked"),
        }
    }
}

/// A user's wallet. Created at KYC completion; the balance is only ever
/// mutated by the ledger engine inside a storage transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_name: String,
    /// Globally unique (last 10 digits of the owner's phone)
    pub account_number: String,
    pub balance: Decimal,
    /// Reserved/held funds; carried in the data model, unused by ledger ops
    pub lien_balance: Decimal,
    pub currency: String,
    pub status: WalletStatus,
    pub settlement_account_name: Option<String>,
    pub settlement_account_number: Option<String>,
    pub settlement_bank_code: Option<String>,
    pub is_settlement_account_set: bool,
    /// Keyed pin hash; never serialized
    #[serde(skip_serializing)]
    pub transaction_pin: Option<String>,
    pub is_transaction_pin_set: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: Uuid, account_name: String, account_number: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            account_name,
            account_number,
            balance: Decimal::ZERO,
            lien_balance: Decimal::ZERO,
            currency: "NGN".to_string(),
            status: WalletStatus::Active,
            settlement_account_name: None,
            settlement_account_number: None,
            settlement_bank_code: None,
            is_settlement_account_set: false,
            transaction_pin: None,
            is_transaction_pin_set: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Settlement account details, settable exactly once per wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SettlementAccount {
    pub account_name: String,
    pub account_number: String,
    pub bank_code: String,
}

// =============================================================================
// Transaction
// =============================================================================

/// Channel a ledger leg moved through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionChannel {
    Wallet,
    BankTransfer,
}

/// Direction of a ledger leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

/// Settlement status of a ledger leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// Counterparty details carried on both legs of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PartyDetails {
    pub account_name: String,
    pub account_number: String,
}

/// Structured sender/receiver metadata attached to every transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionMetadata {
    pub sender: PartyDetails,
    pub receiver: PartyDetails,
}

/// One immutable ledger record. Never mutated after creation; the
/// wallet's current balance always equals the closing balance of its
/// most recent transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub fee: Decimal,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub currency: String,
    pub channel: TransactionChannel,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    /// Globally unique trace id (institution code + timestamp + serials)
    pub session_id: String,
    pub remark: String,
    pub metadata: TransactionMetadata,
    pub settlement_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Projections
// =============================================================================

/// Authenticated-user view: the User+Session join returned after login,
/// refresh and the verification flows. Never exposes token or password
/// material.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub phone: String,
    pub status: UserStatus,
    pub is_email_verified: bool,
    pub is_kyc_verified: bool,
    pub is_password_reset_required: bool,
    pub is_two_factor_enabled: bool,
    pub is_blacklisted: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub timezone: String,
    pub session_id: Uuid,
    pub device_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub session_expires_at: DateTime<Utc>,
}

impl AuthenticatedUser {
    /// Project the join of a user and their active session.
    pub fn project(user: &User, session: &Session) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            phone: user.phone.clone(),
            status: user.status,
            is_email_verified: user.is_email_verified,
            is_kyc_verified: user.is_kyc_verified,
            is_password_reset_required: user.is_password_reset_required,
            is_two_factor_enabled: user.is_two_factor_enabled,
            is_blacklisted: user.is_blacklisted,
            last_login: user.last_login,
            timezone: user.timezone.clone(),
            session_id: session.id,
            device_id: session.device_id.clone(),
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
            session_expires_at: session.expires_at,
        }
    }
}

/// KYC profile captured at BVN verification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User-profile view: the Users+Profile join served by the users API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub phone: String,
    pub status: UserStatus,
    pub is_email_verified: bool,
    pub is_kyc_verified: bool,
    pub timezone: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn project(user: &User, profile: Option<&Profile>) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            phone: user.phone.clone(),
            status: user.status,
            is_email_verified: user.is_email_verified,
            is_kyc_verified: user.is_kyc_verified,
            timezone: user.timezone.clone(),
            first_name: profile.map(|p| p.first_name.clone()),
            last_name: profile.map(|p| p.last_name.clone()),
            date_of_birth: profile.map(|p| p.date_of_birth.clone()),
            gender: profile.map(|p| p.gender.clone()),
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user() -> User {
        User::new(
            "a@x.com".into(),
            "08011111111".into(),
            "hash".into(),
            "Africa/Lagos".into(),
        )
    }

    #[test]
    fn new_user_starts_unverified() {
        let user = sample_user();
        assert_eq!(user.status, UserStatus::Unverified);
        assert!(!user.is_email_verified);
        assert!(!user.is_barred());
    }

    #[test]
    fn barred_statuses_are_rejected() {
        let mut user = sample_user();
        for status in [
            UserStatus::Blacklisted,
            UserStatus::Deleted,
            UserStatus::Suspended,
        ] {
            user.status = status;
            assert!(user.is_barred());
        }
        user.status = UserStatus::Verified;
        assert!(!user.is_barred());
    }

    #[test]
    fn otp_slot_arm_and_complete() {
        let now = Utc::now();
        let mut session = Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            device_id: "dev".into(),
            ip_address: "127.0.0.1".into(),
            user_agent: "test".into(),
            access_token: String::new(),
            access_token_expires_at: now,
            refresh_token: String::new(),
            refresh_token_expires_at: now,
            expires_at: now,
            two_factor_code: None,
            two_factor_code_expires_at: None,
            is_two_factor_verified: false,
            two_factor_verified_at: None,
            created_at: now,
            updated_at: now,
        };

        session.arm_two_factor("123456".into(), now + Duration::minutes(10));
        assert!(session.otp_matches("123456", now));
        assert!(!session.otp_matches("654321", now));
        // expired code never matches
        assert!(!session.otp_matches("123456", now + Duration::minutes(11)));

        session.complete_two_factor();
        assert!(session.is_two_factor_verified);
        assert!(session.two_factor_code.is_none());
        assert!(!session.otp_matches("123456", now));
    }

    #[test]
    fn user_serialization_skips_password() {
        let user = sample_user();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "a@x.com");
    }

    #[test]
    fn wallet_serialization_skips_pin() {
        let mut wallet = Wallet::new(Uuid::new_v4(), "Ada Obi".into(), "8011111111".into());
        wallet.transaction_pin = Some("pin-hash".into());
        let json = serde_json::to_value(&wallet).unwrap();
        assert!(json.get("transaction_pin").is_none());
        assert_eq!(json["currency"], "NGN");
    }
}
