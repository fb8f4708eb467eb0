// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Authentication flow orchestration.
//!
//! Every OTP-challenged sub-flow follows the same shape: the initiating
//! operation installs a challenge session carrying the armed OTP slot
//! and hands back a purpose-scoped verification token; the completing
//! operation presents token plus OTP. A wrong code is rejected but the
//! challenge stays armed, so the caller can retry until the code
//! expires or a new challenge replaces it.
//!
//! Provider calls (karma blacklist, BVN record) are fail-closed: if the
//! provider cannot answer, the operation is rejected.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::otp::generate_otp;
use crate::error::ApiError;
use crate::models::{
    AuthenticatedUser, Profile, Session, User, UserProfile, UserStatus, Wallet,
};
use crate::state::AppState;
use crate::token::{AuthPurpose, KycSubmission, SessionBinding, VerificationScope};

/// Caller device identity captured from the request.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    pub device_id: String,
    pub ip_address: String,
    pub user_agent: String,
}

/// An issued verification challenge.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChallengeOutcome {
    pub verification_token: String,
    pub expires_at: DateTime<Utc>,
}

/// A created account: live session tokens plus the first
/// email-verification challenge.
#[derive(Debug, Serialize, ToSchema)]
pub struct SignupOutcome {
    pub user: UserProfile,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub verification_token: String,
    pub expires_at: DateTime<Utc>,
}

/// A completed login.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginOutcome {
    pub user: AuthenticatedUser,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// A rotated token pair.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

fn otp_mismatch() -> ApiError {
    ApiError::state_conflict("Invalid or expired verification code")
}

fn invalid_token() -> ApiError {
    ApiError::authentication("Invalid or expired token")
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = matches!(
        email.split_once('@'),
        Some((local, domain)) if !local.is_empty() && domain.contains('.')
    );
    if valid {
        Ok(())
    } else {
        Err(ApiError::validation("A valid email address is required"))
    }
}

fn validate_phone(phone: &str) -> Result<(), ApiError> {
    if phone.len() >= 10 && phone.len() <= 15 && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ApiError::validation("A valid phone number is required"))
    }
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() >= 8 {
        Ok(())
    } else {
        Err(ApiError::validation(
            "Password must be at least 8 characters",
        ))
    }
}

fn validate_bvn(bvn: &str) -> Result<(), ApiError> {
    if bvn.len() == 11 && bvn.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ApiError::validation("A valid 11-digit BVN is required"))
    }
}

/// A session holding only an armed OTP slot; its token fields stay empty
/// until the login step issues real tokens into it.
fn challenge_session(
    session_id: Uuid,
    user_id: Uuid,
    device: &DeviceContext,
    otp: String,
    expires_at: DateTime<Utc>,
) -> Session {
    let now = Utc::now();
    let mut session = Session {
        id: session_id,
        user_id,
        device_id: device.device_id.clone(),
        ip_address: device.ip_address.clone(),
        user_agent: device.user_agent.clone(),
        access_token: String::new(),
        access_token_expires_at: now,
        refresh_token: String::new(),
        refresh_token_expires_at: expires_at,
        expires_at,
        two_factor_code: None,
        two_factor_code_expires_at: None,
        is_two_factor_verified: false,
        two_factor_verified_at: None,
        created_at: now,
        updated_at: now,
    };
    session.arm_two_factor(otp, expires_at);
    session
}

fn binding_for(session_id: Uuid, user_id: Uuid, device: &DeviceContext) -> SessionBinding {
    SessionBinding {
        session_id,
        user_id,
        device_id: device.device_id.clone(),
        ip_address: device.ip_address.clone(),
        user_agent: device.user_agent.clone(),
    }
}

/// Delete the user's session if it is still the one the caller's token
/// references. The id check guards against a session replaced between
/// the expiry read and this write.
async fn drop_session_if_current(state: &AppState, user_id: Uuid, session_id: Uuid) {
    let dropped = state
        .store
        .transaction(|db| {
            if db.session_for_user(user_id).map(|s| s.id) == Some(session_id) {
                db.delete_session(user_id);
            }
            Ok(())
        })
        .await;
    if dropped.is_err() {
        tracing::error!(%user_id, "failed to drop session");
    }
}

/// Reject the identity if the blacklist has a disqualifying record.
/// Provider failure blocks signup rather than waving it through.
async fn ensure_not_blacklisted(state: &AppState, identity: &str) -> Result<(), ApiError> {
    let records = state.verifier.karma_lookup(identity).await?;
    if records.iter().any(|r| r.is_disqualifying()) {
        tracing::info!(identity, "signup rejected by blacklist");
        return Err(ApiError::state_conflict(
            "We are unable to open an account for you at this time",
        ));
    }
    Ok(())
}

/// How a challenge claims the user's session slot.
enum ChallengeMode {
    /// Replace any existing session wholesale (login)
    Fresh,
    /// Arm the OTP slot on the existing session, creating one only if
    /// none exists (email/forgot-password sub-flows)
    Reuse,
}

/// Install or arm a challenge session and email the OTP.
async fn issue_challenge(
    state: &AppState,
    user_id: Uuid,
    email_to: &str,
    device: &DeviceContext,
    scope: VerificationScope,
    subject: &str,
    mode: ChallengeMode,
) -> Result<ChallengeOutcome, ApiError> {
    let existing = match mode {
        ChallengeMode::Fresh => None,
        ChallengeMode::Reuse => {
            state
                .store
                .read(|db| db.session_for_user(user_id).map(|s| s.id))
                .await
        }
    };
    let session_id = existing.unwrap_or_else(Uuid::new_v4);

    let otp = generate_otp();
    let signed = state
        .tokens
        .sign_verification(&binding_for(session_id, user_id, device), scope)
        .map_err(|_| ApiError::internal("Could not issue verification token"))?;
    let expires_at = signed.expires_at;

    let fallback = challenge_session(session_id, user_id, device, otp.clone(), expires_at);
    {
        let otp = otp.clone();
        state
            .store
            .transaction(move |db| {
                match db.session_for_user_mut(user_id) {
                    Some(session) if session.id == session_id => {
                        session.arm_two_factor(otp, expires_at);
                    }
                    _ => db.replace_session(fallback),
                }
                Ok(())
            })
            .await?;
    }

    state.mailer.send_otp(email_to, subject, &otp).await;
    Ok(ChallengeOutcome {
        verification_token: signed.token,
        expires_at,
    })
}

/// Create an account and send the first email-verification challenge.
pub async fn signup(
    state: &AppState,
    email: String,
    phone: String,
    password: String,
    timezone: Option<String>,
    device: DeviceContext,
) -> Result<SignupOutcome, ApiError> {
    validate_email(&email)?;
    validate_phone(&phone)?;
    validate_password(&password)?;

    ensure_not_blacklisted(state, &email).await?;
    ensure_not_blacklisted(state, &phone).await?;

    let user = User::new(
        email.clone(),
        phone,
        state.hasher.hash_password(&password),
        timezone.unwrap_or_else(|| "Africa/Lagos".to_string()),
    );
    let user_id = user.id;

    let otp = generate_otp();
    let session_id = Uuid::new_v4();
    let binding = binding_for(session_id, user_id, &device);
    let access = state
        .tokens
        .sign_access(&binding)
        .map_err(|_| ApiError::internal("Could not issue tokens"))?;
    let refresh = state
        .tokens
        .sign_refresh(&binding)
        .map_err(|_| ApiError::internal("Could not issue tokens"))?;
    let signed = state
        .tokens
        .sign_verification(
            &binding,
            VerificationScope::Email {
                email: email.clone(),
            },
        )
        .map_err(|_| ApiError::internal("Could not issue tokens"))?;

    let mut session =
        challenge_session(session_id, user_id, &device, otp.clone(), signed.expires_at);
    session.access_token = access.token.clone();
    session.access_token_expires_at = access.expires_at;
    session.refresh_token = refresh.token.clone();
    session.refresh_token_expires_at = refresh.expires_at;
    session.expires_at = refresh.expires_at;

    let row = user.clone();
    state
        .store
        .transaction(move |db| {
            db.insert_user(row)?;
            db.replace_session(session);
            Ok(())
        })
        .await?;
    let profile = UserProfile::project(&user, None);

    state.mailer.send_welcome(&email, &otp).await;
    tracing::info!(%user_id, "user signed up");

    Ok(SignupOutcome {
        user: profile,
        access_token: access.token,
        access_token_expires_at: access.expires_at,
        refresh_token: refresh.token,
        refresh_token_expires_at: refresh.expires_at,
        verification_token: signed.token,
        expires_at: signed.expires_at,
    })
}

/// Re-issue the email-verification challenge.
pub async fn resend_email_verification(
    state: &AppState,
    email: String,
    device: DeviceContext,
) -> Result<ChallengeOutcome, ApiError> {
    validate_email(&email)?;
    let user = state
        .store
        .read(|db| db.user_by_email(&email).cloned())
        .await
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if user.is_email_verified {
        return Err(ApiError::state_conflict("Email already verified"));
    }

    issue_challenge(
        state,
        user.id,
        &user.email,
        &device,
        VerificationScope::Email { email: user.email.clone() },
        "Verify your email address",
        ChallengeMode::Reuse,
    )
    .await
}

/// Complete email verification with token + OTP.
pub async fn verify_email(
    state: &AppState,
    token: String,
    otp: String,
) -> Result<UserProfile, ApiError> {
    let (claims, scope) = state
        .tokens
        .verify_verification(&token, AuthPurpose::Email)
        .map_err(|_| invalid_token())?;
    let VerificationScope::Email { email } = scope else {
        return Err(invalid_token());
    };
    let now = Utc::now();

    state
        .store
        .transaction(|db| {
            let session = db
                .session_for_user(claims.user_id)
                .ok_or_else(|| ApiError::authentication("Session not found"))?;
            if session.id != claims.session_id {
                return Err(ApiError::authentication("Session not found"));
            }
            if !session.otp_matches(&otp, now) {
                return Err(otp_mismatch());
            }

            let user = db
                .user_by_id_mut(claims.user_id)
                .ok_or_else(invalid_token)?;
            if user.email != email {
                return Err(invalid_token());
            }
            if user.is_email_verified {
                return Err(ApiError::state_conflict("Email already verified"));
            }
            user.is_email_verified = true;
            user.is_two_factor_enabled = true;
            if user.status == UserStatus::Unverified {
                user.status = UserStatus::Verified;
            }
            user.updated_at = now;
            let snapshot = user.clone();

            let session = db
                .session_for_user_mut(claims.user_id)
                .ok_or_else(|| ApiError::internal("Session disappeared"))?;
            session.complete_two_factor();
            Ok(UserProfile::project(&snapshot, None))
        })
        .await
}

/// First login step: check credentials, install a login challenge.
pub async fn initiate_auth(
    state: &AppState,
    email: String,
    password: String,
    device: DeviceContext,
) -> Result<ChallengeOutcome, ApiError> {
    validate_email(&email)?;
    let user = state
        .store
        .read(|db| db.user_by_email(&email).cloned())
        .await;

    // Same rejection whether the email or the password is wrong
    let user = user.ok_or_else(|| ApiError::state_conflict("Invalid email or password"))?;
    if !state.hasher.verify_password(&password, &user.password) {
        return Err(ApiError::state_conflict("Invalid email or password"));
    }
    if user.is_barred() {
        return Err(ApiError::authentication("Account is not in good standing"));
    }

    issue_challenge(
        state,
        user.id,
        &user.email,
        &device,
        VerificationScope::Login { email: user.email.clone() },
        "Your login code",
        ChallengeMode::Fresh,
    )
    .await
}

/// Second login step: OTP clears the challenge and mints the session
/// token pair.
pub async fn login(state: &AppState, token: String, otp: String) -> Result<LoginOutcome, ApiError> {
    let (claims, _) = state
        .tokens
        .verify_verification(&token, AuthPurpose::Login)
        .map_err(|_| invalid_token())?;
    let now = Utc::now();
    let user_id = claims.user_id;
    let session_id = claims.session_id;

    let binding = SessionBinding {
        session_id,
        user_id,
        device_id: claims.device_id.clone(),
        ip_address: claims.ip_address.clone(),
        user_agent: claims.user_agent.clone(),
    };
    let access = state
        .tokens
        .sign_access(&binding)
        .map_err(|_| ApiError::internal("Could not issue tokens"))?;
    let refresh = state
        .tokens
        .sign_refresh(&binding)
        .map_err(|_| ApiError::internal("Could not issue tokens"))?;

    let result = state
        .store
        .transaction(move |db| {
            let session = db
                .session_for_user(user_id)
                .ok_or_else(|| ApiError::authentication("Session not found"))?;
            if session.id != session_id {
                return Err(ApiError::authentication("Session not found"));
            }
            // A session that already cleared its challenge has nothing
            // pending; the token is stale
            if session.is_two_factor_verified {
                return Err(otp_mismatch());
            }
            if !session.otp_matches(&otp, now) {
                return Err(otp_mismatch());
            }

            let user = db.user_by_id_mut(user_id).ok_or_else(invalid_token)?;
            if user.is_barred() {
                return Err(ApiError::authentication("Account is not in good standing"));
            }
            user.last_login = Some(now);
            user.updated_at = now;
            let user_snapshot = user.clone();

            let session = db
                .session_for_user_mut(user_id)
                .ok_or_else(|| ApiError::internal("Session disappeared"))?;
            session.complete_two_factor();
            session.access_token = access.token.clone();
            session.access_token_expires_at = access.expires_at;
            session.refresh_token = refresh.token.clone();
            session.refresh_token_expires_at = refresh.expires_at;
            session.expires_at = refresh.expires_at;

            let user = AuthenticatedUser::project(&user_snapshot, session);
            Ok(LoginOutcome {
                user,
                access_token: access.token,
                access_token_expires_at: access.expires_at,
                refresh_token: refresh.token,
                refresh_token_expires_at: refresh.expires_at,
            })
        })
        .await;

    if result.is_ok() {
        tracing::info!(%user_id, "login completed");
    }
    result
}

/// Rotate the token pair against a live refresh token. Both tokens are
/// reissued and the stored material overwritten; the presented refresh
/// token is dead afterwards.
pub async fn refresh(state: &AppState, refresh_token: String) -> Result<RefreshOutcome, ApiError> {
    let claims = state
        .tokens
        .verify_refresh(&refresh_token)
        .map_err(|_| invalid_token())?;
    let now = Utc::now();

    let expired = state
        .store
        .read(|db| {
            db.session_for_user(claims.user_id)
                .filter(|s| s.id == claims.session_id)
                .map(|s| now >= s.refresh_token_expires_at)
        })
        .await;
    if expired == Some(true) {
        drop_session_if_current(state, claims.user_id, claims.session_id).await;
        return Err(ApiError::authentication(
            "Session expired, please log in again",
        ));
    }

    let tokens = state.tokens.clone();
    state
        .store
        .transaction(move |db| {
            let session = db
                .session_for_user(claims.user_id)
                .ok_or_else(|| ApiError::authentication("Session not found"))?;
            if session.id != claims.session_id || session.refresh_token != refresh_token {
                return Err(invalid_token());
            }

            let user = db.user_by_id(claims.user_id).ok_or_else(invalid_token)?;
            if user.is_barred() {
                return Err(ApiError::authentication("Account is not in good standing"));
            }

            let binding = SessionBinding {
                session_id: session.id,
                user_id: session.user_id,
                device_id: session.device_id.clone(),
                ip_address: session.ip_address.clone(),
                user_agent: session.user_agent.clone(),
            };
            let access = tokens
                .sign_access(&binding)
                .map_err(|_| ApiError::internal("Could not issue tokens"))?;
            let new_refresh = tokens
                .sign_refresh(&binding)
                .map_err(|_| ApiError::internal("Could not issue tokens"))?;

            let session = db
                .session_for_user_mut(claims.user_id)
                .ok_or_else(|| ApiError::internal("Session disappeared"))?;
            session.access_token = access.token.clone();
            session.access_token_expires_at = access.expires_at;
            session.refresh_token = new_refresh.token.clone();
            session.refresh_token_expires_at = new_refresh.expires_at;
            session.expires_at = new_refresh.expires_at;
            session.updated_at = now;

            Ok(RefreshOutcome {
                access_token: access.token,
                access_token_expires_at: access.expires_at,
                refresh_token: new_refresh.token,
                refresh_token_expires_at: new_refresh.expires_at,
            })
        })
        .await
}

/// Drop the caller's session.
pub async fn logout(state: &AppState, user_id: Uuid, session_id: Uuid) -> Result<(), ApiError> {
    state
        .store
        .transaction(move |db| {
            if db.session_for_user(user_id).map(|s| s.id) == Some(session_id) {
                db.delete_session(user_id);
            }
            Ok(())
        })
        .await
}

/// Start the forgot-password flow. Returns `None` for an unknown email
/// so the API can answer identically either way.
pub async fn forgot_password(
    state: &AppState,
    email: String,
    device: DeviceContext,
) -> Result<Option<ChallengeOutcome>, ApiError> {
    validate_email(&email)?;
    let Some(user) = state
        .store
        .read(|db| db.user_by_email(&email).cloned())
        .await
    else {
        return Ok(None);
    };

    let challenge = issue_challenge(
        state,
        user.id,
        &user.email,
        &device,
        VerificationScope::ForgotPassword { email: user.email.clone() },
        "Your password reset code",
        ChallengeMode::Reuse,
    )
    .await?;
    Ok(Some(challenge))
}

/// OTP step of forgot-password. On success the challenge session is
/// marked verified and a fresh reset-scoped token is returned.
pub async fn verify_forgot_password(
    state: &AppState,
    token: String,
    otp: String,
) -> Result<ChallengeOutcome, ApiError> {
    let (claims, scope) = state
        .tokens
        .verify_verification(&token, AuthPurpose::ForgotPassword)
        .map_err(|_| invalid_token())?;
    let now = Utc::now();

    state
        .store
        .transaction(|db| {
            let session = db
                .session_for_user(claims.user_id)
                .ok_or_else(|| ApiError::authentication("Session not found"))?;
            if session.id != claims.session_id {
                return Err(ApiError::authentication("Session not found"));
            }
            if !session.otp_matches(&otp, now) {
                return Err(otp_mismatch());
            }
            let session = db
                .session_for_user_mut(claims.user_id)
                .ok_or_else(|| ApiError::internal("Session disappeared"))?;
            session.complete_two_factor();

            let user = db
                .user_by_id_mut(claims.user_id)
                .ok_or_else(invalid_token)?;
            user.is_password_reset_required = true;
            user.updated_at = now;
            Ok(())
        })
        .await?;

    let binding = SessionBinding {
        session_id: claims.session_id,
        user_id: claims.user_id,
        device_id: claims.device_id,
        ip_address: claims.ip_address,
        user_agent: claims.user_agent,
    };
    let signed = state
        .tokens
        .sign_verification(&binding, scope)
        .map_err(|_| ApiError::internal("Could not issue verification token"))?;
    Ok(ChallengeOutcome {
        verification_token: signed.token,
        expires_at: signed.expires_at,
    })
}

/// Final forgot-password step: set the new password and kill the
/// challenge session so the user logs in fresh.
pub async fn reset_password(
    state: &AppState,
    token: String,
    new_password: String,
) -> Result<(), ApiError> {
    let (claims, scope) = state
        .tokens
        .verify_verification(&token, AuthPurpose::ForgotPassword)
        .map_err(|_| invalid_token())?;
    let VerificationScope::ForgotPassword { email } = scope else {
        return Err(invalid_token());
    };
    validate_password(&new_password)?;
    let hashed = state.hasher.hash_password(&new_password);
    let now = Utc::now();
    let user_id = claims.user_id;
    let session_id = claims.session_id;

    state
        .store
        .transaction(move |db| {
            let session = db
                .session_for_user(user_id)
                .ok_or_else(|| ApiError::authentication("Session not found"))?;
            if session.id != session_id {
                return Err(ApiError::authentication("Session not found"));
            }
            if !session.is_two_factor_verified {
                return Err(ApiError::authentication("Verification required"));
            }

            let user = db.user_by_id_mut(user_id).ok_or_else(invalid_token)?;
            if user.email != email {
                return Err(invalid_token());
            }
            if !user.is_password_reset_required {
                return Err(ApiError::authentication("Verification required"));
            }
            user.password = hashed;
            user.is_password_reset_required = false;
            user.updated_at = now;

            db.delete_session(user_id);
            Ok(())
        })
        .await?;

    tracing::info!(%user_id, "password reset");
    Ok(())
}

/// Change the password of a logged-in user. The session survives; only
/// the credential changes.
pub async fn change_password(
    state: &AppState,
    user_id: Uuid,
    current_password: String,
    new_password: String,
) -> Result<(), ApiError> {
    validate_password(&new_password)?;
    let hashed = state.hasher.hash_password(&new_password);
    let hasher = state.hasher.clone();

    state
        .store
        .transaction(move |db| {
            let user = db
                .user_by_id_mut(user_id)
                .ok_or_else(invalid_token)?;
            if !hasher.verify_password(&current_password, &user.password) {
                return Err(ApiError::authentication("Current password is incorrect"));
            }
            user.password = hashed;
            user.is_password_reset_required = false;
            user.updated_at = Utc::now();
            Ok(())
        })
        .await
}

/// Soft-delete the account. Email and phone stay reserved; the session
/// is dropped so the tokens die immediately.
pub async fn delete_account(state: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    state
        .store
        .transaction(move |db| {
            let user = db
                .user_by_id_mut(user_id)
                .ok_or_else(invalid_token)?;
            let now = Utc::now();
            user.status = UserStatus::Deleted;
            user.deleted_at = Some(now);
            user.updated_at = now;
            db.delete_session(user_id);
            Ok(())
        })
        .await?;
    tracing::info!(%user_id, "account deleted");
    Ok(())
}

/// Start BVN verification for an authenticated, email-verified user.
/// Arms the OTP slot on the live session and binds the submission into
/// the challenge token.
pub async fn initiate_bvn_verification(
    state: &AppState,
    user: &User,
    session: &Session,
    submission: KycSubmission,
) -> Result<ChallengeOutcome, ApiError> {
    if user.is_kyc_verified {
        return Err(ApiError::state_conflict("KYC already completed"));
    }
    if !user.is_email_verified {
        return Err(ApiError::state_conflict("Verify your email address first"));
    }
    validate_bvn(&submission.bvn)?;
    if submission.first_name.trim().is_empty() || submission.last_name.trim().is_empty() {
        return Err(ApiError::validation("First and last name are required"));
    }

    // Blacklist check is fatal to the flow: the user is marked and the
    // session destroyed, so the tokens they hold die with it
    let records = state.verifier.karma_lookup(&submission.bvn).await?;
    if records.iter().any(|r| r.is_disqualifying()) {
        let user_id = user.id;
        let now = Utc::now();
        state
            .store
            .transaction(move |db| {
                if let Some(user) = db.user_by_id_mut(user_id) {
                    user.status = UserStatus::Blacklisted;
                    user.is_blacklisted = true;
                    user.updated_at = now;
                }
                db.delete_session(user_id);
                Ok(())
            })
            .await?;
        tracing::warn!(%user_id, "user blacklisted by karma lookup");
        return Err(ApiError::authentication("Account is not in good standing"));
    }

    let otp = generate_otp();
    let binding = SessionBinding {
        session_id: session.id,
        user_id: user.id,
        device_id: session.device_id.clone(),
        ip_address: session.ip_address.clone(),
        user_agent: session.user_agent.clone(),
    };
    let signed = state
        .tokens
        .sign_verification(&binding, VerificationScope::Bvn { submission })
        .map_err(|_| ApiError::internal("Could not issue verification token"))?;

    let session_id = session.id;
    let user_id = user.id;
    let expires_at = signed.expires_at;
    {
        let otp = otp.clone();
        state
            .store
            .transaction(move |db| {
                let session = db
                    .session_for_user_mut(user_id)
                    .filter(|s| s.id == session_id)
                    .ok_or_else(|| ApiError::authentication("Session not found"))?;
                session.arm_two_factor(otp, expires_at);
                Ok(())
            })
            .await?;
    }

    state
        .mailer
        .send_otp(&user.email, "Your BVN verification code", &otp)
        .await;
    Ok(ChallengeOutcome {
        verification_token: signed.token,
        expires_at,
    })
}

/// Complete BVN verification: OTP, provider cross-check, then profile
/// capture and wallet provisioning in one atomic commit.
pub async fn verify_bvn(
    state: &AppState,
    token: String,
    otp: String,
) -> Result<UserProfile, ApiError> {
    let (claims, scope) = state
        .tokens
        .verify_verification(&token, AuthPurpose::Bvn)
        .map_err(|_| invalid_token())?;
    let VerificationScope::Bvn { submission } = scope else {
        return Err(invalid_token());
    };
    let now = Utc::now();
    let user_id = claims.user_id;
    let session_id = claims.session_id;

    // Cheap OTP pre-check before the provider round-trip
    let otp_ok = state
        .store
        .read(|db| {
            db.session_for_user(user_id)
                .filter(|s| s.id == session_id)
                .map(|s| s.otp_matches(&otp, now))
        })
        .await;
    match otp_ok {
        Some(true) => {}
        Some(false) => return Err(otp_mismatch()),
        None => return Err(ApiError::authentication("Session not found")),
    }

    let record = state.verifier.bvn_lookup(&submission.bvn).await?;
    let matches = record
        .first_name
        .eq_ignore_ascii_case(&submission.first_name)
        && record.last_name.eq_ignore_ascii_case(&submission.last_name)
        && record.date_of_birth == submission.date_of_birth
        && record.gender.eq_ignore_ascii_case(&submission.gender);
    if !matches {
        tracing::info!(user_id = %claims.user_id, "bvn details mismatch");
        return Err(ApiError::state_conflict(
            "Submitted details do not match the BVN record",
        ));
    }

    let result = state
        .store
        .transaction(move |db| {
            let session = db
                .session_for_user(user_id)
                .ok_or_else(|| ApiError::authentication("Session not found"))?;
            if session.id != session_id {
                return Err(ApiError::authentication("Session not found"));
            }
            if !session.otp_matches(&otp, now) {
                return Err(otp_mismatch());
            }

            let user = db.user_by_id_mut(user_id).ok_or_else(invalid_token)?;
            if user.is_kyc_verified {
                return Err(ApiError::state_conflict("KYC already completed"));
            }
            user.is_kyc_verified = true;
            user.updated_at = now;
            let user_snapshot = user.clone();

            let profile = Profile {
                user_id,
                first_name: submission.first_name.clone(),
                last_name: submission.last_name.clone(),
                date_of_birth: submission.date_of_birth.clone(),
                gender: submission.gender.clone(),
                address: None,
                created_at: now,
            };
            db.put_profile(profile.clone());

            // Account number is the last ten digits of the phone
            let digits: String = user_snapshot
                .phone
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            let account_number = digits
                .len()
                .checked_sub(10)
                .map(|start| digits[start..].to_string())
                .ok_or_else(|| ApiError::internal("Phone number too short for an account"))?;
            let account_name = format!("{} {}", submission.first_name, submission.last_name);
            db.insert_wallet(Wallet::new(user_id, account_name, account_number))?;

            let session = db
                .session_for_user_mut(user_id)
                .ok_or_else(|| ApiError::internal("Session disappeared"))?;
            session.complete_two_factor();

            Ok(UserProfile::project(&user_snapshot, Some(&profile)))
        })
        .await;

    if result.is_ok() {
        tracing::info!(%user_id, "kyc completed, wallet provisioned");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hashing::CredentialHasher;
    use crate::config::TokenConfig;
    use crate::services::kyc::testing::MockVerifier;
    use crate::services::kyc::KycProfile;
    use crate::services::mailer::testing::RecordingMailer;
    use crate::store::Store;
    use crate::token::TokenCodec;
    use std::sync::Arc;

    struct Harness {
        state: AppState,
        mailer: Arc<RecordingMailer>,
        verifier: Arc<MockVerifier>,
    }

    fn harness() -> Harness {
        // jsonwebtoken signs through the process-level rustls provider
        let _ = rustls::crypto::ring::default_provider().install_default();
        let mailer = Arc::new(RecordingMailer::default());
        let verifier = Arc::new(MockVerifier::default());
        let state = AppState {
            store: Store::new(),
            tokens: Arc::new(TokenCodec::new(&TokenConfig {
                access_secret: "a".into(),
                access_expiration_secs: 900,
                refresh_secret: "r".into(),
                refresh_expiration_secs: 604_800,
                verification_secret: "v".into(),
                verification_expiration_secs: 600,
            })),
            hasher: CredentialHasher::new("pepper".into()),
            mailer: mailer.clone(),
            verifier: verifier.clone(),
        };
        Harness {
            state,
            mailer,
            verifier,
        }
    }

    fn device() -> DeviceContext {
        DeviceContext {
            device_id: "dev-1".into(),
            ip_address: "127.0.0.1".into(),
            user_agent: "test".into(),
        }
    }

    const EMAIL: &str = "ada@x.com";
    const PHONE: &str = "08011111111";
    const PASSWORD: &str = "correct-horse";

    async fn signed_up(h: &Harness) -> SignupOutcome {
        signup(
            &h.state,
            EMAIL.into(),
            PHONE.into(),
            PASSWORD.into(),
            None,
            device(),
        )
        .await
        .unwrap()
    }

    async fn verified_user(h: &Harness) -> UserProfile {
        let outcome = signed_up(h).await;
        let otp = h.mailer.last_otp_for(EMAIL).unwrap();
        verify_email(&h.state, outcome.verification_token, otp)
            .await
            .unwrap()
    }

    async fn logged_in(h: &Harness) -> LoginOutcome {
        verified_user(h).await;
        let challenge = initiate_auth(&h.state, EMAIL.into(), PASSWORD.into(), device())
            .await
            .unwrap();
        let otp = h.mailer.last_otp_for(EMAIL).unwrap();
        login(&h.state, challenge.verification_token, otp)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn signup_then_verify_email() {
        let h = harness();
        let outcome = signed_up(&h).await;
        assert_eq!(outcome.user.status, UserStatus::Unverified);
        // Signup hands out a live token pair alongside the challenge
        assert!(!outcome.access_token.is_empty());
        assert!(!outcome.refresh_token.is_empty());

        let otp = h.mailer.last_otp_for(EMAIL).unwrap();
        let profile = verify_email(&h.state, outcome.verification_token, otp)
            .await
            .unwrap();
        assert!(profile.is_email_verified);
        assert_eq!(profile.status, UserStatus::Verified);

        // The signup session survives email verification
        let alive = h
            .state
            .store
            .read(|db| db.session_for_user(outcome.user.user_id).is_some())
            .await;
        assert!(alive);
    }

    #[tokio::test]
    async fn blacklisted_identity_cannot_sign_up() {
        let h = harness();
        h.verifier.blacklist(EMAIL);
        let err = signup(
            &h.state,
            EMAIL.into(),
            PHONE.into(),
            PASSWORD.into(),
            None,
            device(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);

        let created = h.state.store.read(|db| db.user_by_email(EMAIL).cloned()).await;
        assert!(created.is_none());
    }

    #[tokio::test]
    async fn blacklist_outage_fails_closed() {
        let h = harness();
        *h.verifier.fail_karma.lock().unwrap() = true;
        let err = signup(
            &h.state,
            EMAIL.into(),
            PHONE.into(),
            PASSWORD.into(),
            None,
            device(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, ApiError::upstream("Identity verification is unavailable"));
    }

    #[tokio::test]
    async fn duplicate_signup_is_rejected() {
        let h = harness();
        signed_up(&h).await;
        let err = signup(
            &h.state,
            EMAIL.into(),
            "08099999999".into(),
            PASSWORD.into(),
            None,
            device(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, ApiError::conflict("Email already registered"));
    }

    #[tokio::test]
    async fn login_succeeds_with_correct_otp() {
        let h = harness();
        let outcome = logged_in(&h).await;
        assert!(!outcome.access_token.is_empty());
        assert!(!outcome.refresh_token.is_empty());
        assert!(outcome.user.last_login.is_some());
        assert!(outcome.refresh_token_expires_at > outcome.access_token_expires_at);
    }

    #[tokio::test]
    async fn wrong_login_otp_leaves_the_challenge_open() {
        let h = harness();
        verified_user(&h).await;
        let challenge = initiate_auth(&h.state, EMAIL.into(), PASSWORD.into(), device())
            .await
            .unwrap();

        let err = login(&h.state, challenge.verification_token.clone(), "000000".into())
            .await
            .unwrap_err();
        assert_eq!(err, otp_mismatch());

        // The challenge survives the typo; the right code still works
        let otp = h.mailer.last_otp_for(EMAIL).unwrap();
        let outcome = login(&h.state, challenge.verification_token, otp)
            .await
            .unwrap();
        assert!(!outcome.access_token.is_empty());
    }

    #[tokio::test]
    async fn wrong_email_otp_does_not_log_the_user_out() {
        let h = harness();
        let outcome = signed_up(&h).await;

        let err = verify_email(
            &h.state,
            outcome.verification_token.clone(),
            "000000".into(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, otp_mismatch());

        // The signup session and its tokens survive the typo
        let alive = h
            .state
            .store
            .read(|db| db.session_for_user(outcome.user.user_id).is_some())
            .await;
        assert!(alive);

        let otp = h.mailer.last_otp_for(EMAIL).unwrap();
        let profile = verify_email(&h.state, outcome.verification_token, otp)
            .await
            .unwrap();
        assert!(profile.is_email_verified);
    }

    #[tokio::test]
    async fn wrong_password_is_generic() {
        let h = harness();
        verified_user(&h).await;
        let err = initiate_auth(&h.state, EMAIL.into(), "wrong-password".into(), device())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::state_conflict("Invalid email or password"));

        let err = initiate_auth(&h.state, "ghost@x.com".into(), PASSWORD.into(), device())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::state_conflict("Invalid email or password"));
    }

    #[tokio::test]
    async fn new_login_replaces_the_old_session() {
        let h = harness();
        let first = logged_in(&h).await;

        let challenge = initiate_auth(&h.state, EMAIL.into(), PASSWORD.into(), device())
            .await
            .unwrap();
        let otp = h.mailer.last_otp_for(EMAIL).unwrap();
        let second = login(&h.state, challenge.verification_token, otp)
            .await
            .unwrap();

        assert_ne!(first.user.session_id, second.user.session_id);
        // The first session's refresh token is dead
        let err = refresh(&h.state, first.refresh_token).await.unwrap_err();
        assert_eq!(err, invalid_token());
    }

    #[tokio::test]
    async fn refresh_rotates_the_token_pair() {
        let h = harness();
        let outcome = logged_in(&h).await;
        let old_refresh = outcome.refresh_token.clone();
        let rotated = refresh(&h.state, outcome.refresh_token).await.unwrap();
        assert!(!rotated.access_token.is_empty());

        let (stored_access, stored_refresh) = h
            .state
            .store
            .read(|db| {
                db.session_for_user(outcome.user.user_id)
                    .map(|s| (s.access_token.clone(), s.refresh_token.clone()))
            })
            .await
            .unwrap();
        assert_eq!(stored_access, rotated.access_token);
        assert_eq!(stored_refresh, rotated.refresh_token);

        // The presented refresh token was overwritten and is dead
        let err = refresh(&h.state, old_refresh).await.unwrap_err();
        assert_eq!(err, invalid_token());
    }

    #[tokio::test]
    async fn access_token_cannot_refresh() {
        let h = harness();
        let outcome = logged_in(&h).await;
        let err = refresh(&h.state, outcome.access_token).await.unwrap_err();
        assert_eq!(err, invalid_token());
    }

    #[tokio::test]
    async fn logout_drops_the_session_and_is_idempotent() {
        let h = harness();
        let outcome = logged_in(&h).await;
        logout(&h.state, outcome.user.user_id, outcome.user.session_id)
            .await
            .unwrap();

        let gone = h
            .state
            .store
            .read(|db| db.session_for_user(outcome.user.user_id).is_none())
            .await;
        assert!(gone);

        // Logging out again with no session is not an error
        logout(&h.state, outcome.user.user_id, outcome.user.session_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn forgot_password_resets_end_to_end() {
        let h = harness();
        verified_user(&h).await;

        let challenge = forgot_password(&h.state, EMAIL.into(), device())
            .await
            .unwrap()
            .unwrap();
        let otp = h.mailer.last_otp_for(EMAIL).unwrap();
        let reset = verify_forgot_password(&h.state, challenge.verification_token, otp)
            .await
            .unwrap();
        reset_password(&h.state, reset.verification_token, "new-password-1".into())
            .await
            .unwrap();

        // Old password dead, new one works
        let err = initiate_auth(&h.state, EMAIL.into(), PASSWORD.into(), device())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::state_conflict("Invalid email or password"));
        assert!(
            initiate_auth(&h.state, EMAIL.into(), "new-password-1".into(), device())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn forgot_password_is_silent_for_unknown_email() {
        let h = harness();
        let outcome = forgot_password(&h.state, "ghost@x.com".into(), device())
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn reset_without_otp_verification_is_rejected() {
        let h = harness();
        verified_user(&h).await;
        let challenge = forgot_password(&h.state, EMAIL.into(), device())
            .await
            .unwrap()
            .unwrap();

        // Skip verify_forgot_password entirely
        let err = reset_password(&h.state, challenge.verification_token, "new-password-1".into())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::authentication("Verification required"));
    }

    fn submission() -> KycSubmission {
        KycSubmission {
            bvn: "12345678901".into(),
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            date_of_birth: "1990-01-01".into(),
            gender: "female".into(),
        }
    }

    fn provider_profile() -> KycProfile {
        KycProfile {
            first_name: "ADA".into(),
            last_name: "OBI".into(),
            date_of_birth: "1990-01-01".into(),
            gender: "Female".into(),
        }
    }

    async fn auth_parts(h: &Harness) -> (User, Session) {
        let outcome = logged_in(h).await;
        h.state
            .store
            .read(|db| {
                let user = db.user_by_id(outcome.user.user_id).cloned().unwrap();
                let session = db.session_for_user(outcome.user.user_id).cloned().unwrap();
                (user, session)
            })
            .await
    }

    #[tokio::test]
    async fn bvn_verification_provisions_a_wallet() {
        let h = harness();
        h.verifier.register_bvn("12345678901", provider_profile());
        let (user, session) = auth_parts(&h).await;

        let challenge = initiate_bvn_verification(&h.state, &user, &session, submission())
            .await
            .unwrap();
        let otp = h.mailer.last_otp_for(EMAIL).unwrap();
        let profile = verify_bvn(&h.state, challenge.verification_token, otp)
            .await
            .unwrap();
        assert!(profile.is_kyc_verified);
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));

        let wallet = h
            .state
            .store
            .read(|db| db.wallet_for_user(user.id).cloned())
            .await
            .unwrap();
        // Last ten digits of 08011111111
        assert_eq!(wallet.account_number, "8011111111");
        assert_eq!(wallet.account_name, "Ada Obi");
        assert_eq!(wallet.balance, rust_decimal::Decimal::ZERO);
    }

    #[tokio::test]
    async fn karma_hit_during_bvn_blacklists_and_kills_the_session() {
        let h = harness();
        h.verifier.register_bvn("12345678901", provider_profile());
        let outcome = logged_in(&h).await;
        let (user, session) = h
            .state
            .store
            .read(|db| {
                let user = db.user_by_id(outcome.user.user_id).cloned().unwrap();
                let session = db.session_for_user(outcome.user.user_id).cloned().unwrap();
                (user, session)
            })
            .await;
        h.verifier.blacklist("12345678901");

        let err = initiate_bvn_verification(&h.state, &user, &session, submission())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::authentication("Account is not in good standing")
        );

        let (status, session_gone) = h
            .state
            .store
            .read(|db| {
                (
                    db.user_by_id(user.id).unwrap().status,
                    db.session_for_user(user.id).is_none(),
                )
            })
            .await;
        assert_eq!(status, UserStatus::Blacklisted);
        assert!(session_gone);

        // The tokens minted at login are dead along with the session
        let err = refresh(&h.state, outcome.refresh_token).await.unwrap_err();
        assert_eq!(err, ApiError::authentication("Session not found"));
    }

    #[tokio::test]
    async fn bvn_record_mismatch_is_rejected() {
        let h = harness();
        let mut record = provider_profile();
        record.last_name = "NWOSU".into();
        h.verifier.register_bvn("12345678901", record);
        let (user, session) = auth_parts(&h).await;

        let challenge = initiate_bvn_verification(&h.state, &user, &session, submission())
            .await
            .unwrap();
        let otp = h.mailer.last_otp_for(EMAIL).unwrap();
        let err = verify_bvn(&h.state, challenge.verification_token, otp)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::state_conflict("Submitted details do not match the BVN record")
        );

        let no_wallet = h
            .state
            .store
            .read(|db| db.wallet_for_user(user.id).is_none())
            .await;
        assert!(no_wallet);
    }

    #[tokio::test]
    async fn bvn_flow_requires_verified_email() {
        let h = harness();
        signed_up(&h).await;
        let (user, session) = h
            .state
            .store
            .read(|db| {
                let user = db.user_by_email(EMAIL).cloned().unwrap();
                let session = db.session_for_user(user.id).cloned().unwrap();
                (user, session)
            })
            .await;

        let err = initiate_bvn_verification(&h.state, &user, &session, submission())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::state_conflict("Verify your email address first")
        );
    }

    #[tokio::test]
    async fn email_challenge_cannot_complete_the_login_flow() {
        let h = harness();
        let outcome = signed_up(&h).await;
        let otp = h.mailer.last_otp_for(EMAIL).unwrap();
        // Email-scoped token presented to the login endpoint
        let err = login(&h.state, outcome.verification_token, otp)
            .await
            .unwrap_err();
        assert_eq!(err, invalid_token());
    }
}
