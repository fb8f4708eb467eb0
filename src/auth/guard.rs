// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Access guard for protected routes.
//!
//! Rejection order for a presented access token:
//!
//! 1. header missing or malformed
//! 2. signature/decoding failure (wrong kind included)
//! 3. unknown user or no active session
//! 4. token does not belong to the active session
//! 5. session refresh expiry passed (the session is deleted here)
//! 6. session access expiry passed (client must refresh)
//! 7. user barred (suspended, blacklisted or deleted)
//!
//! All rejections are 401 with a user-safe message; only step 5 mutates
//! state.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use chrono::Utc;

use crate::error::ApiError;
use crate::models::{Session, User};
use crate::state::AppState;

/// The authenticated caller, as proven by a live access token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub session: Session,
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::authentication("Authentication required"))
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state
            .tokens
            .verify_access(token)
            .map_err(|_| ApiError::authentication("Invalid or expired token"))?;

        let now = Utc::now();

        enum Gate {
            Pass(Box<AuthContext>),
            SessionExpired,
            Deny(ApiError),
        }

        let gate = state
            .store
            .read(|db| {
                let Some(user) = db.user_by_id(claims.user_id).cloned() else {
                    return Gate::Deny(ApiError::authentication("Invalid or expired token"));
                };
                let Some(session) = db.session_for_user(claims.user_id).cloned() else {
                    return Gate::Deny(ApiError::authentication("Session not found"));
                };

                if session.id != claims.session_id {
                    return Gate::Deny(ApiError::authentication("Session not found"));
                }
                if now >= session.refresh_token_expires_at {
                    return Gate::SessionExpired;
                }
                if now >= session.access_token_expires_at {
                    return Gate::Deny(ApiError::authentication("Access token expired"));
                }
                if user.is_barred() {
                    return Gate::Deny(ApiError::authentication("Account is not in good standing"));
                }

                Gate::Pass(Box::new(AuthContext { user, session }))
            })
            .await;

        match gate {
            Gate::Pass(context) => Ok(*context),
            Gate::Deny(error) => Err(error),
            Gate::SessionExpired => {
                // Fail closed: the dead session is removed before the
                // caller hears about it. The id check guards against a
                // session replaced between the read and this write.
                state
                    .store
                    .transaction(|db| {
                        if db.session_for_user(claims.user_id).map(|s| s.id)
                            == Some(claims.session_id)
                        {
                            db.delete_session(claims.user_id);
                        }
                        Ok(())
                    })
                    .await?;
                Err(ApiError::authentication(
                    "Session expired, please log in again",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hashing::CredentialHasher;
    use crate::config::TokenConfig;
    use crate::models::UserStatus;
    use crate::services::kyc::testing::MockVerifier;
    use crate::services::mailer::testing::RecordingMailer;
    use crate::store::Store;
    use crate::token::{SessionBinding, TokenCodec};
    use axum::http::Request;
    use chrono::Duration;
    use std::sync::Arc;
    use uuid::Uuid;

    fn test_state() -> AppState {
        // jsonwebtoken signs through the process-level rustls provider
        let _ = rustls::crypto::ring::default_provider().install_default();
        AppState {
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
            mailer: Arc::new(RecordingMailer::default()),
            verifier: Arc::new(MockVerifier::default()),
        }
    }

    async fn seed_session(state: &AppState, status: UserStatus, refresh_ttl: Duration) -> String {
        let mut user = User::new(
            "a@x.com".into(),
            "08011111111".into(),
            "hash".into(),
            "UTC".into(),
        );
        user.status = status;
        let user_id = user.id;
        let session_id = Uuid::new_v4();

        let binding = SessionBinding {
            session_id,
            user_id,
            device_id: "dev".into(),
            ip_address: "127.0.0.1".into(),
            user_agent: "test".into(),
        };
        let access = state.tokens.sign_access(&binding).unwrap();
        let refresh = state.tokens.sign_refresh(&binding).unwrap();
        let now = Utc::now();
        let token = access.token.clone();

        state
            .store
            .transaction(|db| {
                db.insert_user(user.clone())?;
                db.replace_session(Session {
                    id: session_id,
                    user_id,
                    device_id: "dev".into(),
                    ip_address: "127.0.0.1".into(),
                    user_agent: "test".into(),
                    access_token: access.token.clone(),
                    access_token_expires_at: now + Duration::minutes(15),
                    refresh_token: refresh.token.clone(),
                    refresh_token_expires_at: now + refresh_ttl,
                    expires_at: now + refresh_ttl,
                    two_factor_code: None,
                    two_factor_code_expires_at: None,
                    is_two_factor_verified: true,
                    two_factor_verified_at: Some(now),
                    created_at: now,
                    updated_at: now,
                });
                Ok(())
            })
            .await
            .unwrap();

        token
    }

    async fn run_guard(state: &AppState, token: &str) -> Result<AuthContext, ApiError> {
        let request = Request::builder()
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        AuthContext::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn valid_token_passes() {
        let state = test_state();
        let token = seed_session(&state, UserStatus::Verified, Duration::days(7)).await;
        let context = run_guard(&state, &token).await.unwrap();
        assert_eq!(context.user.email, "a@x.com");
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let state = test_state();
        let request = Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        let err = AuthContext::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::authentication("Authentication required"));
    }

    #[tokio::test]
    async fn past_refresh_expiry_deletes_the_session() {
        let state = test_state();
        // Session row already past its refresh expiry even though the
        // signed token itself is still valid
        let token = seed_session(&state, UserStatus::Verified, Duration::minutes(-1)).await;

        let err = run_guard(&state, &token).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::authentication("Session expired, please log in again")
        );

        let user_id = state
            .store
            .read(|db| db.user_by_email("a@x.com").map(|u| u.id))
            .await
            .unwrap();
        let gone = state
            .store
            .read(|db| db.session_for_user(user_id).is_none())
            .await;
        assert!(gone);
    }

    #[tokio::test]
    async fn barred_user_is_rejected() {
        let state = test_state();
        let token = seed_session(&state, UserStatus::Suspended, Duration::days(7)).await;
        let err = run_guard(&state, &token).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::authentication("Account is not in good standing")
        );
    }

    #[tokio::test]
    async fn refresh_token_is_rejected_by_the_guard() {
        let state = test_state();
        seed_session(&state, UserStatus::Verified, Duration::days(7)).await;
        let user_id = state
            .store
            .read(|db| db.user_by_email("a@x.com").map(|u| u.id))
            .await
            .unwrap();
        let session_id = state
            .store
            .read(|db| db.session_for_user(user_id).map(|s| s.id))
            .await
            .unwrap();

        let refresh = state
            .tokens
            .sign_refresh(&SessionBinding {
                session_id,
                user_id,
                device_id: "dev".into(),
                ip_address: "127.0.0.1".into(),
                user_agent: "test".into(),
            })
            .unwrap();

        let err = run_guard(&state, &refresh.token).await.unwrap_err();
        assert_eq!(err, ApiError::authentication("Invalid or expired token"));
    }
}
