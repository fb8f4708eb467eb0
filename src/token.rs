// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! # Token Codec
//!
//! Signs and verifies the three bearer-token kinds (access, refresh,
//! verification) as HS256 JWTs, each under its own secret and expiry.
//!
//! The claim set carries the token kind as a tagged union, so a decoder
//! for one kind can only ever produce claims of that kind — a refresh
//! token can never pass an access-token check even if the secrets were
//! misconfigured to match. Pure functions over configured key material;
//! no storage.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::TokenConfig;

/// KYC details submitted at BVN-verification initiation, carried inside
/// the bvn-scoped verification token until the OTP challenge completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct KycSubmission {
    pub bvn: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
}

/// Purpose of a verification token's OTP sub-flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPurpose {
    Email,
    Bvn,
    Login,
    ForgotPassword,
}

/// Scope payload of a verification token, tagged by `auth_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "auth_type", rename_all = "snake_case")]
pub enum VerificationScope {
    Email { email: String },
    Bvn { submission: KycSubmission },
    Login { email: String },
    ForgotPassword { email: String },
}

impl VerificationScope {
    pub fn purpose(&self) -> AuthPurpose {
        match self {
            VerificationScope::Email { .. } => AuthPurpose::Email,
            VerificationScope::Bvn { .. } => AuthPurpose::Bvn,
            VerificationScope::Login { .. } => AuthPurpose::Login,
            VerificationScope::ForgotPassword { .. } => AuthPurpose::ForgotPassword,
        }
    }
}

/// Token kind discriminator, tagged by `type` inside the signed claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Verification {
        #[serde(flatten)]
        scope: VerificationScope,
    },
}

/// Claim set carried inside every signed token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub device_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub exp: i64,
    #[serde(flatten)]
    pub kind: TokenKind,
}

/// Session identity a token is bound to.
#[derive(Debug, Clone)]
pub struct SessionBinding {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub device_id: String,
    pub ip_address: String,
    pub user_agent: String,
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Codec errors. Callers map these to a generic authentication failure;
/// the variant is for logging only and never reaches API clients.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
    #[error("token kind mismatch")]
    WrongKind,
    #[error("token signing failed")]
    Signing,
}

struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KindKeys {
    fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }
}

/// Signs and verifies all three token kinds. One instance per process,
/// constructed from [`TokenConfig`] and injected through `AppState`.
pub struct TokenCodec {
    access: KindKeys,
    refresh: KindKeys,
    verification: KindKeys,
}

impl TokenCodec {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            access: KindKeys::new(&config.access_secret, config.access_expiration_secs),
            refresh: KindKeys::new(&config.refresh_secret, config.refresh_expiration_secs),
            verification: KindKeys::new(
                &config.verification_secret,
                config.verification_expiration_secs,
            ),
        }
    }

    pub fn sign_access(&self, binding: &SessionBinding) -> Result<SignedToken, TokenError> {
        self.sign(&self.access, binding, TokenKind::Access)
    }

    pub fn sign_refresh(&self, binding: &SessionBinding) -> Result<SignedToken, TokenError> {
        self.sign(&self.refresh, binding, TokenKind::Refresh)
    }

    pub fn sign_verification(
        &self,
        binding: &SessionBinding,
        scope: VerificationScope,
    ) -> Result<SignedToken, TokenError> {
        self.sign(&self.verification, binding, TokenKind::Verification { scope })
    }

    /// Decode an access token. Only claims of kind `access` can come out.
    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = Self::decode_kind(&self.access, token)?;
        match claims.kind {
            TokenKind::Access => Ok(claims),
            _ => Err(TokenError::WrongKind),
        }
    }

    /// Decode a refresh token. Only claims of kind `refresh` can come out.
    pub fn verify_refresh(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = Self::decode_kind(&self.refresh, token)?;
        match claims.kind {
            TokenKind::Refresh => Ok(claims),
            _ => Err(TokenError::WrongKind),
        }
    }

    /// Decode a verification token scoped to `purpose`. A token minted
    /// for a different sub-flow fails with `WrongKind`.
    pub fn verify_verification(
        &self,
        token: &str,
        purpose: AuthPurpose,
    ) -> Result<(TokenClaims, VerificationScope), TokenError> {
        let claims = Self::decode_kind(&self.verification, token)?;
        match &claims.kind {
            TokenKind::Verification { scope } if scope.purpose() == purpose => {
                let scope = scope.clone();
                Ok((claims, scope))
            }
            _ => Err(TokenError::WrongKind),
        }
    }

    fn sign(
        &self,
        keys: &KindKeys,
        binding: &SessionBinding,
        kind: TokenKind,
    ) -> Result<SignedToken, TokenError> {
        let expires_at = Utc::now() + keys.ttl;
        let claims = TokenClaims {
            device_id: binding.device_id.clone(),
            ip_address: binding.ip_address.clone(),
            user_agent: binding.user_agent.clone(),
            session_id: binding.session_id,
            user_id: binding.user_id,
            exp: expires_at.timestamp(),
            kind,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|_| TokenError::Signing)?;
        Ok(SignedToken { token, expires_at })
    }

    fn decode_kind(keys: &KindKeys, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<TokenClaims>(token, &keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // jsonwebtoken signs through the process-level rustls provider
    fn install_crypto() {
        let _ = rustls::crypto::ring::default_provider().install_default();
    }

    fn codec() -> TokenCodec {
        install_crypto();
        TokenCodec::new(&TokenConfig {
            access_secret: "access-secret".into(),
            access_expiration_secs: 900,
            refresh_secret: "refresh-secret".into(),
            refresh_expiration_secs: 604_800,
            verification_secret: "verification-secret".into(),
            verification_expiration_secs: 600,
        })
    }

    fn binding() -> SessionBinding {
        install_crypto();
        SessionBinding {
            session_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            device_id: "device-1".into(),
            ip_address: "10.0.0.1".into(),
            user_agent: "test-agent".into(),
        }
    }

    #[test]
    fn access_token_round_trips() {
        let codec = codec();
        let binding = binding();
        let signed = codec.sign_access(&binding).unwrap();

        let claims = codec.verify_access(&signed.token).unwrap();
        assert_eq!(claims.session_id, binding.session_id);
        assert_eq!(claims.user_id, binding.user_id);
        assert_eq!(claims.device_id, "device-1");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn refresh_token_rejected_by_access_decoder() {
        let codec = codec();
        let signed = codec.sign_refresh(&binding()).unwrap();
        // Different secret, so the signature check alone rejects it
        assert!(matches!(
            codec.verify_access(&signed.token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn kind_check_holds_even_with_shared_secrets() {
        // All three kinds keyed identically; the discriminator must
        // still keep them apart.
        let shared = TokenCodec::new(&TokenConfig {
            access_secret: "same".into(),
            access_expiration_secs: 900,
            refresh_secret: "same".into(),
            refresh_expiration_secs: 900,
            verification_secret: "same".into(),
            verification_expiration_secs: 900,
        });
        let refresh = shared.sign_refresh(&binding()).unwrap();
        assert!(matches!(
            shared.verify_access(&refresh.token),
            Err(TokenError::WrongKind)
        ));
    }

    #[test]
    fn verification_scope_round_trips() {
        let codec = codec();
        let binding = binding();
        let signed = codec
            .sign_verification(
                &binding,
                VerificationScope::Login {
                    email: "a@x.com".into(),
                },
            )
            .unwrap();

        let (claims, scope) = codec
            .verify_verification(&signed.token, AuthPurpose::Login)
            .unwrap();
        assert_eq!(claims.session_id, binding.session_id);
        assert_eq!(
            scope,
            VerificationScope::Login {
                email: "a@x.com".into()
            }
        );
    }

    #[test]
    fn verification_purpose_mismatch_is_rejected() {
        let codec = codec();
        let signed = codec
            .sign_verification(
                &binding(),
                VerificationScope::Email {
                    email: "a@x.com".into(),
                },
            )
            .unwrap();

        assert!(matches!(
            codec.verify_verification(&signed.token, AuthPurpose::Login),
            Err(TokenError::WrongKind)
        ));
    }

    #[test]
    fn bvn_scope_carries_submission() {
        let codec = codec();
        let submission = KycSubmission {
            bvn: "12345678901".into(),
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            date_of_birth: "1990-01-01".into(),
            gender: "female".into(),
        };
        let signed = codec
            .sign_verification(
                &binding(),
                VerificationScope::Bvn {
                    submission: submission.clone(),
                },
            )
            .unwrap();

        let (_, scope) = codec
            .verify_verification(&signed.token, AuthPurpose::Bvn)
            .unwrap();
        assert_eq!(scope, VerificationScope::Bvn { submission });
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = TokenCodec::new(&TokenConfig {
            access_secret: "access-secret".into(),
            access_expiration_secs: -60,
            refresh_secret: "r".into(),
            refresh_expiration_secs: 900,
            verification_secret: "v".into(),
            verification_expiration_secs: 900,
        });
        let signed = codec.sign_access(&binding()).unwrap();
        assert!(matches!(
            codec.verify_access(&signed.token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert!(matches!(
            codec().verify_access("not-a-jwt"),
            Err(TokenError::Invalid)
        ));
    }
}
