// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and
//! injected into [`crate::state::AppState`]; nothing reads the
//! environment after boot.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `ACCESS_TOKEN_SECRET` | HMAC secret for access tokens | Required |
//! | `ACCESS_TOKEN_EXPIRATION` | Access token TTL (seconds) | `900` |
//! | `REFRESH_TOKEN_SECRET` | HMAC secret for refresh tokens | Required |
//! | `REFRESH_TOKEN_EXPIRATION` | Refresh token TTL (seconds) | `604800` |
//! | `VERIFICATION_TOKEN_SECRET` | HMAC secret for verification tokens | Required |
//! | `VERIFICATION_TOKEN_EXPIRATION` | Verification token / OTP TTL (seconds) | `600` |
//! | `CREDENTIAL_PEPPER` | Server-side key for password/pin hashes | Required |
//! | `ADJUTOR_API_URL` | Identity-verification provider base URL | Required for KYC |
//! | `ADJUTOR_API_KEY` | Identity-verification provider API key | Required for KYC |
//! | `RESEND_API_KEY` | Transactional email API key | Optional (logs instead) |
//! | `RESEND_SENDER` | From address for outbound email | `no-reply@demowallet.test` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;

/// Secrets and expiries for the three token kinds.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub access_expiration_secs: i64,
    pub refresh_secret: String,
    pub refresh_expiration_secs: i64,
    pub verification_secret: String,
    pub verification_expiration_secs: i64,
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub tokens: TokenConfig,
    pub credential_pepper: String,
    pub adjutor_api_url: Option<String>,
    pub adjutor_api_key: Option<String>,
    pub resend_api_key: Option<String>,
    pub resend_sender: String,
}

/// Error raised when a required variable is missing or malformed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {0} is not a valid number")]
    Invalid(&'static str),
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn seconds(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            Err(_) => 8080,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            tokens: TokenConfig {
                access_secret: required("ACCESS_TOKEN_SECRET")?,
                access_expiration_secs: seconds("ACCESS_TOKEN_EXPIRATION", 900)?,
                refresh_secret: required("REFRESH_TOKEN_SECRET")?,
                refresh_expiration_secs: seconds("REFRESH_TOKEN_EXPIRATION", 604_800)?,
                verification_secret: required("VERIFICATION_TOKEN_SECRET")?,
                verification_expiration_secs: seconds("VERIFICATION_TOKEN_EXPIRATION", 600)?,
            },
            credential_pepper: required("CREDENTIAL_PEPPER")?,
            adjutor_api_url: env::var("ADJUTOR_API_URL").ok(),
            adjutor_api_key: env::var("ADJUTOR_API_KEY").ok(),
            resend_api_key: env::var("RESEND_API_KEY").ok(),
            resend_sender: env::var("RESEND_SENDER")
                .unwrap_or_else(|_| "no-reply@demowallet.test".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_falls_back_to_default() {
        // Unset in the test environment
        assert_eq!(seconds("NO_SUCH_EXPIRATION_VAR", 900).unwrap(), 900);
    }

    #[test]
    fn required_reports_missing_variable() {
        let err = required("NO_SUCH_SECRET_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("NO_SUCH_SECRET_VAR")));
    }
}
