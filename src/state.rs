// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Shared application state injected into every handler.

use std::sync::Arc;

use crate::auth::hashing::CredentialHasher;
use crate::config::Config;
use crate::services::kyc::{AdjutorClient, IdentityVerifier, UnconfiguredVerifier};
use crate::services::mailer::{LogMailer, Mailer, ResendMailer};
use crate::store::Store;
use crate::token::TokenCodec;

/// Everything a handler needs. Cheap to clone; all heavy members are
/// behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tokens: Arc<TokenCodec>,
    pub hasher: CredentialHasher,
    pub mailer: Arc<dyn Mailer>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    /// Wire up production state from configuration. Falls back to the
    /// log-only mailer when no Resend key is configured.
    pub fn from_config(config: &Config, verifier: Arc<dyn IdentityVerifier>) -> Self {
        let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
            Some(key) => Arc::new(ResendMailer::new(key.clone(), config.resend_sender.clone())),
            None => {
                tracing::warn!("RESEND_API_KEY not set, emails will only be logged");
                Arc::new(LogMailer)
            }
        };

        Self {
            store: Store::new(),
            tokens: Arc::new(TokenCodec::new(&config.tokens)),
            hasher: CredentialHasher::new(config.credential_pepper.clone()),
            mailer,
            verifier,
        }
    }

    /// Build the identity verifier from configuration. Without provider
    /// credentials, falls back to the unconfigured stand-in.
    pub fn verifier_from_config(config: &Config) -> Arc<dyn IdentityVerifier> {
        match (&config.adjutor_api_url, &config.adjutor_api_key) {
            (Some(url), Some(key)) => Arc::new(AdjutorClient::new(url.clone(), key.clone())),
            _ => {
                tracing::warn!("ADJUTOR_API_URL/KEY not set, identity checks degraded");
                Arc::new(UnconfiguredVerifier)
            }
        }
    }
}
