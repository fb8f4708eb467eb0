// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Identity verification.
//!
//! Two provider calls sit behind the [`IdentityVerifier`] seam: the
//! karma blacklist lookup used at signup, and the BVN record lookup used
//! by the KYC flow. Both are fail-closed: a provider error blocks the
//! operation rather than letting an unchecked identity through.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ApiError;

/// One karma blacklist record for an identity.
#[derive(Debug, Clone, Deserialize)]
pub struct KarmaRecord {
    pub karma_identity: String,
    pub reason: Option<String>,
    pub default_date: Option<String>,
    pub reporting_entity: Option<String>,
}

impl KarmaRecord {
    /// Whether this record disqualifies the identity. A bare row with no
    /// reason and no dated report from a named entity is treated as
    /// noise, not a blacklist hit.
    pub fn is_disqualifying(&self) -> bool {
        self.reason.is_some()
            || (self.default_date.is_some() && self.reporting_entity.is_some())
    }
}

/// The provider's record of a BVN holder, cross-checked against the
/// user's submission before KYC completes.
#[derive(Debug, Clone, Deserialize)]
pub struct KycProfile {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
}

/// Identity-verification provider seam.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Blacklist records for an email or phone identity.
    async fn karma_lookup(&self, identity: &str) -> Result<Vec<KarmaRecord>, ApiError>;

    /// The provider's record for a BVN.
    async fn bvn_lookup(&self, bvn: &str) -> Result<KycProfile, ApiError>;
}

/// Verifier backed by the Adjutor HTTP API.
pub struct AdjutorClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct AdjutorEnvelope<T> {
    data: T,
}

impl AdjutorClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|error| {
                tracing::error!(%error, path, "identity provider unreachable");
                ApiError::upstream("Identity verification is unavailable")
            })?;

        if !response.status().is_success() {
            tracing::error!(status = %response.status(), path, "identity provider error");
            return Err(ApiError::upstream("Identity verification is unavailable"));
        }

        let envelope: AdjutorEnvelope<T> = response.json().await.map_err(|error| {
            tracing::error!(%error, path, "identity provider returned malformed body");
            ApiError::upstream("Identity verification is unavailable")
        })?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl IdentityVerifier for AdjutorClient {
    async fn karma_lookup(&self, identity: &str) -> Result<Vec<KarmaRecord>, ApiError> {
        // A 404 from the karma endpoint means no records, not an error
        let url = format!("{}/verification/karma/{identity}", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|error| {
                tracing::error!(%error, "karma lookup unreachable");
                ApiError::upstream("Identity verification is unavailable")
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            tracing::error!(status = %response.status(), "karma lookup failed");
            return Err(ApiError::upstream("Identity verification is unavailable"));
        }

        let envelope: AdjutorEnvelope<Vec<KarmaRecord>> =
            response.json().await.map_err(|error| {
                tracing::error!(%error, "karma lookup returned malformed body");
                ApiError::upstream("Identity verification is unavailable")
            })?;
        Ok(envelope.data)
    }

    async fn bvn_lookup(&self, bvn: &str) -> Result<KycProfile, ApiError> {
        self.get(&format!("verification/bvn/{bvn}")).await
    }
}

/// Stand-in for local runs without provider credentials. Karma lookups
/// pass with a warning; BVN lookups still fail closed since KYC without
/// a provider record is meaningless.
pub struct UnconfiguredVerifier;

#[async_trait]
impl IdentityVerifier for UnconfiguredVerifier {
    async fn karma_lookup(&self, identity: &str) -> Result<Vec<KarmaRecord>, ApiError> {
        tracing::warn!(identity, "karma lookup skipped, no provider configured");
        Ok(Vec::new())
    }

    async fn bvn_lookup(&self, _bvn: &str) -> Result<KycProfile, ApiError> {
        Err(ApiError::upstream("Identity verification is unavailable"))
    }
}
