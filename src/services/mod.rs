// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! External collaborators behind trait seams, so the service layer can
//! be tested without network access.
//!
//! | Module | Trait | Production impl |
//! |--------|-------|-----------------|
//! | [`mailer`] | `Mailer` | Resend HTTP API |
//! | [`kyc`] | `IdentityVerifier` | Adjutor HTTP API |

pub mod kyc;
pub mod mailer;

pub use kyc::{IdentityVerifier, KarmaRecord, KycProfile};
pub use mailer::Mailer;
