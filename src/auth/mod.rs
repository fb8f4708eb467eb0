// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! # Authentication
//!
//! The session/token state machine: signup, two-step login, token
//! refresh, logout, and the OTP-challenged verification sub-flows
//! (email, BVN, forgot-password).
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`service`] | Flow orchestration over store + providers |
//! | [`guard`] | Access-token extractor for protected routes |
//! | [`hashing`] | Keyed credential hashing |
//! | [`otp`] | One-time-password generation |

pub mod guard;
pub mod hashing;
pub mod otp;
pub mod service;

pub use guard::AuthContext;
