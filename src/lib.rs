// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! # Demo Wallet Server
//!
//! Account backend for a demo fintech wallet: session/token
//! authentication with OTP-challenged verification flows, KYC-gated
//! wallet provisioning, and a double-entry style ledger over immutable
//! transaction legs.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`api`] | HTTP routes, OpenAPI document |
//! | [`auth`] | Session/token state machine, access guard |
//! | [`ledger`] | Wallet operations and money movement |
//! | [`store`] | In-memory tables with snapshot transactions |
//! | [`services`] | Email and identity-verification providers |
//! | [`token`] | JWT codec for the three token kinds |
//! | [`models`] | Domain records and projections |
//! | [`config`] | Environment configuration |
//! | [`state`] | Shared handler state |
//! | [`error`] | Error taxonomy and response mapping |
//! | [`response`] | Success envelope |

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod response;
pub mod services;
pub mod state;
pub mod store;
pub mod token;
