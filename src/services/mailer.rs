// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Transactional email.
//!
//! Email is best-effort everywhere it is used: a delivery failure is
//! logged and swallowed, never surfaced to the caller, and never rolls
//! back the operation that triggered it.

use async_trait::async_trait;
use serde::Serialize;

/// Outbound transactional email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Welcome email with the first email-verification OTP.
    async fn send_welcome(&self, to: &str, otp: &str);

    /// OTP challenge for any of the verification sub-flows.
    async fn send_otp(&self, to: &str, subject: &str, otp: &str);

    /// Post-commit transaction receipt.
    async fn send_receipt(&self, to: &str, subject: &str, body: &str);
}

/// Mailer backed by the Resend HTTP API.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    sender: String,
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

impl ResendMailer {
    pub fn new(api_key: String, sender: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            sender,
        }
    }

    async fn deliver(&self, to: &str, subject: &str, html: String) {
        let request = ResendRequest {
            from: &self.sender,
            to: [to],
            subject,
            html,
        };
        let result = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(to, subject, "email delivered");
            }
            Ok(response) => {
                tracing::warn!(to, subject, status = %response.status(), "email rejected");
            }
            Err(error) => {
                tracing::warn!(to, subject, %error, "email delivery failed");
            }
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_welcome(&self, to: &str, otp: &str) {
        let html = format!(
            "<p>Welcome to Demo Wallet.</p>\
             <p>Your email verification code is <strong>{otp}</strong>. \
             It expires in 10 minutes.</p>"
        );
        self.deliver(to, "Welcome to Demo Wallet", html).await;
    }

    async fn send_otp(&self, to: &str, subject: &str, otp: &str) {
        let html = format!(
            "<p>Your one-time code is <strong>{otp}</strong>. \
             It expires in 10 minutes.</p>\
             <p>If you did not request this, ignore this email.</p>"
        );
        self.deliver(to, subject, html).await;
    }

    async fn send_receipt(&self, to: &str, subject: &str, body: &str) {
        self.deliver(to, subject, format!("<p>{body}</p>")).await;
    }
}

/// Stand-in mailer for local runs without a Resend key. Logs the OTP so
/// flows can be exercised end to end from the console.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_welcome(&self, to: &str, otp: &str) {
        tracing::info!(to, otp, "welcome email (log only)");
    }

    async fn send_otp(&self, to: &str, subject: &str, otp: &str) {
        tracing::info!(to, subject, otp, "otp email (log only)");
    }

    async fn send_receipt(&self, to: &str, subject: &str, body: &str) {
        tracing::info!(to, subject, body, "receipt email (log only)");
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every send for assertion.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMailer {
        /// The OTP most recently mailed to `to`, if any.
        pub fn last_otp_for(&self, to: &str) -> Option<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(addr, _)| addr == to)
                .map(|(_, otp)| otp.clone())
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_welcome(&self, to: &str, otp: &str) {
            self.sent.lock().unwrap().push((to.into(), otp.into()));
        }

        async fn send_otp(&self, to: &str, _subject: &str, otp: &str) {
            self.sent.lock().unwrap().push((to.into(), otp.into()));
        }

        async fn send_receipt(&self, to: &str, _subject: &str, body: &str) {
            self.sent.lock().unwrap().push((to.into(), body.into()));
        }
    }
}
