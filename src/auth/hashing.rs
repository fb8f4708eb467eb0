// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Credential hashing for passwords and transaction pins.
//!
//! Passwords are hashed with argon2id under a per-hash random salt and
//! the server-side pepper as the argon2 secret. Transaction pins use a
//! deterministic peppered HMAC-SHA256 instead: pin checks are plain
//! comparisons against the stored value and can run inside a held
//! storage lock, where a salted verification round-trip would be too
//! slow.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hashes and verifies secrets under the configured pepper.
#[derive(Clone)]
pub struct CredentialHasher {
    pepper: String,
}

impl CredentialHasher {
    pub fn new(pepper: String) -> Self {
        Self { pepper }
    }

    fn argon2(&self) -> Argon2<'_> {
        // Secrets up to 2^32 - 1 bytes are accepted
        Argon2::new_with_secret(
            self.pepper.as_bytes(),
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            argon2::Params::default(),
        )
        .expect("pepper fits the argon2 secret bound")
    }

    /// Hash a password under a fresh random salt, as a PHC string.
    pub fn hash_password(&self, password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            // Default params and a generated salt are always accepted
            .expect("argon2 parameters are valid")
            .to_string()
    }

    /// Check a password against a stored PHC string.
    pub fn verify_password(&self, password: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    fn pin_mac(&self, pin: &str) -> HmacSha256 {
        // HMAC accepts keys of any length
        let mut mac = HmacSha256::new_from_slice(self.pepper.as_bytes())
            .expect("HMAC key of any length");
        mac.update(pin.as_bytes());
        mac
    }

    /// Hash a transaction pin for storage. Deterministic per pepper.
    pub fn hash_pin(&self, pin: &str) -> String {
        Base64::encode_string(&self.pin_mac(pin).finalize().into_bytes())
    }

    /// Constant-time check of a pin against a stored hash.
    pub fn verify_pin(&self, pin: &str, stored: &str) -> bool {
        match Base64::decode_vec(stored) {
            Ok(expected) => self.pin_mac(pin).verify_slice(&expected).is_ok(),
            Err(_) => false,
        }
    }
}
