//! RFC 6238 time-based one-time password generation.
//!
//! A [`TotpGenerator`] wraps a decoded shared secret and produces the
//! six-digit (or eight-digit) codes an authenticator displays. The
//! computation is HOTP (RFC 4226) over HMAC-SHA-1 with the counter derived
//! from Unix time in 30-second steps, which is what every mainstream
//! provisioning flow (`otpauth://totp/...`) assumes.
//!
//! Secrets arrive base32-encoded per the Google Authenticator convention.
//! Decoding accepts lowercase input, interior whitespace, and trailing `=`
//! padding, all of which appear in real-world provisioning strings.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha1::Sha1;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// Code length produced by [`TotpGenerator::new`].
pub const DEFAULT_DIGITS: u32 = 6;

/// Time step, in seconds, shared by generator and verifier.
pub const DEFAULT_PERIOD_SECS: u64 = 30;

/// Errors that can occur when constructing a generator.
#[derive(Debug, Error, PartialEq)]
pub enum TotpError {
    /// The secret is not valid base32. The offending input is deliberately
    /// not included in the message so it cannot leak into logs.
    #[error("secret is not valid base32")]
    InvalidSecret,

    /// The requested code length is outside the RFC 4226 range.
    #[error("unsupported digit count {0}; expected 6, 7, or 8")]
    UnsupportedDigits(u32),
}

/// Generates TOTP codes for one shared secret.
pub struct TotpGenerator {
    key: Vec<u8>,
    digits: u32,
    period: u64,
}

impl TotpGenerator {
    /// Creates a generator producing standard 6-digit codes.
    ///
    /// # Errors
    ///
    /// Returns [`TotpError::InvalidSecret`] when `secret` is not base32.
    pub fn new(secret: &str) -> Result<Self, TotpError> {
        Self::with_digits(secret, DEFAULT_DIGITS)
    }

    /// Creates a generator producing codes of `digits` length (6 to 8).
    ///
    /// # Errors
    ///
    /// Returns [`TotpError::UnsupportedDigits`] for a digit count outside
    /// 6..=8, or [`TotpError::InvalidSecret`] when `secret` is not base32.
    pub fn with_digits(secret: &str, digits: u32) -> Result<Self, TotpError> {
        if !(6..=8).contains(&digits) {
            return Err(TotpError::UnsupportedDigits(digits));
        }
        Ok(Self {
            key: decode_secret(secret)?,
            digits,
            period: DEFAULT_PERIOD_SECS,
        })
    }

    /// The code for the current system time.
    pub fn code(&self) -> String {
        self.code_at(unix_now())
    }

    /// The code for the period containing `unix_secs`.
    pub fn code_at(&self, unix_secs: u64) -> String {
        let counter = unix_secs / self.period;
        let value = self.hotp(counter) % 10u32.pow(self.digits);
        format!("{value:0width$}", width = self.digits as usize)
    }

    /// Seconds of validity left for the code of the current period.
    /// Always in `1..=period`.
    pub fn remaining(&self) -> u64 {
        self.remaining_at(unix_now())
    }

    /// Seconds of validity left at `unix_secs`.
    pub fn remaining_at(&self, unix_secs: u64) -> u64 {
        self.period - (unix_secs % self.period)
    }

    /// RFC 4226 dynamic truncation of HMAC-SHA-1(key, counter).
    fn hotp(&self, counter: u64) -> u32 {
        // new_from_slice accepts keys of any length for HMAC.
        let mut mac = HmacSha1::new_from_slice(&self.key).expect("HMAC key of any length");
        mac.update(&counter.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        let offset = (digest[digest.len() - 1] & 0x0F) as usize;
        let truncated = u32::from_be_bytes([
            digest[offset],
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]);
        truncated & 0x7FFF_FFFF
    }
}

/// Decodes a base32 secret, tolerating lowercase, whitespace, and `=` padding.
fn decode_secret(secret: &str) -> Result<Vec<u8>, TotpError> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .collect::<String>()
        .to_ascii_uppercase();

    if normalized.is_empty() {
        return Err(TotpError::InvalidSecret);
    }

    base32::decode(base32::Alphabet::RFC4648 { padding: false }, &normalized)
        .ok_or(TotpError::InvalidSecret)
}

/// Seconds since the Unix epoch for the current system time.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
