//! TOTP code generation (RFC 6238 over HMAC-SHA1).
//!
//! Fixed parameters: 30 second period, 6 digits, SHA-1. These are
//! invariants of the stored key format, not knobs.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::base32;

type HmacSha1 = Hmac<Sha1>;

/// Code period in seconds.
pub const PERIOD: u64 = 30;
/// Number of digits in a code.
pub const DIGITS: usize = 6;
/// Returned in place of a code when the secret is unusable. Display
/// code paths must never crash the refresh loop, so generation has no
/// error channel at all.
pub const FAILURE_CODE: &str = "------";

/// Generate the code for `secret` at the current wall-clock time.
pub fn generate(secret: &str) -> String {
    generate_at(secret, now_unix())
}

/// Generate the code for `secret` at an explicit Unix timestamp.
///
/// The secret is normalized (whitespace stripped, uppercased) before
/// validation. Any failure yields [`FAILURE_CODE`] rather than an error.
pub fn generate_at(secret: &str, unix_seconds: u64) -> String {
    let normalized = base32::normalize(secret);
    if !base32::is_valid(&normalized) {
        return FAILURE_CODE.to_string();
    }

    let key = base32::decode(&normalized);
    if key.is_empty() {
        return FAILURE_CODE.to_string();
    }

    let counter = time_step(unix_seconds);
    let Ok(mut mac) = HmacSha1::new_from_slice(&key) else {
        return FAILURE_CODE.to_string();
    };
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation per RFC 4226 §5.3.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);
    let code = binary % 10u32.pow(DIGITS as u32);

    format!("{:0>width$}", code, width = DIGITS)
}

/// Time-step counter for a Unix timestamp: `floor(seconds / 30)`.
pub fn time_step(unix_seconds: u64) -> u64 {
    unix_seconds / PERIOD
}

/// Seconds until the current code expires.
pub fn seconds_remaining(unix_seconds: u64) -> u64 {
    PERIOD - (unix_seconds % PERIOD)
}

/// Current Unix time in seconds.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Format a code for display, grouped in threes ("123 456").
/// The failure sentinel is left as-is.
pub fn format_code(code: &str) -> String {
    if code.len() != DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
        return code.to_string();
    }
    format!("{} {}", &code[..3], &code[3..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "JBSWY3DPEHPK3PXP";

    #[test]
    fn pinned_vectors() {
        assert_eq!(generate_at(SECRET, 59), "996554");
        assert_eq!(generate_at(SECRET, 1_111_111_109), "071271");
    }

    #[test]
    fn rfc6238_cross_check() {
        // RFC 6238 SHA-1 vector at T=59 is 94287082; 6-digit reduction.
        assert_eq!(
            generate_at("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ", 59),
            "287082"
        );
    }

    #[test]
    fn deterministic_within_a_window() {
        assert_eq!(generate_at(SECRET, 59), generate_at(SECRET, 59));
        // 30..59 is one window.
        assert_eq!(generate_at(SECRET, 30), generate_at(SECRET, 59));
    }

    #[test]
    fn next_window_changes_code() {
        assert_eq!(generate_at(SECRET, 89), "602287");
        assert_ne!(generate_at(SECRET, 59), generate_at(SECRET, 89));
    }

    #[test]
    fn invalid_secret_yields_sentinel() {
        assert_eq!(generate_at("not-base32!!", 59), FAILURE_CODE);
        assert_eq!(generate_at("", 59), FAILURE_CODE);
        assert_eq!(generate_at("ABC", 59), FAILURE_CODE); // too short
    }

    #[test]
    fn secret_normalized_before_use() {
        assert_eq!(
            generate_at("jbsw y3dp ehpk 3pxp", 59),
            generate_at(SECRET, 59)
        );
    }

    #[test]
    fn step_and_countdown() {
        assert_eq!(time_step(0), 0);
        assert_eq!(time_step(29), 0);
        assert_eq!(time_step(30), 1);
        assert_eq!(seconds_remaining(0), 30);
        assert_eq!(seconds_remaining(29), 1);
        assert_eq!(seconds_remaining(30), 30);
    }

    #[test]
    fn display_grouping() {
        assert_eq!(format_code("996554"), "996 554");
        assert_eq!(format_code(FAILURE_CODE), FAILURE_CODE);
    }
}
