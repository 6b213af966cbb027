//! Base32 secret codec (RFC 4648 alphabet, unpadded).
//!
//! Keeps the lenient semantics the stored secrets were issued under:
//! decode skips characters outside the alphabet instead of rejecting,
//! and both directions drop a trailing partial bit group. See DESIGN.md
//! before tightening either behavior.

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Minimum accepted secret length. A sanity floor (~80 bits of encoded
/// entropy), not an RFC requirement.
pub const MIN_SECRET_LEN: usize = 16;

/// Check that a secret looks like a usable Base32 key: only `A-Z2-7`
/// plus trailing `=` padding, and at least [`MIN_SECRET_LEN`] characters.
pub fn is_valid(text: &str) -> bool {
    if text.len() < MIN_SECRET_LEN {
        return false;
    }
    let stripped = text.trim_end_matches('=');
    if stripped.is_empty() {
        return false;
    }
    stripped
        .bytes()
        .all(|b| matches!(b, b'A'..=b'Z' | b'2'..=b'7'))
}

/// Strip whitespace and uppercase, the normal form for stored secrets.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<String>().to_uppercase()
}

/// Decode Base32 text to raw bytes.
///
/// Unmappable characters (including `=` padding) are skipped, and a
/// trailing group of fewer than 8 bits is discarded.
pub fn decode(text: &str) -> Vec<u8> {
    let normalized = normalize(text);
    let mut out = Vec::with_capacity(normalized.len() * 5 / 8);
    let mut acc: u32 = 0;
    let mut bits = 0u32;

    for b in normalized.bytes() {
        let value = match b {
            b'A'..=b'Z' => b - b'A',
            b'2'..=b'7' => b - b'2' + 26,
            _ => continue,
        };
        acc = (acc << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
            acc &= (1 << bits) - 1;
        }
    }

    out
}

/// Encode raw bytes as unpadded Base32.
///
/// Emits one symbol per complete 5-bit group; a trailing group of fewer
/// than 5 bits is discarded rather than padded.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 8 / 5);
    let mut acc: u32 = 0;
    let mut bits = 0u32;

    for &b in bytes {
        acc = (acc << 8) | b as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((acc >> bits) & 0x1f) as usize] as char);
            acc &= (1 << bits) - 1;
        }
    }

    out
}
