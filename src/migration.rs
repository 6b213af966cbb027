//! Google Authenticator migration payload codec.
//!
//! Export bundles every key into one `otpauth-migration://offline?data=…`
//! URL: a protobuf message, base64url-encoded, small enough for a single
//! QR code. The wire schema:
//!
//! ```text
//! MigrationPayload:
//!   1: repeated OtpParameters otp_parameters
//!   2: int32 version        (always 1)
//!   3: int32 batch_size
//!   4: int32 batch_index    (always 0, single batch)
//!   5: int32 batch_id       (random correlation tag)
//!
//! OtpParameters:
//!   1: bytes  secret        (raw bytes, not Base32 text)
//!   2: string name
//!   3: string issuer
//!   4: enum   algorithm     {UNSPECIFIED=0, SHA1=1, SHA256=2, SHA512=3, MD5=4}
//!   5: enum   digits        {UNSPECIFIED=0, SIX=1, EIGHT=2}
//!   6: enum   type          {UNSPECIFIED=0, HOTP=1, TOTP=2}
//!   7: int64  counter
//! ```
//!
//! The framing is written and read by hand; the two message shapes do not
//! justify a protobuf dependency.

use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use thiserror::Error;
use url::Url;

use crate::base32;
use crate::key::TotpKey;

const SCHEME: &str = "otpauth-migration";

const ALGORITHM_SHA1: u64 = 1;
const DIGITS_SIX: u64 = 1;
const TYPE_TOTP: u64 = 2;

// Protobuf wire types.
const WIRE_VARINT: u64 = 0;
const WIRE_FIXED64: u64 = 1;
const WIRE_LEN: u64 = 2;
const WIRE_FIXED32: u64 = 5;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("not a migration URL (expected otpauth-migration://offline?data=...)")]
    InvalidUrl,
    #[error("malformed migration payload: {0}")]
    Decode(String),
    #[error("nothing to export")]
    EmptyBatch,
}

/// One decoded `OtpParameters` entry, before filtering and mapping.
#[derive(Debug, Default)]
struct OtpParameter {
    secret: Vec<u8>,
    name: String,
    issuer: String,
    otp_type: u64,
}

/// Encode a batch of keys into a single migration URL.
pub fn encode_url(keys: &[TotpKey]) -> Result<String, MigrationError> {
    if keys.is_empty() {
        return Err(MigrationError::EmptyBatch);
    }

    let mut payload = Vec::new();
    for key in keys {
        let mut param = Vec::new();
        write_len_field(&mut param, 1, &base32::decode(&key.secret));
        let name = if key.account.trim().is_empty() {
            &key.name
        } else {
            &key.account
        };
        write_len_field(&mut param, 2, name.as_bytes());
        write_len_field(&mut param, 3, key.name.as_bytes());
        write_varint_field(&mut param, 4, ALGORITHM_SHA1);
        write_varint_field(&mut param, 5, DIGITS_SIX);
        write_varint_field(&mut param, 6, TYPE_TOTP);
        write_varint_field(&mut param, 7, 0); // counter, unused for TOTP
        write_len_field(&mut payload, 1, &param);
    }

    write_varint_field(&mut payload, 2, 1); // version
    write_varint_field(&mut payload, 3, keys.len() as u64);
    write_varint_field(&mut payload, 4, 0); // batch_index, single batch
    write_varint_field(&mut payload, 5, rand::thread_rng().next_u32() as u64);

    let data = general_purpose::URL_SAFE_NO_PAD.encode(&payload);
    Ok(format!("{SCHEME}://offline?data={data}"))
}

/// Decode a migration URL back into keys.
///
/// HOTP and unspecified-type entries are dropped silently; an empty
/// result means the payload held no TOTP entries. `created_at` is set
/// to the time of import.
pub fn decode_url(input: &str) -> Result<Vec<TotpKey>, MigrationError> {
    let data = extract_data_param(input.trim())?;
    let bytes = decode_base64url(&data)?;
    let params = parse_payload(&bytes)?;

    let keys = params
        .into_iter()
        .filter(|p| p.otp_type == TYPE_TOTP)
        .map(|p| {
            let name = if p.issuer.is_empty() {
                "Unknown Service".to_string()
            } else {
                p.issuer
            };
            TotpKey::new(name, p.name, base32::encode(&p.secret))
        })
        .collect();

    Ok(keys)
}

fn extract_data_param(input: &str) -> Result<String, MigrationError> {
    if !input.starts_with(&format!("{SCHEME}://")) {
        return Err(MigrationError::InvalidUrl);
    }
    let url = Url::parse(input).map_err(|_| MigrationError::InvalidUrl)?;
    url.query_pairs()
        .find(|(k, _)| k == "data")
        .map(|(_, v)| v.into_owned())
        .ok_or(MigrationError::InvalidUrl)
}

/// Reverse URL-safe base64 (`-`→`+`, `_`→`/`, restore `=` padding).
fn decode_base64url(data: &str) -> Result<Vec<u8>, MigrationError> {
    let mut s = data.replace('-', "+").replace('_', "/");
    let unpadded = s.trim_end_matches('=').len();
    s.truncate(unpadded);
    while s.len() % 4 != 0 {
        s.push('=');
    }
    general_purpose::STANDARD
        .decode(s)
        .map_err(|e| MigrationError::Decode(format!("bad base64 data: {e}")))
}

// ── Wire-format writer ──────────────────────────────────────────────

fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

fn write_varint_field(buf: &mut Vec<u8>, field: u64, value: u64) {
    write_varint(buf, field << 3 | WIRE_VARINT);
    write_varint(buf, value);
}

fn write_len_field(buf: &mut Vec<u8>, field: u64, data: &[u8]) {
    write_varint(buf, field << 3 | WIRE_LEN);
    write_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

// ── Wire-format reader ──────────────────────────────────────────────

/// Cursor over a payload buffer. Every read fails loudly on truncation
/// instead of best-effort recovery: a cut-off QR scan must surface as a
/// decode error, not as a shorter key list.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn done(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn varint(&mut self) -> Result<u64, MigrationError> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = *self
                .data
                .get(self.pos)
                .ok_or_else(|| MigrationError::Decode("truncated varint".into()))?;
            self.pos += 1;
            result |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(MigrationError::Decode("varint overflow".into()));
            }
        }
    }

    fn bytes(&mut self) -> Result<&'a [u8], MigrationError> {
        let len = self.varint()? as usize;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| MigrationError::Decode("truncated field".into()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, wire_type: u64) -> Result<(), MigrationError> {
        match wire_type {
            WIRE_VARINT => {
                self.varint()?;
            }
            WIRE_LEN => {
                self.bytes()?;
            }
            WIRE_FIXED64 => self.advance(8)?,
            WIRE_FIXED32 => self.advance(4)?,
            other => {
                return Err(MigrationError::Decode(format!(
                    "unsupported wire type {other}"
                )));
            }
        }
        Ok(())
    }

    fn advance(&mut self, n: usize) -> Result<(), MigrationError> {
        if self.pos + n > self.data.len() {
            return Err(MigrationError::Decode("truncated field".into()));
        }
        self.pos += n;
        Ok(())
    }
}

fn parse_payload(data: &[u8]) -> Result<Vec<OtpParameter>, MigrationError> {
    let mut reader = Reader::new(data);
    let mut params = Vec::new();

    while !reader.done() {
        let tag = reader.varint()?;
        let (field, wire_type) = (tag >> 3, tag & 0x07);
        match (field, wire_type) {
            (1, WIRE_LEN) => params.push(parse_parameter(reader.bytes()?)?),
            // version / batch_size / batch_index / batch_id are advisory.
            _ => reader.skip(wire_type)?,
        }
    }

    Ok(params)
}

fn parse_parameter(data: &[u8]) -> Result<OtpParameter, MigrationError> {
    let mut reader = Reader::new(data);
    let mut param = OtpParameter::default();

    while !reader.done() {
        let tag = reader.varint()?;
        let (field, wire_type) = (tag >> 3, tag & 0x07);
        match (field, wire_type) {
            (1, WIRE_LEN) => param.secret = reader.bytes()?.to_vec(),
            (2, WIRE_LEN) => param.name = String::from_utf8_lossy(reader.bytes()?).into_owned(),
            (3, WIRE_LEN) => param.issuer = String::from_utf8_lossy(reader.bytes()?).into_owned(),
            (6, WIRE_VARINT) => param.otp_type = reader.varint()?,
            // algorithm, digits and counter are fixed on our side
            // (SHA-1, six digits, TOTP); unknown enum values here are
            // clamped to the fixed parameters rather than rejected.
            _ => reader.skip(wire_type)?,
        }
    }

    Ok(param)
}
