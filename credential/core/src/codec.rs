// SPDX-License-Identifier: Apache-2.0

//! The canonical wire codec.
//!
//! Every payload serializes to an insertion-ordered raw map of single-letter
//! keys. The canonical byte string is the minified JSON of that map (no
//! whitespace, `,` and `:` separators, producer field order); signatures are
//! computed over the canonical bytes with the `s` field omitted, so they
//! survive deserialize→reserialize cycles as long as encoders emit the pinned
//! field order.
//!
//! The transport form wraps the canonical bytes for QR alphanumeric mode:
//! zlib compress → base64url → remap every character `c` to the two-digit
//! decimal of `ord(c) − 45` → prefix with the uppercase tag and `:`. Bare keys
//! and signatures skip the compression; their digit body encodes the base64
//! text directly.

use std::io::{Read as _, Write as _};

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::error::{CredentialError, CredentialResult};

/// An insertion-ordered field map. Producers must insert fields in the
/// canonical order for their tag; `serde_json`'s `preserve_order` feature
/// keeps that order through encode and decode.
pub type RawMap = serde_json::Map<String, Value>;

// '-' is the lowest character of the padded base64url alphabet, so every
// remapped character fits in two decimal digits.
const DIGIT_OFFSET: u8 = 45;

/// Minified JSON bytes of a raw map, in its insertion order.
pub fn canonical_bytes(map: &RawMap) -> Vec<u8> {
    serde_json::to_vec(map).expect("raw map serialization should not fail")
}

/// Canonical bytes → zlib → base64url.
pub(crate) fn compress(map: &RawMap) -> String {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&canonical_bytes(map))
        .expect("writing to an in-memory encoder should not fail");
    let compressed = encoder
        .finish()
        .expect("zlib compression should not fail");
    URL_SAFE.encode(compressed)
}

/// Inverse of [`compress`]: base64url → zlib inflate → JSON value.
pub(crate) fn decompress(body: &str) -> CredentialResult<Value> {
    let compressed = URL_SAFE
        .decode(body)
        .map_err(|e| CredentialError::MalformedPayload(format!("invalid base64 body: {e}")))?;
    let mut raw = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut raw)
        .map_err(|e| CredentialError::MalformedPayload(format!("invalid zlib body: {e}")))?;
    serde_json::from_slice(&raw)
        .map_err(|e| CredentialError::MalformedPayload(format!("invalid json body: {e}")))
}

pub(crate) fn to_digit_form(body: &str) -> String {
    let mut digits = String::with_capacity(body.len() * 2);
    for byte in body.bytes() {
        debug_assert!(byte >= DIGIT_OFFSET, "character outside base64url alphabet");
        digits.push_str(&format!("{:02}", byte - DIGIT_OFFSET));
    }
    digits
}

pub(crate) fn from_digit_form(digits: &str) -> CredentialResult<String> {
    let bytes = digits.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(CredentialError::MalformedPayload(
            "transport body has an odd digit count".to_string(),
        ));
    }
    let mut body = Vec::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        let (hi, lo) = (pair[0], pair[1]);
        if !hi.is_ascii_digit() || !lo.is_ascii_digit() {
            return Err(CredentialError::MalformedPayload(
                "transport body contains a non-digit character".to_string(),
            ));
        }
        body.push((hi - b'0') * 10 + (lo - b'0') + DIGIT_OFFSET);
    }
    String::from_utf8(body)
        .map_err(|_| CredentialError::MalformedPayload("transport body is not ascii".to_string()))
}

/// `TAG:DIGITS` over the compressed full raw map.
pub(crate) fn encode_transport(tag: &str, map: &RawMap) -> String {
    format!("{}:{}", tag.to_uppercase(), to_digit_form(&compress(map)))
}

/// `TAG:DIGITS` over an uncompressed base64 body (bare keys and signatures).
pub(crate) fn encode_bare_transport(tag: &str, body: &str) -> String {
    format!("{}:{}", tag.to_uppercase(), to_digit_form(body))
}

/// Splits `TAG:DIGITS` and undoes the digit remap. The caller decides whether
/// the body is a compressed map or a bare base64 string.
pub(crate) fn split_transport(data: &str) -> CredentialResult<(&str, String)> {
    let (tag, digits) = data.split_once(':').ok_or_else(|| {
        CredentialError::MalformedPayload("transport form has no tag separator".to_string())
    })?;
    Ok((tag, from_digit_form(digits)?))
}

pub(crate) fn as_object(value: &Value) -> CredentialResult<&RawMap> {
    value
        .as_object()
        .ok_or_else(|| CredentialError::MalformedPayload("payload is not a map".to_string()))
}

fn get<'a>(map: &'a RawMap, key: &str) -> CredentialResult<&'a Value> {
    map.get(key)
        .ok_or_else(|| CredentialError::MalformedPayload(format!("missing field '{key}'")))
}

pub(crate) fn get_str<'a>(map: &'a RawMap, key: &str) -> CredentialResult<&'a str> {
    get(map, key)?
        .as_str()
        .ok_or_else(|| CredentialError::MalformedPayload(format!("field '{key}' is not a string")))
}

/// A nullable string field; JSON null and a missing key both read as `None`.
pub(crate) fn get_opt_str(map: &RawMap, key: &str) -> CredentialResult<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(CredentialError::MalformedPayload(format!(
            "field '{key}' is not a string or null"
        ))),
    }
}

/// The `s` field: absent, null and the empty string all read as unsigned.
pub(crate) fn get_signature(map: &RawMap) -> CredentialResult<credential_config::Signature> {
    match get_opt_str(map, "s")? {
        Some(encoded) => Ok(credential_config::Signature::from_base64(&encoded)?),
        None => Ok(credential_config::Signature::empty()),
    }
}

pub(crate) fn get_map<'a>(map: &'a RawMap, key: &str) -> CredentialResult<&'a RawMap> {
    get(map, key)?
        .as_object()
        .ok_or_else(|| CredentialError::MalformedPayload(format!("field '{key}' is not a map")))
}

pub(crate) fn get_array<'a>(map: &'a RawMap, key: &str) -> CredentialResult<&'a Vec<Value>> {
    get(map, key)?
        .as_array()
        .ok_or_else(|| CredentialError::MalformedPayload(format!("field '{key}' is not a list")))
}

/// A wire-stable enum code: a small non-negative integer.
pub(crate) fn as_code(value: &Value, field: &str) -> CredentialResult<u8> {
    value
        .as_u64()
        .and_then(|code| u8::try_from(code).ok())
        .ok_or_else(|| {
            CredentialError::MalformedPayload(format!("field '{field}' holds an invalid code"))
        })
}
