//! Base64 helpers shared by the normaliser, the vmess converter and the encoder.
//!
//! Subscription publishers are sloppy: payloads arrive wrapped across lines,
//! with or without padding, and in either the standard or the URL-safe
//! alphabet. Decoding accepts all of those; encoding always emits standard,
//! padded base64.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_allow_trailing_bits(true)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Decode `input` leniently. ASCII whitespace is ignored.
pub fn decode_lenient(input: &str) -> Option<Vec<u8>> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return None;
    }
    STANDARD_LENIENT
        .decode(&compact)
        .or_else(|_| URL_SAFE_LENIENT.decode(&compact))
        .ok()
}

/// Decode `input` leniently and require valid UTF-8.
pub fn decode_text(input: &str) -> Option<String> {
    decode_lenient(input).and_then(|bytes| String::from_utf8(bytes).ok())
}

pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}
