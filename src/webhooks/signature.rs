//! HMAC-SHA256 validation of inbound webhook bodies.
//!
//! GitHub sends `X-Hub-Signature-256: sha256=<hex>` computed over the raw
//! request body with the shared hook secret. Validation happens before any
//! decoding; a body that fails it is never looked at again.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm prefix of the signature header value.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Decodes the hex digest out of a `sha256=<hex>` header value.
///
/// Returns `None` for a missing prefix, another algorithm or malformed hex.
///
/// ```
/// use chatops_hook::webhooks::parse_signature_header;
///
/// assert_eq!(parse_signature_header("sha256=0aff"), Some(vec![0x0a, 0xff]));
/// assert!(parse_signature_header("sha1=0aff").is_none());
/// assert!(parse_signature_header("sha256=nothex").is_none());
/// ```
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    hex::decode(header.strip_prefix(SIGNATURE_PREFIX)?).ok()
}

/// Computes the raw HMAC-SHA256 digest of `payload` under `secret`.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Renders a digest the way GitHub sends it (`sha256=<lowercase hex>`).
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("{SIGNATURE_PREFIX}{}", hex::encode(signature))
}

/// Checks `signature_header` against the HMAC of `payload` under `secret`.
///
/// The digest comparison is constant-time. Malformed headers simply fail.
///
/// ```
/// use chatops_hook::webhooks::{compute_signature, format_signature_header, verify_signature};
///
/// let body = br#"{"zen":"Keep it logically awesome."}"#;
/// let header = format_signature_header(&compute_signature(body, b"hook-secret"));
///
/// assert!(verify_signature(body, &header, b"hook-secret"));
/// assert!(!verify_signature(body, &header, b"another-secret"));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(expected) = parse_signature_header(signature_header) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}
