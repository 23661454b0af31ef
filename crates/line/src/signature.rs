//! Webhook signature verification.
//!
//! LINE signs every webhook body with the channel secret and sends
//! `base64(HMAC-SHA256(secret, body))` in the `x-line-signature` header.

use {
    base64::{Engine as _, engine::general_purpose::STANDARD},
    hmac::{Hmac, Mac},
    sha2::Sha256,
    tracing::warn,
};

use crate::error::{Context, Error, Result};

pub const SIGNATURE_HEADER: &str = "x-line-signature";

type HmacSha256 = Hmac<Sha256>;

/// Compute the signature LINE would send for `body`.
pub fn sign(channel_secret: &str, body: &[u8]) -> Result<String> {
    let mut mac =
        HmacSha256::new_from_slice(channel_secret.as_bytes()).context("invalid channel secret")?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check `signature_header` against the raw request `body`.
///
/// The comparison runs in constant time.
pub fn verify(channel_secret: &str, body: &[u8], signature_header: &str) -> Result<()> {
    let Ok(expected) = STANDARD.decode(signature_header.trim()) else {
        warn!("webhook signature is not valid base64");
        return Err(Error::Signature);
    };
    let mut mac =
        HmacSha256::new_from_slice(channel_secret.as_bytes()).context("invalid channel secret")?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| Error::Signature)
}
