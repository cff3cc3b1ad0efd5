//! Webhook payload signatures (`X-Hub-Signature-256`).

use gofer_core::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

const PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str, body: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Internal(format!("hmac key: {}", e)))?;
    mac.update(body);
    Ok(mac)
}

/// Signature header value for `body`, in `sha256=<hex>` form.
pub fn sign(secret: &str, body: &[u8]) -> Result<String> {
    let digest = mac(secret, body)?.finalize().into_bytes();
    Ok(format!("{}{}", PREFIX, hex::encode(digest)))
}

/// Check `header` against the HMAC of the raw body. The comparison is
/// constant time; every failure is the same [`Error::InvalidSignature`].
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> Result<()> {
    let expected = header
        .map(str::trim)
        .and_then(|h| h.strip_prefix(PREFIX))
        .and_then(|h| hex::decode(h).ok())
        .ok_or(Error::InvalidSignature)?;

    mac(secret, body)?
        .verify_slice(&expected)
        .map_err(|_| Error::InvalidSignature)
}
