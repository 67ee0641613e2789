use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::OdiadevError;
use crate::security::constant_time_compare;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 over the body with the shared secret.
/// Returns the base64-encoded MAC, matching the `flutterwave-signature` header.
pub fn compute_signature(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Verify a base64 HMAC-SHA256 signature over the raw webhook body.
///
/// Invalid base64 falls through to a comparison against zeros so malformed
/// and mismatched signatures take the same path.
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);

    let expected = base64::engine::general_purpose::STANDARD
        .decode(signature.trim())
        .unwrap_or_else(|_| vec![0u8; 32]);

    // hmac's verify_slice compares in constant time
    mac.verify_slice(&expected).is_ok()
}

/// Check the shared-secret `verif-hash` header and, when present, the body
/// HMAC. Binary accept/reject only: the error never says which check failed.
pub fn verify_webhook(
    secret_hash: &str,
    verif_hash: Option<&str>,
    hmac_signature: Option<&str>,
    body: &[u8],
) -> Result<(), OdiadevError> {
    let hash_ok = verif_hash
        .map(|h| constant_time_compare(h, secret_hash))
        .unwrap_or(false);

    let hmac_ok = hmac_signature
        .map(|sig| verify_signature(secret_hash.as_bytes(), body, sig))
        .unwrap_or(true);

    if hash_ok & hmac_ok {
        Ok(())
    } else {
        Err(OdiadevError::InvalidSignature)
    }
}
