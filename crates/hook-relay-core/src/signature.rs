//! HMAC signature verification for inbound webhook deliveries.
//!
//! GitHub signs every delivery with a shared secret and sends the digest in a
//! request header: `X-Hub-Signature-256` carries `sha256=<hex>` and the
//! legacy `X-Hub-Signature` carries `sha1=<hex>`. [`SignatureVerifier`]
//! recomputes the keyed digest over the exact raw body bytes and compares in
//! constant time.
//!
//! Verification must run against the body as received; decoding or
//! re-encoding the body first produces false negatives. The verifier never
//! touches the body beyond reading it, so the same bytes remain available for
//! payload extraction afterwards.

use crate::AuthenticationError;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Verifies that an inbound delivery was signed with the configured secret.
///
/// Accepted signature formats are `sha256=<hex>` (preferred) and `sha1=<hex>`
/// (legacy). The scheme prefix selects the HMAC algorithm; the comparison is
/// constant-time in both cases via [`Mac::verify_slice`].
///
/// Fail-closed: any malformed or non-matching signature rejects the delivery
/// before parsing, translation, or policy evaluation.
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    /// Construct a verifier for the given shared secret.
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if secret.is_empty() {
            warn!("signature verifier constructed with an empty secret; all deliveries signed with a non-empty secret will be rejected");
        }
        Self { secret }
    }

    /// Verify a signature header value against the raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::MalformedSignature`] when the header is
    /// not `<scheme>=<hex>` with a supported scheme and valid hex, and
    /// [`AuthenticationError::Mismatch`] when the recomputed digest differs.
    pub fn verify(&self, signature: &str, body: &[u8]) -> Result<(), AuthenticationError> {
        let (scheme, hex_digest) = signature.split_once('=').ok_or_else(|| {
            AuthenticationError::MalformedSignature {
                message: "expected '<scheme>=<hex-digest>'".to_string(),
            }
        })?;

        let digest =
            hex::decode(hex_digest).map_err(|_| AuthenticationError::MalformedSignature {
                message: "digest is not valid hex".to_string(),
            })?;

        match scheme {
            "sha256" => {
                let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| {
                    AuthenticationError::MalformedSignature {
                        message: "secret cannot be used as an HMAC key".to_string(),
                    }
                })?;
                mac.update(body);
                mac.verify_slice(&digest)
                    .map_err(|_| AuthenticationError::Mismatch)
            }
            "sha1" => {
                let mut mac = HmacSha1::new_from_slice(self.secret.as_bytes()).map_err(|_| {
                    AuthenticationError::MalformedSignature {
                        message: "secret cannot be used as an HMAC key".to_string(),
                    }
                })?;
                mac.update(body);
                mac.verify_slice(&digest)
                    .map_err(|_| AuthenticationError::Mismatch)
            }
            other => Err(AuthenticationError::MalformedSignature {
                message: format!("unsupported signature scheme '{}'", other),
            }),
        }
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
