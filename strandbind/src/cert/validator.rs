// Certificate validator: signature and validity window checks.

use crate::cert::Certificate;
use crate::crypto::keys::verify_signature;
use crate::error::{Result, StrandBindError};

/// Validate a certificate's signature under its stated issuer and its validity window.
///
/// `now` is the current unix timestamp in seconds (caller-provided for testability).
pub fn validate(cert: &Certificate, now: u64) -> Result<()> {
    verify_signature(&cert.issuer_public_key, &cert.signable_bytes(), &cert.signature)?;

    if now < cert.valid_from {
        return Err(StrandBindError::CertificateNotYetValid {
            not_before: cert.valid_from,
            now,
        });
    }
    if now > cert.valid_until {
        return Err(StrandBindError::CertificateExpired {
            not_after: cert.valid_until,
            now,
        });
    }
    Ok(())
}

/// Validate a certificate that must be signed by its own subject key.
///
/// This is the check the DANE-certificate trust model applies: the DNS
/// record carries the trust, the certificate only has to be internally
/// consistent.
pub fn validate_self_signed(cert: &Certificate, now: u64) -> Result<()> {
    if !cert.is_self_signed() {
        return Err(StrandBindError::CertificateNotSelfSigned);
    }
    validate(cert, now)
}
