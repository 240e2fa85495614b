// Certificate builder: fluent API for constructing and signing a certificate.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::cert::Certificate;
use crate::crypto::keys::{IdentityKeyPair, PublicKey};
use crate::error::{Result, StrandBindError};
use crate::identity::Identity;

/// Builder for a [`Certificate`].
///
/// # Example
/// ```ignore
/// let cert = CertificateBuilder::self_signed(&keypair, identity)
///     .valid_for(Duration::from_secs(86400 * 30))
///     .build()?;
/// ```
pub struct CertificateBuilder<'a> {
    issuer: &'a IdentityKeyPair,
    identity: Identity,
    subject_key: PublicKey,
    valid_from: Option<u64>,
    valid_until: Option<u64>,
}

impl<'a> CertificateBuilder<'a> {
    /// A certificate for `keypair`'s own public key, signed by that key.
    pub fn self_signed(keypair: &'a IdentityKeyPair, identity: Identity) -> Self {
        Self {
            issuer: keypair,
            identity,
            subject_key: keypair.public_key_bytes(),
            valid_from: None,
            valid_until: None,
        }
    }

    /// A certificate for `subject_key` signed by a separate issuer key.
    pub fn issued_by(issuer: &'a IdentityKeyPair, identity: Identity, subject_key: PublicKey) -> Self {
        Self {
            issuer,
            identity,
            subject_key,
            valid_from: None,
            valid_until: None,
        }
    }

    /// Set explicit validity window (unix timestamps in seconds).
    pub fn validity(mut self, from: u64, until: u64) -> Self {
        self.valid_from = Some(from);
        self.valid_until = Some(until);
        self
    }

    /// Set validity as a duration from the provided `now`.
    pub fn valid_for_from(mut self, now: u64, duration: Duration) -> Self {
        self.valid_from = Some(now);
        self.valid_until = Some(now.saturating_add(duration.as_secs()));
        self
    }

    /// Set validity as a duration from the current wall-clock time.
    pub fn valid_for(self, duration: Duration) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.valid_for_from(now, duration)
    }

    /// Consume the builder and produce a signed [`Certificate`].
    pub fn build(self) -> Result<Certificate> {
        let valid_from = self
            .valid_from
            .ok_or_else(|| StrandBindError::CertificateBuild("validity window is required".into()))?;
        let valid_until = self
            .valid_until
            .ok_or_else(|| StrandBindError::CertificateBuild("validity window is required".into()))?;

        if valid_until <= valid_from {
            return Err(StrandBindError::CertificateBuild(
                "valid_until must be after valid_from".into(),
            ));
        }

        let mut cert = Certificate {
            identity: self.identity,
            public_key: self.subject_key,
            valid_from,
            valid_until,
            issuer_public_key: self.issuer.public_key_bytes(),
            signature: [0u8; 64],
        };
        cert.signature = self.issuer.sign(&cert.signable_bytes());
        Ok(cert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("alice.example").unwrap()
    }

    #[test]
    fn build_self_signed() {
        let kp = IdentityKeyPair::generate();
        let cert = CertificateBuilder::self_signed(&kp, alice())
            .validity(1000, 2000)
            .build()
            .unwrap();
        assert!(cert.is_self_signed());
        assert_eq!(cert.public_key, kp.public_key_bytes());
        assert_eq!(cert.valid_from, 1000);
        assert_eq!(cert.valid_until, 2000);
    }

    #[test]
    fn build_issued() {
        let ca = IdentityKeyPair::generate();
        let subject = IdentityKeyPair::generate();
        let cert = CertificateBuilder::issued_by(&ca, alice(), subject.public_key_bytes())
            .validity(1000, 2000)
            .build()
            .unwrap();
        assert!(!cert.is_self_signed());
        assert_eq!(cert.issuer_public_key, ca.public_key_bytes());
    }

    #[test]
    fn missing_validity_fails() {
        let kp = IdentityKeyPair::generate();
        assert!(CertificateBuilder::self_signed(&kp, alice()).build().is_err());
    }

    #[test]
    fn inverted_validity_window_fails() {
        let kp = IdentityKeyPair::generate();
        let result = CertificateBuilder::self_signed(&kp, alice())
            .validity(2000, 1000)
            .build();
        assert!(result.is_err());
    }
}
