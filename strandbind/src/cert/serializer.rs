// Certificate binary serializer / deserializer.
//
// Wire format (big-endian):
// [version:1B][name_len:1B][name:name_lenB][public_key:32B]
// [valid_from:8B][valid_until:8B]
// [issuer_pk:32B][signature:64B]

use crate::cert::Certificate;
use crate::codec::Reader;
use crate::error::{Result, StrandBindError};

/// Serialize a [`Certificate`] into its compact binary form.
pub fn serialize(cert: &Certificate) -> Vec<u8> {
    let mut buf = cert.signable_bytes();
    buf.extend_from_slice(&cert.signature);
    buf
}

/// Deserialize a [`Certificate`] from its compact binary form.
pub fn deserialize(data: &[u8]) -> Result<Certificate> {
    let mut r = Reader::new(
        data,
        "certificate",
        StrandBindError::CertificateDeserialization,
    );

    let version = r.u8()?;
    if version != Certificate::VERSION {
        return Err(StrandBindError::CertificateVersionUnsupported(version));
    }

    let identity = r.identity()?;
    let public_key = r.array::<32>()?;
    let valid_from = r.u64()?;
    let valid_until = r.u64()?;
    let issuer_public_key = r.array::<32>()?;
    let signature = r.array::<64>()?;
    r.finish()?;

    Ok(Certificate {
        identity,
        public_key,
        valid_from,
        valid_until,
        issuer_public_key,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::builder::CertificateBuilder;
    use crate::cert::read_certificate;
    use crate::crypto::keys::IdentityKeyPair;
    use crate::identity::Identity;

    #[test]
    fn decode_recovers_identity_and_key() {
        let kp = IdentityKeyPair::generate();
        let cert = CertificateBuilder::self_signed(&kp, Identity::new("alice.example").unwrap())
            .validity(100, 200)
            .build()
            .unwrap();
        let bytes = serialize(&cert);
        assert_eq!(deserialize(&bytes).unwrap(), cert);

        let (identity, key) = read_certificate(&bytes).unwrap();
        assert_eq!(identity.as_str(), "alice.example");
        assert_eq!(key, kp.public_key_bytes());
    }

    #[test]
    fn bad_version_fails() {
        let mut bytes = vec![0xFF];
        bytes.extend_from_slice(&[0u8; 200]);
        assert!(matches!(
            deserialize(&bytes),
            Err(StrandBindError::CertificateVersionUnsupported(0xFF))
        ));
    }

    #[test]
    fn truncated_data_fails() {
        assert!(deserialize(&[Certificate::VERSION, 5, b'a']).is_err());
    }

    #[test]
    fn trailing_data_fails() {
        let kp = IdentityKeyPair::generate();
        let cert = CertificateBuilder::self_signed(&kp, Identity::new("b.example").unwrap())
            .validity(1, 2)
            .build()
            .unwrap();
        let mut bytes = serialize(&cert);
        bytes.push(0);
        assert!(deserialize(&bytes).is_err());
    }
}
