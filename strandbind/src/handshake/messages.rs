// Handshake wire messages.
//
// Every transport message is one frame:
//
//   +------+-----------+----------------+
//   | type | body_len  |      body      |
//   | (1B) |   (4B)    |  body_len B    |
//   +------+-----------+----------------+
//
// Hellos travel in the clear. Certificate, CertificateVerify and Finished are
// encoded as inner messages (`[type:1][fields]`), sealed, and carried in an
// Encrypted frame.

use bytes::{BufMut, BytesMut};

use crate::codec::Reader;
use crate::crypto::keys::{PublicKey, SignatureBytes};
use crate::error::{Result, StrandBindError};
use crate::identity::Identity;

/// Size of the frame header (`type` + `body_len`).
pub const FRAME_HEADER_LEN: usize = 5;

/// Marker byte a ClientHello carries; a ServerHello carries zero.
pub const CLIENT_MARKER: u8 = 0xC1;

/// Outer frame types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    ClientHello = 0x01,
    ServerHello = 0x02,
    Encrypted = 0x17,
}

impl TryFrom<u8> for FrameType {
    type Error = StrandBindError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(FrameType::ClientHello),
            0x02 => Ok(FrameType::ServerHello),
            0x17 => Ok(FrameType::Encrypted),
            other => Err(StrandBindError::Decode(format!(
                "unknown frame type 0x{other:02x}"
            ))),
        }
    }
}

/// Inner (encrypted) message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Certificate = 0x0B,
    CertificateVerify = 0x0F,
    Finished = 0x14,
}

impl TryFrom<u8> for MessageType {
    type Error = StrandBindError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x0B => Ok(MessageType::Certificate),
            0x0F => Ok(MessageType::CertificateVerify),
            0x14 => Ok(MessageType::Finished),
            other => Err(StrandBindError::Decode(format!(
                "unknown handshake message type 0x{other:02x}"
            ))),
        }
    }
}

/// A Hello in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    pub nonce: [u8; 32],
    pub dh_public: [u8; 32],
    /// `CLIENT_MARKER` on a ClientHello, 0 on a ServerHello.
    pub marker: u8,
    /// Identity the initiator asks the responder to serve. Always absent on a ServerHello.
    pub requested_identity: Option<Identity>,
}

impl Hello {
    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.nonce);
        buf.put_slice(&self.dh_public);
        buf.put_u8(self.marker);
        match &self.requested_identity {
            Some(identity) => {
                buf.put_u8(1);
                buf.put_u8(identity.as_bytes().len() as u8);
                buf.put_slice(identity.as_bytes());
            }
            None => buf.put_u8(0),
        }
    }

    fn body_len(&self) -> usize {
        32 + 32 + 1 + 1 + self
            .requested_identity
            .as_ref()
            .map(|id| 1 + id.as_bytes().len())
            .unwrap_or(0)
    }

    fn decode_body(body: &[u8], what: &'static str) -> Result<Self> {
        let mut r = Reader::new(body, what, StrandBindError::Decode);
        let nonce = r.array::<32>()?;
        let dh_public = r.array::<32>()?;
        let marker = r.u8()?;
        let requested_identity = match r.u8()? {
            0 => None,
            1 => Some(r.identity()?),
            other => {
                return Err(StrandBindError::Decode(format!(
                    "{what}: invalid has_name flag {other}"
                )))
            }
        };
        r.finish()?;
        Ok(Self {
            nonce,
            dh_public,
            marker,
            requested_identity,
        })
    }
}

/// One transport message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    ClientHello(Hello),
    ServerHello(Hello),
    /// Sealed inner message: ciphertext || tag.
    Encrypted(Vec<u8>),
}

impl Frame {
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::ClientHello(_) => FrameType::ClientHello,
            Frame::ServerHello(_) => FrameType::ServerHello,
            Frame::Encrypted(_) => FrameType::Encrypted,
        }
    }

    /// Name used in sequence errors.
    pub fn label(&self) -> &'static str {
        match self {
            Frame::ClientHello(_) => "ClientHello",
            Frame::ServerHello(_) => "ServerHello",
            Frame::Encrypted(_) => "Encrypted",
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let body_len = match self {
            Frame::ClientHello(hello) | Frame::ServerHello(hello) => hello.body_len(),
            Frame::Encrypted(ciphertext) => ciphertext.len(),
        };
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + body_len);
        buf.put_u8(self.frame_type() as u8);
        buf.put_u32(body_len as u32);
        match self {
            Frame::ClientHello(hello) | Frame::ServerHello(hello) => hello.encode_body(&mut buf),
            Frame::Encrypted(ciphertext) => buf.put_slice(ciphertext),
        }
        buf.to_vec()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data, "frame", StrandBindError::Decode);
        let frame_type = FrameType::try_from(r.u8()?)?;
        let body_len = r.u32()? as usize;
        let body = r.bytes(body_len)?;
        r.finish()?;

        match frame_type {
            FrameType::ClientHello => Ok(Frame::ClientHello(Hello::decode_body(body, "ClientHello")?)),
            FrameType::ServerHello => {
                let hello = Hello::decode_body(body, "ServerHello")?;
                if hello.requested_identity.is_some() {
                    return Err(StrandBindError::Decode(
                        "ServerHello carries a requested identity".into(),
                    ));
                }
                Ok(Frame::ServerHello(hello))
            }
            FrameType::Encrypted => Ok(Frame::Encrypted(body.to_vec())),
        }
    }
}

// ── Inner messages ─────────────────────────────────────────────────────

const KIND_RAW_KEY: u8 = 0x01;
const KIND_CERTIFICATE: u8 = 0x02;
const KIND_RAW_KEY_WITH_IDENTITY: u8 = 0x03;

/// Credential carried in a Certificate message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificatePayload {
    /// kind 0x01: public_key(32)
    RawKey(PublicKey),
    /// kind 0x02: blob_len(2) + blob
    Certificate(Vec<u8>),
    /// kind 0x03: public_key(32) + name_len(1) + name. Used by a client
    /// that authenticates with a raw key and must claim an identity.
    RawKeyWithIdentity {
        public_key: PublicKey,
        identity: Identity,
    },
}

/// A plaintext handshake message, as appended to the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeMessage {
    Certificate(CertificatePayload),
    /// Signature over the transcript hash through the Certificate message.
    CertificateVerify { signature: SignatureBytes },
    /// HMAC over the transcript hash under the sender's Finished key.
    Finished { mac: [u8; 32] },
}

impl HandshakeMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            HandshakeMessage::Certificate(_) => MessageType::Certificate,
            HandshakeMessage::CertificateVerify { .. } => MessageType::CertificateVerify,
            HandshakeMessage::Finished { .. } => MessageType::Finished,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HandshakeMessage::Certificate(_) => "Certificate",
            HandshakeMessage::CertificateVerify { .. } => "CertificateVerify",
            HandshakeMessage::Finished { .. } => "Finished",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(1 + 64);
        buf.put_u8(self.message_type() as u8);
        match self {
            HandshakeMessage::Certificate(CertificatePayload::RawKey(key)) => {
                buf.put_u8(KIND_RAW_KEY);
                buf.put_slice(key);
            }
            HandshakeMessage::Certificate(CertificatePayload::Certificate(blob)) => {
                let len = u16::try_from(blob.len()).map_err(|_| {
                    StrandBindError::Config(format!("certificate blob of {} bytes", blob.len()))
                })?;
                buf.put_u8(KIND_CERTIFICATE);
                buf.put_u16(len);
                buf.put_slice(blob);
            }
            HandshakeMessage::Certificate(CertificatePayload::RawKeyWithIdentity {
                public_key,
                identity,
            }) => {
                buf.put_u8(KIND_RAW_KEY_WITH_IDENTITY);
                buf.put_slice(public_key);
                buf.put_u8(identity.as_bytes().len() as u8);
                buf.put_slice(identity.as_bytes());
            }
            HandshakeMessage::CertificateVerify { signature } => buf.put_slice(signature),
            HandshakeMessage::Finished { mac } => buf.put_slice(mac),
        }
        Ok(buf.to_vec())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data, "handshake message", StrandBindError::Decode);
        let message = match MessageType::try_from(r.u8()?)? {
            MessageType::Certificate => {
                let payload = match r.u8()? {
                    KIND_RAW_KEY => CertificatePayload::RawKey(r.array::<32>()?),
                    KIND_CERTIFICATE => {
                        let len = r.u16()? as usize;
                        CertificatePayload::Certificate(r.bytes(len)?.to_vec())
                    }
                    KIND_RAW_KEY_WITH_IDENTITY => {
                        let public_key = r.array::<32>()?;
                        let identity = r.identity()?;
                        CertificatePayload::RawKeyWithIdentity {
                            public_key,
                            identity,
                        }
                    }
                    other => {
                        return Err(StrandBindError::Decode(format!(
                            "unknown certificate kind 0x{other:02x}"
                        )))
                    }
                };
                HandshakeMessage::Certificate(payload)
            }
            MessageType::CertificateVerify => HandshakeMessage::CertificateVerify {
                signature: r.array::<64>()?,
            },
            MessageType::Finished => HandshakeMessage::Finished {
                mac: r.array::<32>()?,
            },
        };
        r.finish()?;
        Ok(message)
    }
}
