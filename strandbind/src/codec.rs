// Bounds-checked big-endian reader shared by the certificate and handshake
// message decoders.

use bytes::Buf;

use crate::error::{Result, StrandBindError};
use crate::identity::Identity;

/// Cursor over an input slice. Every read checks the remaining length first,
/// so malformed input produces an error instead of a panic.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    what: &'static str,
    err: fn(String) -> StrandBindError,
}

impl<'a> Reader<'a> {
    /// `what` names the structure being decoded in error messages; `err`
    /// selects the error variant.
    pub(crate) fn new(data: &'a [u8], what: &'static str, err: fn(String) -> StrandBindError) -> Self {
        Self { data, what, err }
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.data.remaining() < n {
            return Err((self.err)(format!(
                "{}: unexpected end of data (need {n}, have {})",
                self.what,
                self.data.remaining()
            )));
        }
        Ok(())
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.data.get_u8())
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.data.get_u16())
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.data.get_u32())
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.data.get_u64())
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        self.data.copy_to_slice(&mut out);
        Ok(out)
    }

    pub(crate) fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    /// A one-byte length-prefixed identity.
    pub(crate) fn identity(&mut self) -> Result<Identity> {
        let len = self.u8()? as usize;
        let raw = self.bytes(len)?;
        let name = std::str::from_utf8(raw)
            .map_err(|e| (self.err)(format!("{}: identity is not utf8: {e}", self.what)))?;
        Identity::new(name).map_err(|e| (self.err)(format!("{}: {e}", self.what)))
    }

    /// Fail if input remains after the structure ended.
    pub(crate) fn finish(self) -> Result<()> {
        if !self.data.is_empty() {
            return Err((self.err)(format!(
                "{}: {} trailing bytes",
                self.what,
                self.data.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_fields() {
        let data = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0xAA];
        let mut r = Reader::new(&data, "test", StrandBindError::Decode);
        assert_eq!(r.u8().unwrap(), 1);
        assert_eq!(r.u16().unwrap(), 2);
        assert_eq!(r.u32().unwrap(), 3);
        assert_eq!(r.bytes(1).unwrap(), &[0xAA]);
        r.finish().unwrap();
    }

    #[test]
    fn short_input_is_an_error() {
        let mut r = Reader::new(&[0x00], "test", StrandBindError::Decode);
        assert!(matches!(r.u32(), Err(StrandBindError::Decode(_))));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut r = Reader::new(&[1, 2], "test", StrandBindError::Decode);
        r.u8().unwrap();
        assert!(r.finish().is_err());
    }

    #[test]
    fn identity_is_validated() {
        let mut data = vec![3u8];
        data.extend_from_slice(b"a b");
        let mut r = Reader::new(&data, "test", StrandBindError::Decode);
        assert!(r.identity().is_err());
    }
}
