/// Every archive starts with these bytes, followed by the format version
/// as decimal digits and a terminator.
pub const MAGIC_BYTES: &[u8; 7] = b"CatFile";

/// The format version written when none is configured.
pub const DEFAULT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatHeader {
    pub version: u32,
}

impl CatHeader {
    pub fn new(version: u32) -> CatHeader {
        CatHeader { version }
    }

    /// Number of bytes the header occupies on disk.
    pub fn encoded_len(&self) -> u64 {
        (MAGIC_BYTES.len() + self.version.to_string().len() + 1) as u64
    }
}

impl Default for CatHeader {
    fn default() -> Self {
        CatHeader::new(DEFAULT_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::de::DeserializeOwned;
    use crate::error::{CodecError, FormatError};
    use crate::ser::Serialize;
    use std::io::Cursor;

    #[test]
    fn writes_version_digits_after_magic() {
        let mut buf = Vec::new();
        CatHeader::default().write(&mut buf).unwrap();
        assert_eq!(buf, b"CatFile1\0");
        assert_eq!(CatHeader::default().encoded_len(), buf.len() as u64);

        let mut buf = Vec::new();
        CatHeader::new(12).write(&mut buf).unwrap();
        assert_eq!(buf, b"CatFile12\0");
    }

    #[test]
    fn reads_header_back() {
        let mut cursor = Cursor::new(b"CatFile7\0rest".to_vec());
        let header = CatHeader::deserialize_owned(&mut cursor).unwrap();
        assert_eq!(header.version, 7);
        assert_eq!(cursor.position(), 9);
    }

    #[test]
    fn rejects_foreign_magic() {
        for bytes in [&b"CatFileX\0"[..], b"CatFile\0", b"DogFile1\0", b"\xffBOX\0"] {
            let err = CatHeader::deserialize_owned(&mut Cursor::new(bytes.to_vec())).unwrap_err();
            assert!(
                matches!(err, CodecError::Format(FormatError::InvalidMagic)),
                "{:?}",
                err
            );
        }
    }

    #[test]
    fn unterminated_magic_is_truncated() {
        let err = CatHeader::deserialize_owned(&mut Cursor::new(b"CatFi".to_vec())).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Format(FormatError::Truncated { offset: 0, .. })
        ));
    }
}
