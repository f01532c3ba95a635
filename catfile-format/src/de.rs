use std::io::{BufRead, Read, Seek, SeekFrom};

use crate::{
    error::{CodecError, Field, FormatError},
    header::{CatHeader, MAGIC_BYTES},
    record::{EntryHeader, EntryRecord, EntryType},
    ser::TERMINATOR,
};

/// Which records have a content block, as far as the decoder is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentGuard {
    /// Content is read (or skipped) whenever `size > 0`, then the record
    /// terminator is checked. Reads every archive the writer produces.
    #[default]
    Exact,

    /// Content is read (or skipped) only when `size > 1`, then one byte is
    /// skipped unchecked. A 1-byte file therefore leaves the cursor one byte
    /// short of the next record. Older archive readers behave this way.
    Legacy,
}

impl ContentGuard {
    #[inline(always)]
    pub fn has_content_block(self, size: u64) -> bool {
        match self {
            ContentGuard::Exact => size > 0,
            ContentGuard::Legacy => size > 1,
        }
    }
}

/// How a single record is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Skip over file content instead of reading it into memory.
    pub list_only: bool,
    pub verify_checksums: bool,
    pub content_guard: ContentGuard,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            list_only: false,
            verify_checksums: true,
            content_guard: ContentGuard::Exact,
        }
    }
}

pub(crate) trait DeserializeOwned {
    fn deserialize_owned<R: BufRead + Seek>(reader: &mut R) -> Result<Self, CodecError>
    where
        Self: Sized;
}

/// Reads header fields while tracking the absolute offset and the bytes
/// that feed the header checksum.
struct FieldReader<'a, R> {
    inner: &'a mut R,
    pos: u64,
    hasher: crc32fast::Hasher,
}

impl<'a, R: BufRead> FieldReader<'a, R> {
    fn new(inner: &'a mut R, pos: u64) -> Self {
        FieldReader {
            inner,
            pos,
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Reads up to and including the next terminator. Returns the field
    /// bytes without the terminator, and the offset the field started at.
    fn raw(&mut self, field: Field) -> Result<(Vec<u8>, u64), CodecError> {
        let start = self.pos;
        let mut buf = Vec::new();
        let n = self.inner.read_until(TERMINATOR, &mut buf)?;
        self.pos += n as u64;

        if buf.last() != Some(&TERMINATOR) {
            return Err(FormatError::Truncated {
                field,
                offset: start,
            }
            .into());
        }

        if field != Field::Checksum {
            self.hasher.update(&buf);
        }
        buf.pop();

        tracing::trace!(
            %field,
            start = format_args!("{:#x}", start),
            bytes = n,
            "deserialized field"
        );

        Ok((buf, start))
    }

    fn text(&mut self, field: Field) -> Result<String, CodecError> {
        let (buf, offset) = self.raw(field)?;
        String::from_utf8(buf).map_err(|_| FormatError::InvalidUtf8 { field, offset }.into())
    }

    fn hex(&mut self, field: Field) -> Result<u64, CodecError> {
        let (buf, offset) = self.raw(field)?;
        parse_hex(&buf).ok_or_else(|| {
            FormatError::InvalidNumber {
                field,
                offset,
                value: String::from_utf8_lossy(&buf).into_owned(),
            }
            .into()
        })
    }

    fn hex_u32(&mut self, field: Field) -> Result<u32, CodecError> {
        let offset = self.pos;
        let value = self.hex(field)?;
        u32::try_from(value).map_err(|_| {
            FormatError::InvalidNumber {
                field,
                offset,
                value: format!("{:X}", value),
            }
            .into()
        })
    }
}

fn parse_hex(buf: &[u8]) -> Option<u64> {
    if buf.is_empty() || !buf.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let s = std::str::from_utf8(buf).ok()?;
    u64::from_str_radix(s, 16).ok()
}

impl DeserializeOwned for CatHeader {
    fn deserialize_owned<R: BufRead + Seek>(reader: &mut R) -> Result<Self, CodecError> {
        let start = reader.stream_position()?;
        let mut fields = FieldReader::new(reader, start);
        let (magic, _) = fields.raw(Field::Magic)?;

        let digits = magic
            .strip_prefix(&MAGIC_BYTES[..])
            .ok_or(FormatError::InvalidMagic)?;
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(FormatError::InvalidMagic.into());
        }
        let version = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or(FormatError::InvalidMagic)?;

        tracing::debug!(
            start = format_args!("{:#x}", start),
            end = format_args!("{:#x}", fields.pos),
            version,
            "deserialized CatHeader"
        );

        Ok(CatHeader { version })
    }
}

/// Decodes one record starting at the reader's current position.
///
/// On return the reader is positioned at the start of the next record.
pub fn decode_record<R: BufRead + Seek>(
    reader: &mut R,
    id: u64,
    options: &DecodeOptions,
) -> Result<EntryRecord, CodecError> {
    let header_start = reader.stream_position()?;
    let mut fields = FieldReader::new(&mut *reader, header_start);

    let type_offset = fields.pos;
    let type_id = fields.hex(Field::Type)?;
    let entry_type = EntryType::from_id(type_id).ok_or(FormatError::UnknownEntryType {
        offset: type_offset,
        value: type_id,
    })?;
    let name = fields.text(Field::Name)?;
    let size = fields.hex(Field::Size)?;
    let link_target = fields.text(Field::LinkTarget)?;
    let access_time = fields.hex(Field::AccessTime)? as i64;
    let modify_time = fields.hex(Field::ModifyTime)? as i64;
    let mode = fields.hex_u32(Field::Mode)?;
    let uid = fields.hex_u32(Field::Uid)?;
    let gid = fields.hex_u32(Field::Gid)?;
    let computed = fields.hasher.clone().finalize();
    let stored = fields.hex_u32(Field::Checksum)?;
    let header_end = fields.pos;

    if options.verify_checksums && stored != computed {
        return Err(FormatError::ChecksumMismatch {
            offset: header_start,
            stored,
            computed,
        }
        .into());
    }

    let header = EntryHeader {
        entry_type,
        name,
        size,
        link_target,
        access_time,
        modify_time,
        mode,
        uid,
        gid,
    };

    let content_start = header_end;
    let mut content = None;
    let content_end = if options.content_guard.has_content_block(size) {
        if options.list_only {
            skip_exact(reader, content_start, size)?;
        } else {
            content = Some(read_content(reader, content_start, size)?);
        }
        content_start + size
    } else {
        content_start
    };

    match options.content_guard {
        ContentGuard::Exact => {
            let mut byte = [0u8; 1];
            read_or_eof(reader, &mut byte, content_end)?;
            if byte[0] != TERMINATOR {
                return Err(FormatError::MissingTerminator {
                    offset: content_end,
                    found: byte[0],
                }
                .into());
            }
        }
        ContentGuard::Legacy => {
            reader.seek(SeekFrom::Current(1))?;
        }
    }

    tracing::debug!(
        id,
        start = format_args!("{:#x}", header_start),
        end = format_args!("{:#x}", content_end + 1),
        ty = entry_type.id(),
        size,
        name = %header.name,
        "deserialized EntryRecord"
    );

    Ok(EntryRecord {
        id,
        header,
        checksum: stored,
        content,
        header_start,
        header_end,
        content_start,
        content_end,
    })
}

fn read_or_eof<R: Read>(reader: &mut R, buf: &mut [u8], offset: u64) -> Result<(), CodecError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => FormatError::UnexpectedEof {
            offset,
            expected: buf.len() as u64,
        }
        .into(),
        _ => CodecError::Io(e),
    })
}

fn read_content<R: Read>(reader: &mut R, offset: u64, size: u64) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    let n = reader.take(size).read_to_end(&mut buf)? as u64;
    if n < size {
        return Err(FormatError::UnexpectedEof {
            offset: offset + n,
            expected: size - n,
        }
        .into());
    }
    Ok(buf)
}

/// Seeks past `size` bytes. A content block running past the end of the
/// stream is caught by the terminator read that follows.
fn skip_exact<R: Seek>(reader: &mut R, offset: u64, size: u64) -> Result<(), CodecError> {
    let delta = i64::try_from(size).map_err(|_| FormatError::UnexpectedEof {
        offset,
        expected: size,
    })?;
    reader.seek(SeekFrom::Current(delta))?;
    Ok(())
}
