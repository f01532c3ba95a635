use std::io::Write;

use crate::{
    error::{CodecError, Field, FormatError},
    header::{CatHeader, MAGIC_BYTES},
    record::{EntryHeader, EntryType},
};

/// Ends every field, and every record after its content block.
pub(crate) const TERMINATOR: u8 = 0x0;

pub(crate) trait Serialize {
    fn write<W: Write>(&self, writer: &mut W) -> Result<(), CodecError>;
}

/// Numeric fields are stored as uppercase hexadecimal text without padding.
#[inline(always)]
fn push_hex(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(format!("{:X}", value).as_bytes());
    buf.push(TERMINATOR);
}

#[inline(always)]
fn push_text(buf: &mut Vec<u8>, field: Field, value: &str) -> Result<(), FormatError> {
    if value.as_bytes().contains(&TERMINATOR) {
        return Err(FormatError::EmbeddedNull { field });
    }
    buf.extend_from_slice(value.as_bytes());
    buf.push(TERMINATOR);
    Ok(())
}

/// CRC-32 over header bytes as they appear on disk.
#[inline(always)]
pub fn checksum(fields: &[u8]) -> u32 {
    crc32fast::hash(fields)
}

impl EntryHeader {
    /// The nine header fields, each followed by its terminator. This is
    /// exactly the input of the header checksum.
    pub fn fields(&self) -> Result<Vec<u8>, FormatError> {
        let mut buf = Vec::with_capacity(64 + self.name.len() + self.link_target.len());
        push_hex(&mut buf, self.entry_type.id() as u64);
        push_text(&mut buf, Field::Name, &self.name)?;
        push_hex(&mut buf, self.size);
        push_text(&mut buf, Field::LinkTarget, &self.link_target)?;
        // Pre-epoch times are stored as their two's complement.
        push_hex(&mut buf, self.access_time as u64);
        push_hex(&mut buf, self.modify_time as u64);
        push_hex(&mut buf, self.mode as u64);
        push_hex(&mut buf, self.uid as u64);
        push_hex(&mut buf, self.gid as u64);
        Ok(buf)
    }

    pub fn checksum(&self) -> Result<u32, FormatError> {
        Ok(checksum(&self.fields()?))
    }

    /// The complete header: the nine fields plus the checksum field.
    pub fn encode(&self) -> Result<Vec<u8>, FormatError> {
        let mut buf = self.fields()?;
        let sum = checksum(&buf);
        push_hex(&mut buf, sum as u64);
        Ok(buf)
    }
}

impl Serialize for CatHeader {
    fn write<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        writer.write_all(MAGIC_BYTES)?;
        writer.write_all(self.version.to_string().as_bytes())?;
        writer.write_all(&[TERMINATOR])?;
        Ok(())
    }
}

impl Serialize for EntryHeader {
    fn write<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        writer.write_all(&self.encode()?)?;
        Ok(())
    }
}

/// Writes one complete record: header, content block and the record
/// terminator. Returns the number of bytes written.
///
/// `content` must be exactly `header.size` bytes long, and empty for
/// anything that is not a file.
pub fn write_record<W: Write>(
    writer: &mut W,
    header: &EntryHeader,
    content: &[u8],
) -> Result<u64, CodecError> {
    let expected = match header.entry_type {
        EntryType::File => header.size,
        _ => 0,
    };
    if header.size != expected || content.len() as u64 != expected {
        return Err(FormatError::SizeMismatch {
            entry_type: header.entry_type,
            size: header.size,
            actual: content.len() as u64,
        }
        .into());
    }

    let encoded = header.encode()?;
    writer.write_all(&encoded)?;
    writer.write_all(content)?;
    writer.write_all(&[TERMINATOR])?;

    tracing::trace!(
        name = %header.name,
        ty = header.entry_type.id(),
        header_bytes = encoded.len(),
        size = header.size,
        "serialized record"
    );

    Ok(encoded.len() as u64 + content.len() as u64 + 1)
}
