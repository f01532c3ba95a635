use std::fmt;

use crate::record::EntryType;

/// Names a header field, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Magic,
    Type,
    Name,
    Size,
    LinkTarget,
    AccessTime,
    ModifyTime,
    Mode,
    Uid,
    Gid,
    Checksum,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Magic => "magic",
            Field::Type => "type",
            Field::Name => "name",
            Field::Size => "size",
            Field::LinkTarget => "link target",
            Field::AccessTime => "access time",
            Field::ModifyTime => "modify time",
            Field::Mode => "mode",
            Field::Uid => "uid",
            Field::Gid => "gid",
            Field::Checksum => "checksum",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stream does not follow the CatFile layout.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Archive truncated: no terminator for the {field} field starting at offset {offset:#x}")]
    Truncated { field: Field, offset: u64 },

    #[error("Header checksum mismatch at offset {offset:#x}: stored {stored:X}, computed {computed:X}")]
    ChecksumMismatch {
        offset: u64,
        stored: u32,
        computed: u32,
    },

    #[error("Unexpected end of stream at offset {offset:#x}: {expected} more byte(s) expected")]
    UnexpectedEof { offset: u64, expected: u64 },

    #[error("Missing record terminator at offset {offset:#x}: found byte {found:#04x}")]
    MissingTerminator { offset: u64, found: u8 },

    #[error("Invalid {field} field at offset {offset:#x}: `{value}` is not a hexadecimal number")]
    InvalidNumber {
        field: Field,
        offset: u64,
        value: String,
    },

    #[error("Invalid {field} field at offset {offset:#x}: not valid UTF-8")]
    InvalidUtf8 { field: Field, offset: u64 },

    #[error("Unknown entry type {value} at offset {offset:#x}")]
    UnknownEntryType { offset: u64, value: u64 },

    #[error("Invalid magic header. Is this a CatFile archive?")]
    InvalidMagic,

    #[error("The {field} field contains a null byte and cannot be stored")]
    EmbeddedNull { field: Field },

    #[error("Content length {actual} does not match the {entry_type} size field {size}")]
    SizeMismatch {
        entry_type: EntryType,
        size: u64,
        actual: u64,
    },
}

/// Failure while encoding or decoding a stream.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    pub fn as_format(&self) -> Option<&FormatError> {
        match self {
            CodecError::Format(e) => Some(e),
            CodecError::Io(_) => None,
        }
    }
}
