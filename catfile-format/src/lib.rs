//! Reading and writing CatFile archives.
//!
//! An archive is a magic header followed by self-delimited records, one per
//! directory, file or link, each with a CRC-32 protected header.

mod de;
mod error;
pub mod extract;
mod file;
pub mod fs;
mod header;
pub mod list;
mod record;
mod ser;

pub use de::{decode_record, ContentGuard, DecodeOptions};
pub use error::{CodecError, Field, FormatError};
pub use extract::{
    apply_metadata, extract, extract_entries, ExtractError, ExtractOptions, ExtractStats,
    MetadataStep,
};
pub use file::{
    pack, read_archive, ArchiveIndex, ArchiveReader, ArchiveWriter, Entries, NameMap, PackError,
    ReadError, ReadOptions, WriterOptions,
};
pub use header::{CatHeader, DEFAULT_VERSION, MAGIC_BYTES};
pub use list::{format_entry, list_files, permission_string, ListError};
pub use record::{EntryHeader, EntryRecord, EntryType};
pub use ser::{checksum, write_record};

