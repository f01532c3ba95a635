use std::fs::{File, OpenOptions};
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::{
    de::{decode_record, ContentGuard, DecodeOptions, DeserializeOwned},
    error::CodecError,
    header::CatHeader,
    record::EntryRecord,
};

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Cannot open archive `{}`", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read archive header of `{}`", .path.display())]
    Header {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("Cannot decode entry {id} at offset {offset:#x} of `{}`", .path.display())]
    Decode {
        id: u64,
        offset: u64,
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("Invalid byte range {start:#x}..{end:#x}: entries occupy {data_start:#x}..{len:#x}")]
    InvalidRange {
        start: u64,
        end: u64,
        data_start: u64,
        len: u64,
    },
}

/// Which part of an archive is decoded, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// First byte of the window. `None` (or 0) means right after the magic header.
    pub start: Option<u64>,

    /// End of the window, exclusive. `None` (or 0) means end of file.
    /// Clamped to the archive length.
    pub end: Option<u64>,

    pub list_only: bool,
    pub verify_checksums: bool,
    pub content_guard: ContentGuard,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            start: None,
            end: None,
            list_only: false,
            verify_checksums: true,
            content_guard: ContentGuard::Exact,
        }
    }
}

impl ReadOptions {
    pub fn list_only() -> ReadOptions {
        ReadOptions {
            list_only: true,
            ..Default::default()
        }
    }

    #[inline(always)]
    fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            list_only: self.list_only,
            verify_checksums: self.verify_checksums,
            content_guard: self.content_guard,
        }
    }
}

#[derive(Debug)]
pub struct ArchiveReader {
    pub(crate) file: BufReader<File>,
    pub(crate) path: PathBuf,
    pub(crate) header: CatHeader,
    pub(crate) data_start: u64,
    pub(crate) len: u64,
}

impl ArchiveReader {
    /// Opens an existing archive and validates its magic header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<ArchiveReader, ReadError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(|source| ReadError::Open {
                path: path.clone(),
                source,
            })?;
        let len = file
            .metadata()
            .map_err(|source| ReadError::Open {
                path: path.clone(),
                source,
            })?
            .len();

        let mut file = BufReader::new(file);
        let header = CatHeader::deserialize_owned(&mut file).map_err(|source| {
            ReadError::Header {
                path: path.clone(),
                source,
            }
        })?;
        let data_start = header.encoded_len();

        Ok(ArchiveReader {
            file,
            path,
            header,
            data_start,
            len,
        })
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline(always)]
    pub fn version(&self) -> u32 {
        self.header.version
    }

    #[inline(always)]
    pub fn header(&self) -> &CatHeader {
        &self.header
    }

    /// Offset of the first record.
    #[inline(always)]
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Length of the archive in bytes, as of opening it.
    #[inline(always)]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len <= self.data_start
    }

    fn window(&self, options: &ReadOptions) -> Result<(u64, u64), ReadError> {
        let start = match options.start {
            None | Some(0) => self.data_start,
            Some(v) => v,
        };
        let end = match options.end {
            None | Some(0) => self.len,
            Some(v) => v.min(self.len),
        };

        if start < self.data_start || start > end {
            return Err(ReadError::InvalidRange {
                start,
                end,
                data_start: self.data_start,
                len: self.len,
            });
        }

        Ok((start, end))
    }

    /// Lazily decodes every record whose header starts inside the window
    /// described by `options`. Ids restart at 0 for each call.
    pub fn entries(&mut self, options: &ReadOptions) -> Result<Entries<'_>, ReadError> {
        let (start, end) = self.window(options)?;
        self.file
            .seek(SeekFrom::Start(start))
            .map_err(|e| ReadError::Decode {
                id: 0,
                offset: start,
                path: self.path.clone(),
                source: e.into(),
            })?;

        tracing::debug!(
            path = %self.path.display(),
            start = format_args!("{:#x}", start),
            end = format_args!("{:#x}", end),
            list_only = options.list_only,
            "reading entries"
        );

        Ok(Entries {
            file: &mut self.file,
            path: &self.path,
            options: options.decode_options(),
            pos: start,
            end,
            next_id: 0,
            failed: false,
        })
    }

    /// Decodes the whole window into memory, in stream order.
    pub fn read_all(&mut self, options: &ReadOptions) -> Result<Vec<EntryRecord>, ReadError> {
        self.entries(options)?.collect()
    }
}

/// Iterator over the records of an archive window, see [`ArchiveReader::entries`].
///
/// Yields at most one error, after which it is exhausted.
#[derive(Debug)]
pub struct Entries<'a> {
    file: &'a mut BufReader<File>,
    path: &'a Path,
    options: DecodeOptions,
    pos: u64,
    end: u64,
    next_id: u64,
    failed: bool,
}

impl<'a> Entries<'a> {
    /// Offset the next record will be decoded from.
    #[inline(always)]
    pub fn position(&self) -> u64 {
        self.pos
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<EntryRecord, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.end {
            return None;
        }

        let id = self.next_id;
        match decode_record(&mut *self.file, id, &self.options) {
            Ok(record) => {
                // Both guards leave the cursor one byte past `content_end`.
                self.pos = record.content_end + 1;
                self.next_id += 1;
                Some(Ok(record))
            }
            Err(source) => {
                self.failed = true;
                Some(Err(ReadError::Decode {
                    id,
                    offset: self.pos,
                    path: self.path.to_path_buf(),
                    source,
                }))
            }
        }
    }
}

/// Reads the records of an archive in one call. A `start` or `end` of 0
/// selects the beginning or end of the archive respectively.
pub fn read_archive<P: AsRef<Path>>(
    path: P,
    start: u64,
    end: u64,
    list_only: bool,
) -> Result<Vec<EntryRecord>, ReadError> {
    let mut reader = ArchiveReader::open(path)?;
    reader.read_all(&ReadOptions {
        start: Some(start),
        end: Some(end),
        list_only,
        ..Default::default()
    })
}
