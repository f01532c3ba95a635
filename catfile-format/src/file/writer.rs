use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::{
    error::{CodecError, FormatError},
    fs::{self, FileKind},
    header::{CatHeader, DEFAULT_VERSION},
    record::{EntryHeader, EntryType},
    ser::{write_record, Serialize},
};

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("Cannot create archive `{}`", .path.display())]
    CreateArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot walk directory `{}`", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot stat `{}`", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read link `{}`", .path.display())]
    ReadLink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read file `{}`", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write to archive `{}`", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot store path `{}`: not valid UTF-8", .path.display())]
    InvalidPath { path: PathBuf },

    #[error("Cannot encode entry `{name}`")]
    Encode {
        name: String,
        #[source]
        source: FormatError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Written after `CatFile` in the magic header.
    pub version: u32,

    /// Like `tar -C`: roots passed to [`ArchiveWriter::append_tree`] are
    /// resolved against this directory and names are stored relative to it.
    pub base_dir: Option<PathBuf>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            version: DEFAULT_VERSION,
            base_dir: None,
        }
    }
}

#[derive(Debug)]
pub struct ArchiveWriter {
    pub(crate) file: BufWriter<File>,
    pub(crate) path: PathBuf,
    pub(crate) header: CatHeader,
    base_dir: Option<PathBuf>,
    identity: Option<(u64, u64)>,
    pos: u64,
    count: u64,
}

impl ArchiveWriter {
    /// Creates a new archive, replacing any file already at `path`, and
    /// writes the magic header.
    pub fn create<P: AsRef<Path>>(
        path: P,
        options: &WriterOptions,
    ) -> Result<ArchiveWriter, PackError> {
        let path = path.as_ref().to_path_buf();
        let create_err = |source| PackError::CreateArchive {
            path: path.clone(),
            source,
        };

        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(create_err(e)),
            _ => {}
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(create_err)?;
        let identity = fs::stat(&path).ok().and_then(|s| s.identity());

        let header = CatHeader::new(options.version);
        let mut file = BufWriter::new(file);
        header.write(&mut file).map_err(|e| match e {
            CodecError::Io(source) => PackError::Write {
                path: path.clone(),
                source,
            },
            CodecError::Format(source) => PackError::Encode {
                name: path.display().to_string(),
                source,
            },
        })?;

        Ok(ArchiveWriter {
            file,
            pos: header.encoded_len(),
            path,
            header,
            base_dir: options.base_dir.clone(),
            identity,
            count: 0,
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

    /// Number of records written so far.
    #[inline(always)]
    pub fn len(&self) -> u64 {
        self.count
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Appends a prepared record. Returns the offset its header starts at.
    pub fn append(&mut self, header: &EntryHeader, content: &[u8]) -> Result<u64, PackError> {
        let start = self.pos;
        let written = write_record(&mut self.file, header, content).map_err(|e| match e {
            CodecError::Io(source) => PackError::Write {
                path: self.path.clone(),
                source,
            },
            CodecError::Format(source) => PackError::Encode {
                name: header.name.clone(),
                source,
            },
        })?;

        self.pos += written;
        self.count += 1;

        tracing::debug!(
            start = format_args!("{:#x}", start),
            end = format_args!("{:#x}", self.pos),
            ty = header.entry_type.id(),
            name = %header.name,
            "serialized EntryRecord"
        );

        Ok(start)
    }

    /// Stats `path` and appends it, storing the entry as `name`. Returns
    /// `None` when the path was skipped: the archive itself, and anything
    /// that is not a directory, file or symlink.
    pub fn append_named(
        &mut self,
        path: &Path,
        name: &Path,
    ) -> Result<Option<EntryHeader>, PackError> {
        let stat = fs::stat(path).map_err(|source| PackError::Stat {
            path: path.to_path_buf(),
            source,
        })?;

        if self.identity.is_some() && stat.identity() == self.identity {
            tracing::warn!(path = %path.display(), "refusing to archive the archive itself; skipping");
            return Ok(None);
        }

        let name = fs::entry_name(name).ok_or_else(|| PackError::InvalidPath {
            path: name.to_path_buf(),
        })?;

        let (entry_type, link_target, content) = match stat.kind {
            FileKind::Directory => (EntryType::Directory, String::new(), Vec::new()),
            FileKind::File => {
                let mut content = Vec::with_capacity(stat.size as usize);
                File::open(path)
                    .and_then(|mut f| f.read_to_end(&mut content))
                    .map_err(|source| PackError::ReadFile {
                        path: path.to_path_buf(),
                        source,
                    })?;
                (EntryType::File, String::new(), content)
            }
            FileKind::Symlink => {
                let target = std::fs::read_link(path).map_err(|source| PackError::ReadLink {
                    path: path.to_path_buf(),
                    source,
                })?;
                let target = fs::entry_name(&target)
                    .ok_or(PackError::InvalidPath { path: target })?;
                (EntryType::Symlink, target, Vec::new())
            }
            FileKind::Other => {
                tracing::warn!(path = %path.display(), mode = format_args!("{:o}", stat.mode), "unsupported file type; skipping");
                return Ok(None);
            }
        };

        let header = EntryHeader {
            entry_type,
            name,
            // Taken from what was read, in case the file changed since stat.
            size: content.len() as u64,
            link_target,
            access_time: stat.access_time,
            modify_time: stat.modify_time,
            mode: stat.mode,
            uid: stat.uid,
            gid: stat.gid,
        };

        self.append(&header, &content)?;
        Ok(Some(header))
    }

    /// Appends `root` and everything below it in depth-first order.
    /// `progress` is called for every record written.
    pub fn append_tree<F>(&mut self, root: &Path, mut progress: F) -> Result<u64, PackError>
    where
        F: FnMut(&EntryHeader),
    {
        let base_dir = self.base_dir.clone();
        let walk_root = match &base_dir {
            Some(base) => base.join(root),
            None => root.to_path_buf(),
        };

        let mut count = 0;
        for path in fs::walk(&walk_root) {
            let path = path.map_err(|source| PackError::Walk {
                path: walk_root.clone(),
                source,
            })?;
            let name = base_dir
                .as_deref()
                .and_then(|base| path.strip_prefix(base).ok())
                .unwrap_or(path.as_path());
            if let Some(header) = self.append_named(&path, name)? {
                progress(&header);
                count += 1;
            }
        }
        Ok(count)
    }

    /// Flushes the archive. Returns its total length in bytes.
    pub fn finish(mut self) -> Result<u64, PackError> {
        self.file.flush().map_err(|source| PackError::Write {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!(
            path = %self.path.display(),
            entries = self.count,
            bytes = self.pos,
            "archive written"
        );

        Ok(self.pos)
    }
}

/// Packs `root` into a new archive at `output`. Returns the number of
/// records written.
pub fn pack<P, Q, F>(
    root: P,
    output: Q,
    options: &WriterOptions,
    progress: F,
) -> Result<u64, PackError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    F: FnMut(&EntryHeader),
{
    let mut writer = ArchiveWriter::create(output, options)?;
    let count = writer.append_tree(root.as_ref(), progress)?;
    writer.finish()?;
    Ok(count)
}
