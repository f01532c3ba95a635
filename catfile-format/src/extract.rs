use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{
    file::reader::{ArchiveReader, ReadError, ReadOptions},
    fs,
    record::{EntryHeader, EntryRecord, EntryType},
};

/// One part of restoring an entry's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataStep {
    Owner,
    Mode,
    Times,
}

impl fmt::Display for MetadataStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetadataStep::Owner => "owner",
            MetadataStep::Mode => "mode",
            MetadataStep::Times => "timestamps",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("Creating directory failed. Path: '{}'", .1.display())]
    CreateDir(#[source] std::io::Error, PathBuf),

    #[error("Creating file failed. Path: '{}'", .1.display())]
    CreateFile(#[source] std::io::Error, PathBuf),

    #[error("Creating symlink failed. Path: '{}'", .1.display())]
    CreateSymlink(#[source] std::io::Error, PathBuf),

    #[error("Creating hard link failed. Path: '{}', target: '{}'", .1.display(), .2.display())]
    CreateHardLink(#[source] std::io::Error, PathBuf, PathBuf),

    #[error("Refusing to extract `{name}`: it would land outside the destination")]
    UnsafePath { name: String },

    #[error("Setting {step} failed. Path: '{}'", .path.display())]
    Metadata {
        step: MetadataStep,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Directory archived names are resolved against.
    pub destination: PathBuf,

    /// Restore uid and gid. Usually needs elevated privileges.
    pub preserve_ownership: bool,

    pub verify_checksums: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            destination: PathBuf::from("."),
            preserve_ownership: true,
            verify_checksums: true,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractStats {
    pub files_extracted: u64,
    pub dirs_created: u64,
    pub links_created: u64,
    pub bytes_written: u64,
}

impl std::ops::AddAssign for ExtractStats {
    fn add_assign(&mut self, other: Self) {
        self.files_extracted += other.files_extracted;
        self.dirs_created += other.dirs_created;
        self.links_created += other.links_created;
        self.bytes_written += other.bytes_written;
    }
}

/// Restores owner, timestamps and permission bits of `path`, in that order.
/// Ownership comes first because `chown` may clear setuid and setgid bits.
pub fn apply_metadata(
    path: &Path,
    header: &EntryHeader,
    preserve_ownership: bool,
) -> Result<(), ExtractError> {
    let wrap = |step| {
        move |source| ExtractError::Metadata {
            step,
            path: path.to_path_buf(),
            source,
        }
    };

    if preserve_ownership {
        fs::set_owner(path, header.uid, header.gid).map_err(wrap(MetadataStep::Owner))?;
    }
    fs::set_times(path, header.access_time, header.modify_time)
        .map_err(wrap(MetadataStep::Times))?;
    fs::set_mode(path, header.permissions()).map_err(wrap(MetadataStep::Mode))?;

    Ok(())
}

fn resolve(destination: &Path, name: &str) -> Result<PathBuf, ExtractError> {
    fs::resolve(destination, name).ok_or_else(|| ExtractError::UnsafePath {
        name: name.to_string(),
    })
}

fn create_dir(path: &Path) -> std::io::Result<()> {
    match std::fs::create_dir(path) {
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        other => other,
    }
}

/// Replays `entries` onto the filesystem in stream order.
///
/// Parents must precede their children, which holds for every archive the
/// writer produces. Extraction stops at the first failure and leaves what was
/// already written in place. `progress` is called before each entry.
pub fn extract_entries<F>(
    entries: &[EntryRecord],
    options: &ExtractOptions,
    mut progress: F,
) -> Result<ExtractStats, ExtractError>
where
    F: FnMut(&EntryRecord),
{
    let mut stats = ExtractStats::default();
    let mut directories = Vec::new();

    for entry in entries {
        progress(entry);
        let path = resolve(&options.destination, entry.name())?;

        match entry.entry_type() {
            EntryType::Directory => {
                create_dir(&path).map_err(|e| ExtractError::CreateDir(e, path.clone()))?;
                if options.preserve_ownership {
                    fs::set_owner(&path, entry.header.uid, entry.header.gid).map_err(
                        |source| ExtractError::Metadata {
                            step: MetadataStep::Owner,
                            path: path.clone(),
                            source,
                        },
                    )?;
                }
                // Mode and times wait until the children exist.
                directories.push((path.clone(), &entry.header));
                stats.dirs_created += 1;
            }
            EntryType::File => {
                let content = entry.content();
                std::fs::File::create(&path)
                    .and_then(|mut f| f.write_all(content))
                    .map_err(|e| ExtractError::CreateFile(e, path.clone()))?;
                apply_metadata(&path, &entry.header, options.preserve_ownership)?;
                stats.files_extracted += 1;
                stats.bytes_written += content.len() as u64;
            }
            EntryType::Symlink => {
                fs::symlink(entry.link_target(), &path)
                    .map_err(|e| ExtractError::CreateSymlink(e, path.clone()))?;
                stats.links_created += 1;
            }
            EntryType::Hardlink => {
                let target = resolve(&options.destination, entry.link_target())?;
                std::fs::hard_link(&target, &path)
                    .map_err(|e| ExtractError::CreateHardLink(e, path.clone(), target))?;
                stats.links_created += 1;
            }
        }

        tracing::trace!(id = entry.id, path = %path.display(), "extracted");
    }

    // Deepest first, so restoring a parent's mtime is not undone by a child.
    for (path, header) in directories.iter().rev() {
        let wrap = |step| {
            move |source| ExtractError::Metadata {
                step,
                path: path.clone(),
                source,
            }
        };
        fs::set_times(path, header.access_time, header.modify_time)
            .map_err(wrap(MetadataStep::Times))?;
        fs::set_mode(path, header.permissions()).map_err(wrap(MetadataStep::Mode))?;
    }

    tracing::info!(
        destination = %options.destination.display(),
        files = stats.files_extracted,
        dirs = stats.dirs_created,
        links = stats.links_created,
        bytes = stats.bytes_written,
        "extraction finished"
    );

    Ok(stats)
}

/// Decodes every entry of `archive`, content included, and extracts them
/// below `options.destination`, which is created if missing.
pub fn extract<P, F>(
    archive: P,
    options: &ExtractOptions,
    progress: F,
) -> Result<ExtractStats, ExtractError>
where
    P: AsRef<Path>,
    F: FnMut(&EntryRecord),
{
    let mut reader = ArchiveReader::open(archive)?;
    let entries = reader.read_all(&ReadOptions {
        verify_checksums: options.verify_checksums,
        ..Default::default()
    })?;

    std::fs::create_dir_all(&options.destination)
        .map_err(|e| ExtractError::CreateDir(e, options.destination.clone()))?;

    extract_entries(&entries, options, progress)
}
