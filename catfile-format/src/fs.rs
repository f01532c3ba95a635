//! Filesystem collaborators: the depth-first walk and `lstat` used when
//! packing, and the metadata mutations used when extracting.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Type bits of a raw mode, as stored in the `MODE` field.
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFLNK: u32 = 0o120000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    File,
    Symlink,
    /// Sockets, fifos, devices. Never archived.
    Other,
}

/// What the writer needs to know about a path, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub kind: FileKind,
    pub size: u64,
    pub access_time: i64,
    pub modify_time: i64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub dev: u64,
    pub ino: u64,
}

impl Stat {
    /// Device and inode, when the platform has them.
    pub fn identity(&self) -> Option<(u64, u64)> {
        match self.ino {
            0 => None,
            ino => Some((self.dev, ino)),
        }
    }
}

fn kind_of(file_type: std::fs::FileType) -> FileKind {
    if file_type.is_symlink() {
        FileKind::Symlink
    } else if file_type.is_dir() {
        FileKind::Directory
    } else if file_type.is_file() {
        FileKind::File
    } else {
        FileKind::Other
    }
}

#[cfg(unix)]
pub fn stat(path: &Path) -> io::Result<Stat> {
    use std::os::unix::fs::MetadataExt;

    let meta = std::fs::symlink_metadata(path)?;
    Ok(Stat {
        kind: kind_of(meta.file_type()),
        size: meta.size(),
        access_time: meta.atime(),
        modify_time: meta.mtime(),
        mode: meta.mode(),
        uid: meta.uid(),
        gid: meta.gid(),
        dev: meta.dev(),
        ino: meta.ino(),
    })
}

#[cfg(not(unix))]
pub fn stat(path: &Path) -> io::Result<Stat> {
    fn secs(time: io::Result<SystemTime>) -> i64 {
        time.ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    let meta = std::fs::symlink_metadata(path)?;
    let kind = kind_of(meta.file_type());
    let mode = match kind {
        FileKind::Directory => S_IFDIR | 0o755,
        FileKind::Symlink => S_IFLNK | 0o777,
        _ if meta.permissions().readonly() => S_IFREG | 0o444,
        _ => S_IFREG | 0o644,
    };

    Ok(Stat {
        kind,
        size: meta.len(),
        access_time: secs(meta.accessed()),
        modify_time: secs(meta.modified()),
        mode,
        uid: 0,
        gid: 0,
        dev: 0,
        ino: 0,
    })
}

/// Every path under `root`, depth-first, sorted by name, `root` itself
/// first and each directory before its contents. Symlinks are not followed
/// and the walk runs on the calling thread.
pub fn walk(root: &Path) -> impl Iterator<Item = io::Result<PathBuf>> {
    jwalk::WalkDir::new(root)
        .sort(true)
        .parallelism(jwalk::Parallelism::Serial)
        .skip_hidden(false)
        .follow_links(false)
        .into_iter()
        .map(|entry| entry.map(|e| e.path()).map_err(io::Error::other))
}

/// Converts a path to the `/`-separated name stored in the archive.
///
/// Returns `None` for paths that are not valid UTF-8.
pub fn entry_name(path: &Path) -> Option<String> {
    let name = path.to_str()?;
    let mut name = if std::path::MAIN_SEPARATOR == '/' {
        name.to_string()
    } else {
        name.replace(std::path::MAIN_SEPARATOR, "/")
    };

    while name.len() > 1 && name.ends_with('/') {
        name.pop();
    }

    Some(name)
}

/// Resolves an archived name below `destination`. Root and prefix
/// components are dropped so absolute names land inside it. Returns `None`
/// when the name contains `..`, which could climb out of `destination`.
pub fn resolve(destination: &Path, name: &str) -> Option<PathBuf> {
    let mut resolved = destination.to_path_buf();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    Some(resolved)
}

pub fn system_time(secs: i64) -> io::Result<SystemTime> {
    let time = if secs >= 0 {
        UNIX_EPOCH.checked_add(Duration::from_secs(secs as u64))
    } else {
        UNIX_EPOCH.checked_sub(Duration::from_secs(secs.unsigned_abs()))
    };
    time.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("timestamp {} out of range", secs),
        )
    })
}

#[cfg(unix)]
pub fn set_owner(path: &Path, uid: u32, gid: u32) -> io::Result<()> {
    std::os::unix::fs::chown(path, Some(uid), Some(gid))
}

#[cfg(not(unix))]
pub fn set_owner(_path: &Path, _uid: u32, _gid: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
pub fn set_mode(path: &Path, permissions: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(permissions))
}

#[cfg(not(unix))]
pub fn set_mode(path: &Path, permissions: u32) -> io::Result<()> {
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_readonly(permissions & 0o222 == 0);
    std::fs::set_permissions(path, perms)
}

pub fn set_times(path: &Path, access_time: i64, modify_time: i64) -> io::Result<()> {
    let times = std::fs::FileTimes::new()
        .set_accessed(system_time(access_time)?)
        .set_modified(system_time(modify_time)?);
    std::fs::File::open(path)?.set_times(times)
}

#[cfg(unix)]
pub fn symlink(target: &str, path: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, path)
}

#[cfg(windows)]
pub fn symlink(target: &str, path: &Path) -> io::Result<()> {
    let resolved = path.parent().map(|p| p.join(target));
    match resolved {
        Some(t) if t.is_dir() => std::os::windows::fs::symlink_dir(target, path),
        _ => std::os::windows::fs::symlink_file(target, path),
    }
}
