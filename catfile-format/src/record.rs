use std::fmt;

/// The kind of filesystem item a record describes. The discriminant is the
/// value stored in the record's leading `TYPE` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EntryType {
    Directory = 0,
    File = 1,
    Symlink = 2,
    /// Reserved. The writer never emits it, but readers and the extractor accept it.
    Hardlink = 3,
}

impl EntryType {
    #[inline(always)]
    pub fn id(self) -> u8 {
        self as u8
    }

    #[inline(always)]
    pub fn from_id(id: u64) -> Option<EntryType> {
        match id {
            0 => Some(EntryType::Directory),
            1 => Some(EntryType::File),
            2 => Some(EntryType::Symlink),
            3 => Some(EntryType::Hardlink),
            _ => None,
        }
    }

    /// Symlinks and hardlinks carry a link target; everything else stores an empty one.
    #[inline(always)]
    pub fn is_link(self) -> bool {
        matches!(self, EntryType::Symlink | EntryType::Hardlink)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Directory => "directory",
            EntryType::File => "file",
            EntryType::Symlink => "symlink",
            EntryType::Hardlink => "hardlink",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The nine header fields of a record, in on-disk order.
///
/// The checksum is not stored here: it is always derived from these fields,
/// see [`EntryHeader::checksum`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    pub entry_type: EntryType,

    /// The path as captured when the archive was written, `/`-separated.
    pub name: String,

    /// Length of the content block. Always 0 for anything but files.
    pub size: u64,

    /// Target of a symlink or hardlink; empty otherwise.
    pub link_target: String,

    /// Seconds since the Unix epoch.
    pub access_time: i64,

    /// Seconds since the Unix epoch.
    pub modify_time: i64,

    /// Raw `st_mode` bits, file type bits included.
    pub mode: u32,

    pub uid: u32,
    pub gid: u32,
}

impl EntryHeader {
    /// Permission bits only (`rwx` for owner/group/other plus setuid, setgid and sticky).
    #[inline(always)]
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }
}

/// One decoded record of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// Position of the record within the decoded range, starting at 0. Not stored on disk.
    pub id: u64,

    pub header: EntryHeader,

    /// The checksum as stored in the archive.
    pub checksum: u32,

    /// File content. `None` when the record has no content block, or when it
    /// was skipped in list-only mode.
    pub content: Option<Vec<u8>>,

    /// Offset of the first byte of the `TYPE` field.
    pub header_start: u64,

    /// Offset just past the checksum field's terminator.
    pub header_end: u64,

    pub content_start: u64,

    /// Offset just past the content block; the record terminator sits here.
    pub content_end: u64,
}

impl EntryRecord {
    #[inline(always)]
    pub fn entry_type(&self) -> EntryType {
        self.header.entry_type
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.header.name
    }

    #[inline(always)]
    pub fn size(&self) -> u64 {
        self.header.size
    }

    #[inline(always)]
    pub fn link_target(&self) -> &str {
        &self.header.link_target
    }

    #[inline(always)]
    pub fn has_contents(&self) -> bool {
        self.content.is_some()
    }

    /// Content bytes, empty when none were materialized.
    #[inline(always)]
    pub fn content(&self) -> &[u8] {
        self.content.as_deref().unwrap_or(&[])
    }

    #[inline(always)]
    pub fn as_file(&self) -> Option<&EntryHeader> {
        match self.header.entry_type {
            EntryType::File => Some(&self.header),
            _ => None,
        }
    }
}
