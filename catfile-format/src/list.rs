use std::io::Write;
use std::path::Path;

use crate::{
    file::reader::{ArchiveReader, ReadError, ReadOptions},
    record::{EntryHeader, EntryRecord, EntryType},
};

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("Cannot write listing")]
    Write(#[source] std::io::Error),
}

macro_rules! add {
    ($mode:ident & $bit:literal, $value:tt => $s:ident) => {
        if $mode & $bit != 0 {
            $s.push($value);
        } else {
            $s.push('-');
        }
    };
}

/// The execute slot of one permission triad, folding in setuid, setgid or sticky.
#[inline(always)]
fn exec_char(exec: bool, special: bool, set: char) -> char {
    match (exec, special) {
        (true, true) => set,
        (true, false) => 'x',
        (false, true) => set.to_ascii_uppercase(),
        (false, false) => '-',
    }
}

#[inline(always)]
pub fn type_char(entry_type: EntryType) -> char {
    match entry_type {
        EntryType::Directory => 'd',
        EntryType::File => '-',
        EntryType::Symlink => 'l',
        EntryType::Hardlink => 'h',
    }
}

/// `ls -l` style mode string, e.g. `drwxr-sr-x`.
pub fn permission_string(header: &EntryHeader) -> String {
    let mode = header.mode;
    let mut s = String::with_capacity(10);

    s.push(type_char(header.entry_type));
    add!(mode & 0o400, 'r' => s);
    add!(mode & 0o200, 'w' => s);
    s.push(exec_char(mode & 0o100 != 0, mode & 0o4000 != 0, 's'));
    add!(mode & 0o040, 'r' => s);
    add!(mode & 0o020, 'w' => s);
    s.push(exec_char(mode & 0o010 != 0, mode & 0o2000 != 0, 's'));
    add!(mode & 0o004, 'r' => s);
    add!(mode & 0o002, 'w' => s);
    s.push(exec_char(mode & 0o001 != 0, mode & 0o1000 != 0, 't'));

    s
}

/// Modification time as `YYYY-MM-DD HH:MM` in UTC.
pub fn format_mtime(secs: i64) -> String {
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".into(),
    }
}

/// One listing line, without the newline.
pub fn format_entry(record: &EntryRecord, verbose: bool) -> String {
    let header = &record.header;
    if !verbose {
        return header.name.clone();
    }

    let mut line = format!(
        "{} {}/{} {:>15} {} {}",
        permission_string(header),
        header.uid,
        header.gid,
        header.size,
        format_mtime(header.modify_time),
        header.name
    );
    if header.entry_type.is_link() {
        line.push_str(" -> ");
        line.push_str(&header.link_target);
    }
    line
}

/// Prints one line per entry of the window selected by `options` (content is
/// never loaded). Returns the number of entries listed.
pub fn list_files<P, W>(
    archive: P,
    options: &ReadOptions,
    verbose: bool,
    mut out: W,
) -> Result<u64, ListError>
where
    P: AsRef<Path>,
    W: Write,
{
    let mut reader = ArchiveReader::open(archive)?;
    let options = ReadOptions {
        list_only: true,
        ..*options
    };

    let mut count = 0;
    for record in reader.entries(&options)? {
        let record = record?;
        writeln!(out, "{}", format_entry(&record, verbose)).map_err(ListError::Write)?;
        count += 1;
    }
    out.flush().map_err(ListError::Write)?;

    Ok(count)
}
