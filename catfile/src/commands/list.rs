use std::io::Write;

use catfile_format::{
    list_files, ArchiveReader, ContentGuard, EntryRecord, ListError, ReadOptions,
};
use serde::Serialize;

use crate::cli::ListArgs;
use crate::error::{Error, Result};

#[derive(Serialize)]
struct JsonEntry<'a> {
    id: u64,
    name: &'a str,
    #[serde(rename = "type")]
    entry_type: &'static str,
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
    mode: String,
    uid: u32,
    gid: u32,
    mtime: i64,
    offset: u64,
}

impl<'a> From<&'a EntryRecord> for JsonEntry<'a> {
    fn from(record: &'a EntryRecord) -> Self {
        let header = &record.header;
        JsonEntry {
            id: record.id,
            name: &header.name,
            entry_type: header.entry_type.as_str(),
            size: header.size,
            target: header
                .entry_type
                .is_link()
                .then_some(header.link_target.as_str()),
            mode: format!("{:o}", header.permissions()),
            uid: header.uid,
            gid: header.gid,
            mtime: header.modify_time,
            offset: record.header_start,
        }
    }
}

pub fn run(args: ListArgs, verbose: bool) -> Result<()> {
    let options = ReadOptions {
        start: args.start,
        end: args.end,
        list_only: true,
        verify_checksums: !args.no_checksum,
        content_guard: if args.legacy {
            ContentGuard::Legacy
        } else {
            ContentGuard::Exact
        },
    };

    if args.json {
        return list_json(&args, &options);
    }

    let stdout = std::io::stdout();
    list_files(&args.archive, &options, verbose, stdout.lock()).map_err(|source| Error::List {
        path: args.archive.clone(),
        source,
    })?;

    Ok(())
}

fn list_json(args: &ListArgs, options: &ReadOptions) -> Result<()> {
    let records = ArchiveReader::open(&args.archive)
        .and_then(|mut reader| reader.read_all(options))
        .map_err(|source| Error::List {
            path: args.archive.clone(),
            source: ListError::Read(source),
        })?;

    let entries: Vec<JsonEntry<'_>> = records.iter().map(JsonEntry::from).collect();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &entries).map_err(Error::Json)?;
    writeln!(out).map_err(Error::Output)?;

    Ok(())
}
