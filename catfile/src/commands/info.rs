use catfile_format::{ArchiveIndex, ArchiveReader, ReadOptions};

use crate::cli::InfoArgs;
use crate::error::{Error, Result};
use crate::util::{format_size, format_time};

pub fn run(args: InfoArgs) -> Result<()> {
    let wrap = |source| Error::OpenArchive {
        path: args.archive.clone(),
        source,
    };

    let mut reader = ArchiveReader::open(&args.archive).map_err(wrap)?;
    let records = reader.read_all(&ReadOptions::list_only()).map_err(wrap)?;
    let index = ArchiveIndex::build(&records);

    let content_bytes: u64 = records.iter().filter_map(|x| x.as_file()).map(|x| x.size).sum();
    let newest = records.iter().map(|x| x.header.modify_time).max();

    println!("Archive:     {}", args.archive.display());
    println!("Version:     {}", reader.version());
    println!("Data start:  {}", reader.data_start());
    println!("Total size:  {}", format_size(reader.len()));
    println!("Content:     {}", format_size(content_bytes));
    println!("Entries:     {}", records.len());
    println!("  Directories: {}", index.directories.len());
    println!("  Files:       {}", index.files.len());
    println!("  Symlinks:    {}", index.symlinks.len());
    println!("  Hardlinks:   {}", index.hardlinks.len());
    if let Some(mtime) = newest {
        println!("Newest:      {}", format_time(mtime));
    }

    Ok(())
}
