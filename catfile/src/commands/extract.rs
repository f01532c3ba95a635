use catfile_format::{extract, ExtractOptions};

use crate::cli::ExtractArgs;
use crate::error::{Error, Result};
use crate::util::format_size;

pub fn run(args: ExtractArgs, verbose: bool) -> Result<()> {
    let options = ExtractOptions {
        destination: args.output.unwrap_or_else(|| ".".into()),
        preserve_ownership: !args.no_same_owner,
        verify_checksums: !args.no_checksum,
    };

    let stats = extract(&args.archive, &options, |record| {
        if verbose {
            println!("{}", record.name());
        }
    })
    .map_err(|source| Error::Extract {
        path: args.archive.clone(),
        source,
    })?;

    if verbose {
        println!(
            "{} files, {} directories, {} links ({}) extracted to {}",
            stats.files_extracted,
            stats.dirs_created,
            stats.links_created,
            format_size(stats.bytes_written),
            options.destination.display()
        );
    }

    Ok(())
}
