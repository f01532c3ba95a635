use catfile_format::{pack, WriterOptions};

use crate::cli::CreateArgs;
use crate::error::{Error, Result};

pub fn run(args: CreateArgs, verbose: bool) -> Result<()> {
    let options = WriterOptions {
        version: args.format_version,
        base_dir: args.directory,
    };

    let count = pack(&args.root, &args.archive, &options, |header| {
        if verbose {
            println!("{}", header.name);
        }
    })
    .map_err(|source| Error::Create {
        path: args.archive.clone(),
        source,
    })?;

    if verbose {
        println!("{} entries written to {}", count, args.archive.display());
    }

    Ok(())
}
