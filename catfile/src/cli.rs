use std::path::PathBuf;

use catfile_format::DEFAULT_VERSION;
use clap::{Parser, Subcommand};

use crate::util::parse_offset;

#[derive(Debug, Parser)]
#[command(
    name = "catfile",
    about = "Create, list and extract CatFile archives.",
    version
)]
pub struct Cli {
    /// Print each entry as it is processed
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(visible_alias = "c", about = "Create a new archive from a directory tree")]
    Create(CreateArgs),

    #[command(visible_alias = "x", about = "Extract all entries of an archive")]
    Extract(ExtractArgs),

    #[command(visible_aliases = ["l", "ls"], about = "List entries of an archive")]
    List(ListArgs),

    #[command(about = "Show archive statistics")]
    Info(InfoArgs),
}

#[derive(Debug, clap::Args)]
#[command(after_help = "\
Examples:
  catfile create site.cat public/
  catfile create -C /srv site.cat www")]
pub struct CreateArgs {
    /// Output archive path. Any existing file is replaced.
    pub archive: PathBuf,

    /// Directory tree to archive
    pub root: PathBuf,

    /// Resolve ROOT against DIR and store names relative to it
    #[arg(short = 'C', long = "directory", value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Version number written into the magic header
    #[arg(long, default_value_t = DEFAULT_VERSION)]
    pub format_version: u32,
}

#[derive(Debug, clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive to extract
    pub archive: PathBuf,

    /// Output directory (defaults to current directory)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Do not restore uid and gid
    #[arg(long)]
    pub no_same_owner: bool,

    /// Skip header checksum verification
    #[arg(long)]
    pub no_checksum: bool,
}

#[derive(Debug, clap::Args)]
pub struct ListArgs {
    /// Path to the archive
    pub archive: PathBuf,

    /// First byte to decode from (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_offset)]
    pub start: Option<u64>,

    /// Stop before this byte (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_offset)]
    pub end: Option<u64>,

    /// Output in JSON format
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Skip header checksum verification
    #[arg(long)]
    pub no_checksum: bool,

    /// Only treat content of more than one byte as a content block
    #[arg(long)]
    pub legacy: bool,
}

#[derive(Debug, clap::Args)]
pub struct InfoArgs {
    /// Path to the archive
    pub archive: PathBuf,
}
