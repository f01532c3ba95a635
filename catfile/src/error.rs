use std::path::PathBuf;

use catfile_format::{ExtractError, ListError, PackError, ReadError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot create archive `{}`", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: PackError,
    },

    #[error("Cannot open archive `{}`", .path.display())]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: ReadError,
    },

    #[error("Cannot list archive `{}`", .path.display())]
    List {
        path: PathBuf,
        #[source]
        source: ListError,
    },

    #[error("Cannot extract archive `{}`", .path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    #[error("Cannot encode listing as JSON")]
    Json(#[source] serde_json::Error),

    #[error("Cannot write to stdout")]
    Output(#[source] std::io::Error),
}
