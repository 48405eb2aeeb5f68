use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("directory not empty: {0}")]
    NotEmpty(String),

    #[error("operation not supported")]
    Unsupported,

    #[error("no attribute data")]
    NoData,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("index parse error: {0}")]
    IndexParse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps an internal error to the `errno` value the FUSE dispatch shim
    /// should hand back to the kernel.
    pub fn errno(&self) -> i32 {
        match self {
            Error::Io(_) => libc::EIO,
            Error::NotFound(_) => libc::ENOENT,
            Error::AlreadyExists(_) => libc::EEXIST,
            Error::NotADirectory(_) => libc::ENOTDIR,
            Error::NotEmpty(_) => libc::ENOTEMPTY,
            Error::Unsupported => libc::ENOSYS,
            Error::NoData => libc::ENODATA,
            Error::Encryption(_) => libc::EIO,
            Error::Decryption(_) => libc::EIO,
            Error::IndexParse(_) => libc::EIO,
        }
    }
}
