use std::fmt;

/// Error categories surfaced by the facade.
///
/// `Denied` (write on a deny-write inode) is intentionally not a variant here:
/// it is reported as a `0`-byte write, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    NotADirectory,
    NameTooLong,
    NameCollision,
    NoSpace,
    DirectoryNotEmpty,
    BusyDirectory,
    InvalidPath,
    Corrupted,
    Io,
}

impl FsError {
    pub fn as_str(&self) -> &'static str {
        match self {
            FsError::NotFound => "not found",
            FsError::NotADirectory => "not a directory",
            FsError::NameTooLong => "name too long",
            FsError::NameCollision => "name collision",
            FsError::NoSpace => "no space left on device",
            FsError::DirectoryNotEmpty => "directory not empty",
            FsError::BusyDirectory => "directory is someone's working directory",
            FsError::InvalidPath => "invalid path",
            FsError::Corrupted => "on-disk structure failed corruption check",
            FsError::Io => "device I/O error",
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for FsError {}

impl From<std::io::Error> for FsError {
    fn from(_: std::io::Error) -> Self {
        FsError::Io
    }
}

pub type FsResult<T> = Result<T, FsError>;
