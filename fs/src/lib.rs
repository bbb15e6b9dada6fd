//! On-disk hierarchical file system core for a single-user kernel: a
//! persistent free-map allocator, an indexed inode layer, a directory layer
//! built on top of it, and the path-resolving facade that ties them
//! together. Carries no notion of crash consistency, caching, or concurrent
//! writers beyond one coarse lock — see [`FileSystem`] for the boundary.

mod device;
mod directory;
mod error;
mod file;
mod filesystem;
mod free_map;
mod inode;
mod layout;
mod path;
mod sync;
mod task;

pub use device::{BlockDevice, FileDisk, RamDisk, Sector};
pub use error::{FsError, FsResult};
pub use file::File;
pub use filesystem::FileSystem;
pub use layout::{D, MAX_FILE_SIZE, MAX_SECTORS, NAME_MAX, S, SECTOR_SIZE};
pub use task::Task;
