//! The task/thread layer is an external collaborator; this crate only needs
//! the one slot it promises to provide per spec.md's "Task layer (consumed)":
//! a mutable, nullable working-directory slot, owned exclusively by the
//! task.

use crate::inode::Inode;
use crate::sync::SpinLock;

/// A minimal stand-in for "current task identity" good enough to drive and
/// test the facade without a real scheduler underneath it. Real kernel code
/// would keep one of these per task control block; here it is a value the
/// caller holds and passes explicitly to every facade call, per the context-
/// passing design in spec.md §9 ("pass them through a single context value
/// to keep the core testable").
///
/// The working directory is held as an open [`Inode`] handle, not a bare
/// sector number: the task pins one open-inode-table reference for as long
/// as it is somebody's cwd, the same way a process holds its `cwd` inode
/// open for its entire lifetime in the teacher's kernel.
pub struct Task {
    working_dir: SpinLock<Option<Inode>>,
}

impl Task {
    pub fn new() -> Self {
        Self {
            working_dir: SpinLock::new(None, "task.cwd"),
        }
    }

    /// Returns the pinned working-directory handle, or `None` if the task
    /// has never `chdir`'d (defaults to root).
    pub(crate) fn working_dir(&self) -> Option<Inode> {
        *self.working_dir.lock()
    }

    /// Installs `inode` as the new pinned working directory and returns
    /// whatever was pinned before, so the caller can close it.
    pub(crate) fn set_working_dir(&self, inode: Inode) -> Option<Inode> {
        std::mem::replace(&mut *self.working_dir.lock(), Some(inode))
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new()
    }
}
