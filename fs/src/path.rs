//! Path resolution (spec.md §4.4): splitting a path into components and
//! walking them one `dir_lookup` at a time from either the root or the
//! calling task's working directory. Grounded on the teacher's
//! `Path::next_component`/`path_to_inode` in `src/fs.rs`, generalized to
//! reject `//` and ill-formed trailing slashes per SPEC_FULL.md's resolved
//! Open Question rather than collapsing them.

use crate::error::{FsError, FsResult};
use crate::filesystem::FileSystem;
use crate::inode::Inode;
use crate::task::Task;

/// Splits `path` into its non-empty components, in order. A single leading
/// `/` only marks the path absolute and is otherwise dropped. A single
/// trailing `/` is tolerated (it is how [`FileSystem`]'s internal prefixes
/// are built); any other empty component — an embedded `//` — is rejected.
fn split_components(path: &str) -> FsResult<Vec<&str>> {
    let body = path.strip_prefix('/').unwrap_or(path);
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let pieces: Vec<&str> = body.split('/').collect();
    let last = pieces.len() - 1;
    let mut components = Vec::with_capacity(pieces.len());

    for (i, piece) in pieces.into_iter().enumerate() {
        if piece.is_empty() {
            if i == last {
                continue;
            }
            return Err(FsError::InvalidPath);
        }
        components.push(piece);
    }

    Ok(components)
}

impl FileSystem {
    /// Resolves `path` to the inode of its final component, whether that is
    /// a file or a directory. `""` and `"/"` both resolve to the root.
    pub(crate) fn resolve(&self, task: &Task, path: &str) -> FsResult<Inode> {
        let mut current = if path.starts_with('/') {
            self.root()?
        } else {
            self.working_dir(task)?
        };

        for component in split_components(path)? {
            if !self.inode_is_directory(current) {
                self.inode_close(current);
                return Err(FsError::NotADirectory);
            }

            let next = match self.dir_lookup(current, component) {
                Ok(next) => next,
                Err(e) => {
                    self.inode_close(current);
                    return Err(e);
                }
            };

            self.inode_close(current);
            current = next;
        }

        Ok(current)
    }

    /// Resolves a directory-path *prefix* (everything up to and including
    /// the last `/`, per [`split_path`](crate::filesystem)) to the directory
    /// inode it names. An empty prefix resolves to the calling task's
    /// working directory; every component walked must itself be a
    /// directory, including the final one.
    pub(crate) fn walk_to(&self, task: &Task, prefix: &str) -> FsResult<Inode> {
        if prefix.is_empty() {
            return self.working_dir(task);
        }

        let inode = self.resolve(task, prefix)?;
        if !self.inode_is_directory(inode) {
            self.inode_close(inode);
            return Err(FsError::NotADirectory);
        }

        Ok(inode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_embedded_empty_component() {
        assert_eq!(split_components("a//b"), Err(FsError::InvalidPath));
    }

    #[test]
    fn tolerates_single_trailing_slash() {
        assert_eq!(split_components("a/b/").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn drops_single_leading_slash() {
        assert_eq!(split_components("/a/b").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn empty_and_root_have_no_components() {
        assert_eq!(split_components("").unwrap(), Vec::<&str>::new());
        assert_eq!(split_components("/").unwrap(), Vec::<&str>::new());
    }
}
