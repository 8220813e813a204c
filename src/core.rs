use std::io::Read;

use thiserror::Error;

use crate::Entry;

pub mod utils;

/// Errors reported by cursors when content or mutation is requested.
///
/// Path resolution itself never fails: an unknown path yields a cursor whose
/// `exists()` is `false`, and the error surfaces only when the caller asks
/// for content or tries to change something.
#[derive(Debug, Error)]
pub enum VfsError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("{0} does not exist")]
    NotFound(String),

    #[error("{0} is a directory")]
    IsDirectory(String),

    #[error("{0} is not a directory")]
    NotDirectory(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{op} is not supported by a read-only filesystem")]
    Unsupported { op: &'static str },

    #[error("backend failure at {path}: {source}")]
    BackendIo {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

impl VfsError {
    pub(crate) fn backend<E: Into<anyhow::Error>>(path: impl Into<String>, err: E) -> Self {
        VfsError::BackendIo {
            path: path.into(),
            source: err.into(),
        }
    }

    /// Classifies a host I/O error raised while working on `path`.
    pub(crate) fn from_io(path: impl Into<String>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => VfsError::NotFound(path),
            std::io::ErrorKind::AlreadyExists => VfsError::AlreadyExists(path),
            _ => VfsError::backend(path, err),
        }
    }
}

pub type Result<T> = std::result::Result<T, VfsError>;

/// A content source mounted as a tree: an archive, a set of classes or a host directory.
pub trait FsBackend {
    type Cursor: FsCursor;

    /// Returns a cursor pointing at the backend root.
    fn root(&self) -> Self::Cursor;

    /// Resolves `path` against the backend root.
    fn resolve(&self, path: &str) -> Self::Cursor {
        self.root().resolve(path)
    }

    fn is_read_only(&self) -> bool;
}

/// Read side of the file handle contract, shared by every backend.
///
/// A cursor is either resolved (points at an existing file or directory) or
/// absent. Every query answers `false`, `0` or `None` for an absent cursor.
pub trait FsCursor: Sized {
    /// Last path segment, `""` for the root. `None` if the cursor is absent.
    fn name(&self) -> Option<&str>;

    /// Sanitized path from the backend root, `""` for the root itself.
    fn full_path(&self) -> Option<&str>;

    fn exists(&self) -> bool;

    fn is_dir(&self) -> bool;

    fn is_file(&self) -> bool;

    /// Resolves `path` relative to this cursor. Never fails: a missing segment
    /// produces an absent cursor.
    fn resolve(&self, path: &str) -> Self;

    /// Immediate children, sorted by name. Empty for files and absent cursors.
    fn ls(&self) -> Vec<Self>;

    /// Size of the content in bytes, 0 for directories and absent cursors.
    fn length(&self) -> u64;

    /// Modification time in milliseconds since the Unix epoch, 0 if unknown.
    fn last_modified(&self) -> i64;

    /// Opens the content of a file.
    ///
    /// Fails with `NotFound` for an absent cursor and `IsDirectory` for a directory.
    fn open(&self) -> Result<Box<dyn Read + Send>>;

    fn can_write(&self) -> bool;

    fn can_read(&self) -> bool {
        self.exists()
    }

    /// Like `resolve()`, but returns `None` instead of an absent cursor.
    fn find(&self, path: &str) -> Option<Self> {
        let found = self.resolve(path);
        found.exists().then_some(found)
    }

    /// Reads the whole content into memory.
    fn read(&self) -> Result<Vec<u8>> {
        let mut reader = self.open()?;
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| VfsError::backend(self.full_path().unwrap_or_default(), e))?;
        Ok(content)
    }

    /// Returns every descendant in pre-order, excluding this cursor itself.
    fn tree(&self) -> Vec<Self> {
        let mut all = Vec::new();
        for child in self.ls() {
            let nested = child.tree();
            all.push(child);
            all.extend(nested);
        }
        all
    }

    /// Metadata snapshot, `None` for an absent cursor.
    fn stat(&self) -> Option<Entry> {
        let name = self.name()?;
        let path = self.full_path()?;
        Some(Entry::new(
            name,
            path,
            self.is_dir(),
            self.length(),
            self.last_modified(),
        ))
    }
}

/// Write side of the file handle contract.
///
/// Only host-backed cursors implement it directly. Mutations return the
/// cursor of the created or renamed item since cursors are immutable.
pub trait FsCursorMut: FsCursor {
    /// Creates an empty file `name` inside this directory.
    fn mkfile(&self, name: &str) -> Result<Self>;

    /// Creates a directory `name` inside this directory.
    fn mkdir(&self, name: &str) -> Result<Self>;

    /// Removes this file or directory (recursively).
    fn rm(&self) -> Result<()>;

    /// Renames this item inside its parent directory.
    fn rename(&self, new_name: &str) -> Result<Self>;
}
