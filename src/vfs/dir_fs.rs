//! This module provides a passthrough backend over a real directory on the host system.
//! Cursors are plain paths relative to the root; every query goes straight to the host
//! filesystem, so no index is built and changes made by others are seen immediately.
//!
//! ### Key Features:
//! - **Isolated root**: Resolution clamps `..` at the root, so no cursor points outside it.
//! - **Path normalization**: Separators are sanitized and `.`/`..` segments resolved.
//! - **Full contract**: Unlike the synthetic backends, files and directories can be
//!   created, removed and renamed.
//! - **Read-only mode**: A root may be mounted read-only (`set_read_only(true)`), in which
//!   case mutations answer `Unsupported`.

use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::{FsBackend, FsCursor, FsCursorMut, Result, VfsError, utils};

/// A filesystem rooted at a directory on the host.
///
/// ### Usage notes:
/// - Symlinks are followed when reading; `rm()` removes the link, not the target.
/// - Permissions are not adjusted; writing into a read-only host directory fails
///   with `BackendIo`.
/// - The read-only flag is copied into cursors when they are created.
///
/// ### Example:
/// ```no_run
/// use vfs_tree::{DirFS, FsBackend, FsCursor, FsCursorMut};
///
/// let fs = DirFS::new(std::env::temp_dir()).unwrap();
/// let docs = fs.root().mkdir("docs").unwrap();
/// let note = docs.mkfile("note.txt").unwrap();
/// assert!(note.is_file());
/// docs.rm().unwrap();
/// ```
pub struct DirFS {
    root: Arc<PathBuf>, // host-related absolute path
    read_only: bool,
}

impl DirFS {
    /// Creates a new DirFS over the existing directory `root`.
    /// * `root` must be an absolute host path to a directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(VfsError::InvalidPath("root path is empty".to_string()));
        }
        if root.is_relative() {
            return Err(VfsError::InvalidPath(format!(
                "the root path must be absolute: {}",
                root.display()
            )));
        }
        if !root.exists() {
            return Err(VfsError::NotFound(root.display().to_string()));
        }
        if !root.is_dir() {
            return Err(VfsError::NotDirectory(root.display().to_string()));
        }
        Ok(Self {
            root: Arc::new(root.to_path_buf()),
            read_only: false,
        })
    }

    /// Changes the read-only flag for cursors created afterwards.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Returns the root path on the host.
    pub fn host_root(&self) -> &Path {
        self.root.as_path()
    }
}

impl FsBackend for DirFS {
    type Cursor = NativeCursor;

    fn root(&self) -> NativeCursor {
        NativeCursor {
            root: Arc::clone(&self.root),
            path: String::new(),
            read_only: self.read_only,
        }
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

/// A path inside a [`DirFS`], resolved lazily against the host.
#[derive(Debug, Clone)]
pub struct NativeCursor {
    root: Arc<PathBuf>,
    path: String, // inner sanitized path, "" for the root
    read_only: bool,
}

impl NativeCursor {
    /// Path of this cursor on the host.
    pub fn host_path(&self) -> PathBuf {
        if self.path.is_empty() {
            self.root.to_path_buf()
        } else {
            self.root.join(&self.path)
        }
    }

    fn with_path(&self, path: String) -> Self {
        Self {
            root: Arc::clone(&self.root),
            path,
            read_only: self.read_only,
        }
    }

    fn last_segment(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    fn parent_path(&self) -> &str {
        self.path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }

    fn check_writable(&self, op: &'static str) -> Result<()> {
        if self.read_only {
            return Err(VfsError::Unsupported { op });
        }
        Ok(())
    }

    /// Checks that this cursor is a directory that may receive `name`.
    fn child_for(&self, op: &'static str, name: &str) -> Result<NativeCursor> {
        self.check_writable(op)?;
        if !utils::is_valid_name(name) {
            return Err(VfsError::InvalidPath(name.to_string()));
        }
        if !self.exists() {
            return Err(VfsError::NotFound(self.path.clone()));
        }
        if !self.is_dir() {
            return Err(VfsError::NotDirectory(self.path.clone()));
        }
        Ok(self.with_path(utils::join(&self.path, name)))
    }
}

impl FsCursor for NativeCursor {
    fn name(&self) -> Option<&str> {
        self.exists().then(|| self.last_segment())
    }

    fn full_path(&self) -> Option<&str> {
        self.exists().then_some(self.path.as_str())
    }

    fn exists(&self) -> bool {
        self.host_path().exists()
    }

    fn is_dir(&self) -> bool {
        self.host_path().is_dir()
    }

    fn is_file(&self) -> bool {
        self.host_path().is_file()
    }

    fn resolve(&self, path: &str) -> Self {
        self.with_path(utils::normalize(&self.path, path))
    }

    fn ls(&self) -> Vec<Self> {
        if !self.is_dir() {
            return Vec::new();
        }
        let entries = match fs::read_dir(self.host_path()) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %self.path, error = %err, "directory cannot be listed");
                return Vec::new();
            }
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(path = %self.path, error = %err, "unreadable directory entry skipped");
                    continue;
                }
            };
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(path = %self.path, name = ?raw, "non UTF-8 name skipped"),
            }
        }
        names.sort();
        names
            .into_iter()
            .map(|name| self.with_path(utils::join(&self.path, &name)))
            .collect()
    }

    fn length(&self) -> u64 {
        match fs::metadata(self.host_path()) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => 0,
        }
    }

    fn last_modified(&self) -> i64 {
        fs::metadata(self.host_path())
            .and_then(|meta| meta.modified())
            .map(utils::to_millis)
            .unwrap_or(0)
    }

    fn open(&self) -> Result<Box<dyn Read + Send>> {
        if !self.exists() {
            return Err(VfsError::NotFound(self.path.clone()));
        }
        if self.is_dir() {
            return Err(VfsError::IsDirectory(self.path.clone()));
        }
        debug!(path = %self.path, "opening host file");
        let file = File::open(self.host_path()).map_err(|e| VfsError::from_io(&self.path, e))?;
        Ok(Box::new(file))
    }

    fn can_write(&self) -> bool {
        !self.read_only
            && fs::metadata(self.host_path()).is_ok_and(|meta| !meta.permissions().readonly())
    }
}

impl FsCursorMut for NativeCursor {
    fn mkfile(&self, name: &str) -> Result<Self> {
        let child = self.child_for("mkfile", name)?;
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(child.host_path())
            .map_err(|e| VfsError::from_io(&child.path, e))?;
        Ok(child)
    }

    fn mkdir(&self, name: &str) -> Result<Self> {
        let child = self.child_for("mkdir", name)?;
        fs::create_dir(child.host_path()).map_err(|e| VfsError::from_io(&child.path, e))?;
        Ok(child)
    }

    fn rm(&self) -> Result<()> {
        self.check_writable("rm")?;
        if self.path.is_empty() {
            return Err(VfsError::InvalidPath("the root cannot be removed".to_string()));
        }
        let host = self.host_path();
        let meta = fs::symlink_metadata(&host).map_err(|e| VfsError::from_io(&self.path, e))?;
        let removed = if meta.is_dir() {
            fs::remove_dir_all(&host)
        } else {
            fs::remove_file(&host)
        };
        removed.map_err(|e| VfsError::from_io(&self.path, e))
    }

    fn rename(&self, new_name: &str) -> Result<Self> {
        self.check_writable("rename")?;
        if self.path.is_empty() {
            return Err(VfsError::InvalidPath("the root cannot be renamed".to_string()));
        }
        if !utils::is_valid_name(new_name) {
            return Err(VfsError::InvalidPath(new_name.to_string()));
        }
        if !self.exists() {
            return Err(VfsError::NotFound(self.path.clone()));
        }
        let target = self.with_path(utils::join(self.parent_path(), new_name));
        if target.exists() {
            return Err(VfsError::AlreadyExists(target.path));
        }
        fs::rename(self.host_path(), target.host_path())
            .map_err(|e| VfsError::from_io(&self.path, e))?;
        Ok(target)
    }
}
