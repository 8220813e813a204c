//! Read-only view of a zip archive (APKs included) as a directory tree.
//!
//! The archive directory is enumerated once, when the backend is created, and
//! turned into a [`Tree`] keyed by entry names. Entry data is extracted on
//! demand by [`FsCursor::open`].
//!
//! ### Thread Safety
//!
//! The tree needs no locking. Reading entry data goes through the
//! [`ArchiveReader`], which must either support concurrent reads or serialize
//! them itself. [`ZipReader`] does the latter with a mutex around the archive.
//!
//! ### Memory
//!
//! [`ZipReader`] inflates an entry completely before handing it out, so a
//! single `open()` may hold up to [`ZipReader::max_entry_size`] bytes
//! ([`DEFAULT_MAX_ENTRY_SIZE`] unless changed). Larger entries, whether
//! declared or actual, fail with `BackendIo`. Sizes recorded in the archive
//! are never used to reserve memory.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use anyhow::bail;
use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::core::{FsBackend, Result, VfsError, utils};
use crate::vfs::cursor::{ContentProvider, TreeCursor};
use crate::vfs::tree::Tree;

/// Descriptor of one archive entry, kept as the payload of file nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    name: String,
    index: usize,
    size: u64,
    is_dir: bool,
    modified: i64,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, index: usize, size: u64, is_dir: bool, modified: i64) -> Self {
        Self {
            name: name.into(),
            index,
            size,
            is_dir,
            modified,
        }
    }

    /// Name as recorded in the archive, not sanitized.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the archive directory, used to extract the data later.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Uncompressed size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Modification time in milliseconds since the Unix epoch, 0 if unknown.
    pub fn modified(&self) -> i64 {
        self.modified
    }
}

/// Archive collaborator: enumerates entries and extracts their data.
pub trait ArchiveReader: Send + Sync {
    /// Every entry of the archive directory. Unreadable entries are skipped.
    fn entries(&self) -> Vec<ArchiveEntry>;

    /// Opens the uncompressed data of `entry`.
    fn open_entry(&self, entry: &ArchiveEntry) -> anyhow::Result<Box<dyn Read + Send>>;
}

/// Largest entry [`ZipReader`] inflates unless configured otherwise (256 MiB).
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 256 * 1024 * 1024;

/// [`ArchiveReader`] over the `zip` crate.
///
/// Extraction needs exclusive access to the underlying reader, so concurrent
/// `open_entry()` calls are serialized and each entry is inflated into memory
/// before the lock is released. Entries above `max_entry_size()` are refused.
pub struct ZipReader<R> {
    archive: Mutex<ZipArchive<R>>,
    max_entry_size: u64,
}

impl<R: Read + Seek + Send> ZipReader<R> {
    pub fn new(reader: R) -> anyhow::Result<Self> {
        Ok(Self {
            archive: Mutex::new(ZipArchive::new(reader)?),
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        })
    }

    /// Changes the largest entry `open_entry()` agrees to inflate.
    pub fn set_max_entry_size(&mut self, limit: u64) {
        self.max_entry_size = limit;
    }

    pub fn max_entry_size(&self) -> u64 {
        self.max_entry_size
    }
}

impl<R: Read + Seek + Send> ArchiveReader for ZipReader<R> {
    fn entries(&self) -> Vec<ArchiveEntry> {
        let mut archive = self.archive.lock();
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            match archive.by_index_raw(index) {
                Ok(file) => entries.push(ArchiveEntry::new(
                    file.name(),
                    index,
                    file.size(),
                    file.is_dir(),
                    file.last_modified().map(zip_time_to_millis).unwrap_or(0),
                )),
                Err(err) => warn!(index, error = %err, "unreadable archive entry skipped"),
            }
        }
        entries
    }

    fn open_entry(&self, entry: &ArchiveEntry) -> anyhow::Result<Box<dyn Read + Send>> {
        let limit = self.max_entry_size;
        if entry.size > limit {
            bail!("{} declares {} bytes, above the {limit} byte limit", entry.name, entry.size);
        }
        let mut archive = self.archive.lock();
        let mut file = archive.by_index(entry.index)?;
        if file.name() != entry.name {
            bail!("entry #{} is {}, expected {}", entry.index, file.name(), entry.name);
        }
        // the declared size may lie, so only the limit bounds the buffer
        let mut content = Vec::new();
        file.by_ref()
            .take(limit.saturating_add(1))
            .read_to_end(&mut content)?;
        if content.len() as u64 > limit {
            bail!("{} inflates past the {limit} byte limit", entry.name);
        }
        Ok(Box::new(io::Cursor::new(content)))
    }
}

/// Zip timestamps carry no time zone; they are read as UTC.
fn zip_time_to_millis(time: zip::DateTime) -> i64 {
    NaiveDate::from_ymd_opt(time.year().into(), time.month().into(), time.day().into())
        .and_then(|date| {
            date.and_hms_opt(
                time.hour().into(),
                time.minute().into(),
                time.second().into(),
            )
        })
        .map(|datetime| datetime.and_utc().timestamp_millis())
        .unwrap_or(0)
}

struct ArchiveContent {
    reader: Box<dyn ArchiveReader>,
    modified: i64,
}

impl ContentProvider<ArchiveEntry> for ArchiveContent {
    fn open(&self, path: &str, payload: &ArchiveEntry) -> Result<Box<dyn Read + Send>> {
        self.reader
            .open_entry(payload)
            .map_err(|e| VfsError::backend(path, e))
    }

    fn length(&self, payload: &ArchiveEntry) -> u64 {
        payload.size()
    }

    fn last_modified(&self, payload: &ArchiveEntry) -> i64 {
        match payload.modified() {
            0 => self.modified,
            modified => modified,
        }
    }

    fn container_modified(&self) -> i64 {
        self.modified
    }
}

pub type ArchiveCursor = TreeCursor<ArchiveEntry>;

/// A read-only filesystem over the entries of an archive.
///
/// Directories, and entries without a timestamp, report the modification
/// time of the archive itself: the host file's for [`ZipFS::open`], the one
/// given to [`ZipFS::with_modified`], 0 otherwise.
///
/// ### Example
///
/// ```no_run
/// use vfs_tree::{FsBackend, FsCursor, ZipFS};
///
/// let fs = ZipFS::open("/tmp/app.apk").unwrap();
/// let manifest = fs.resolve("AndroidManifest.xml");
/// assert!(manifest.is_file());
/// let bytes = manifest.read().unwrap();
/// ```
pub struct ZipFS {
    tree: Arc<Tree<ArchiveEntry>>,
    content: Arc<ArchiveContent>,
}

impl ZipFS {
    /// Opens the zip file at `path` on the host.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let file = File::open(path).map_err(|e| VfsError::from_io(&display, e))?;
        let modified = file
            .metadata()
            .and_then(|meta| meta.modified())
            .map(utils::to_millis)
            .unwrap_or(0);
        let reader = ZipReader::new(file).map_err(|e| VfsError::backend(&display, e))?;
        Ok(Self::with_modified(reader, modified))
    }

    /// Reads a zip archive from any seekable source.
    pub fn from_reader<R: Read + Seek + Send + 'static>(reader: R) -> Result<Self> {
        let reader = ZipReader::new(reader).map_err(|e| VfsError::backend("<archive>", e))?;
        Ok(Self::new(reader))
    }

    /// Builds the tree from the entries of `reader`. Never fails: malformed or
    /// colliding entries are skipped (see [`Tree::conflicts`]).
    pub fn new<A: ArchiveReader + 'static>(reader: A) -> Self {
        Self::with_modified(reader, 0)
    }

    /// Like `new()`, with `modified` (millis since the epoch) as the archive time.
    pub fn with_modified<A: ArchiveReader + 'static>(reader: A, modified: i64) -> Self {
        let entries = reader.entries();
        let total = entries.len();
        let tree = Tree::build(entries.into_iter().map(|entry| {
            let name = entry.name().to_string();
            (name, move || (!entry.is_dir()).then_some(entry))
        }));
        debug!(
            entries = total,
            nodes = tree.len(),
            conflicts = tree.conflicts().len(),
            "archive tree built"
        );
        Self {
            tree: Arc::new(tree),
            content: Arc::new(ArchiveContent {
                reader: Box::new(reader),
                modified,
            }),
        }
    }

    /// Entries that could not be placed in the tree.
    pub fn conflicts(&self) -> &[String] {
        self.tree.conflicts()
    }
}

impl FsBackend for ZipFS {
    type Cursor = ArchiveCursor;

    fn root(&self) -> ArchiveCursor {
        let content: Arc<dyn ContentProvider<ArchiveEntry>> = self.content.clone();
        TreeCursor::new(Arc::clone(&self.tree), content)
    }

    fn is_read_only(&self) -> bool {
        true
    }
}
