mod cursor;
mod dex_fs;
mod dir_fs;
mod entry;
mod handle;
mod tree;
mod zip_fs;

pub use cursor::{ContentProvider, TreeCursor};
pub use dex_fs::{ClassCursor, ClassDef, ClassSource, DEFAULT_EXTENSION, DexFS, class_path};
pub use dir_fs::{DirFS, NativeCursor};
pub use entry::{Entry, EntryType};
pub use handle::{BackendKind, Handle};
pub use tree::{Node, NodeId, Tree, TreeBuilder};
pub use zip_fs::{
    ArchiveCursor, ArchiveEntry, ArchiveReader, DEFAULT_MAX_ENTRY_SIZE, ZipFS, ZipReader,
};
