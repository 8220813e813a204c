//! Browse zip archives, disassembled classes and host directories as one virtual tree.
//!
//! ### Overview
//!
//! `vfs-tree` exposes heterogeneous content sources through a single cursor API.
//! A backend is mounted once and hands out cursors; a cursor is either resolved
//! (it points at a file or a directory) or absent, and path resolution never fails.
//!
//! **Backends**:
//! - [`ZipFS`]: entries of a zip archive (APKs included), indexed once and read-only.
//! - [`DexFS`]: classes of a dex file as `<package>/<Class>.smali` disassembly files,
//!   produced on demand through a [`ClassSource`].
//! - [`DirFS`]: a host directory, passed straight through and writable.
//!
//! The synthetic backends share the immutable [`Tree`] index and the generic
//! [`TreeCursor`]; only the [`ContentProvider`] differs. [`Handle`] wraps a cursor
//! of any backend for callers that should not care about the source.
//!
//! ### Paths
//!
//! Paths use `/` as separator. Every run of `/` or `\` is collapsed and edge
//! separators are stripped (see [`utils::sanitize`]), so `"//a\\b/"` and `"a/b"`
//! name the same node. The root has the empty name and the empty full path.
//!
//! ### Example
//!
//! ```
//! use vfs_tree::{ClassDef, ClassSource, DexFS, FsBackend, FsCursor};
//!
//! struct Single;
//!
//! impl ClassSource for Single {
//!     fn class_names(&self) -> Vec<String> {
//!         vec!["com.acme.Foo".to_string()]
//!     }
//!
//!     fn find_class(&self, name: &str) -> Option<ClassDef> {
//!         Some(ClassDef::new(name, 0))
//!     }
//!
//!     fn disassemble(&self, class: &ClassDef) -> anyhow::Result<String> {
//!         Ok(format!(".class public L{};\n", class.name().replace('.', "/")))
//!     }
//! }
//!
//! let fs = DexFS::new(Single);
//! let foo = fs.resolve("com/acme/Foo.smali");
//! assert!(foo.is_file());
//! assert_eq!(foo.read().unwrap(), b".class public Lcom/acme/Foo;\n");
//! assert!(!fs.resolve("com/acme/Bar.smali").exists());
//! ```

mod core;
mod vfs;

pub use crate::core::utils::{self, sanitize};
pub use crate::core::{FsBackend, FsCursor, FsCursorMut, Result, VfsError};
pub use crate::vfs::{
    ArchiveCursor, ArchiveEntry, ArchiveReader, BackendKind, ClassCursor, ClassDef, ClassSource,
    ContentProvider, DEFAULT_EXTENSION, DEFAULT_MAX_ENTRY_SIZE, DexFS, DirFS, Entry, EntryType,
    Handle, NativeCursor, Node, NodeId, Tree, TreeBuilder, TreeCursor, ZipFS, ZipReader, class_path,
};
