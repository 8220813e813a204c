//! Read-only view of compiled classes as a tree of disassembly files.
//!
//! Class `com.acme.Foo` becomes the file `com/acme/Foo.smali`. Nothing is
//! disassembled up front: the text is produced every time a file is opened
//! (or its length asked for), so each call costs one class.

use std::io::{self, Read};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::{FsBackend, Result, VfsError};
use crate::vfs::cursor::{ContentProvider, TreeCursor};
use crate::vfs::tree::Tree;

/// Suffix of class files when no other is configured.
pub const DEFAULT_EXTENSION: &str = ".smali";

/// Lightweight reference to a class definition inside its [`ClassSource`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassDef {
    name: String,
    index: usize,
}

impl ClassDef {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    /// Dot-qualified class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source-specific handle, e.g. the position in a dex class table.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Bytecode collaborator: lists classes, looks them up and disassembles them.
pub trait ClassSource: Send + Sync {
    /// Every dot-qualified class name, in any order.
    fn class_names(&self) -> Vec<String>;

    fn find_class(&self, name: &str) -> Option<ClassDef>;

    /// Produces the textual disassembly of `class`.
    fn disassemble(&self, class: &ClassDef) -> anyhow::Result<String>;

    /// Modification time of the underlying dex file, 0 if unknown.
    fn last_modified(&self) -> i64 {
        0
    }
}

/// Maps `com.acme.Foo` to `com/acme/Foo<extension>`.
pub fn class_path(class_name: &str, extension: &str) -> String {
    format!("{}{}", class_name.replace('.', "/"), extension)
}

struct ClassContent {
    source: Box<dyn ClassSource>,
}

impl ContentProvider<ClassDef> for ClassContent {
    fn open(&self, path: &str, payload: &ClassDef) -> Result<Box<dyn Read + Send>> {
        let text = self
            .source
            .disassemble(payload)
            .map_err(|e| VfsError::backend(path, e))?;
        Ok(Box::new(io::Cursor::new(text.into_bytes())))
    }

    fn length(&self, payload: &ClassDef) -> u64 {
        match self.source.disassemble(payload) {
            Ok(text) => text.len() as u64,
            Err(err) => {
                debug!(class = payload.name(), error = %err, "length unavailable");
                0
            }
        }
    }

    fn last_modified(&self, _payload: &ClassDef) -> i64 {
        self.source.last_modified()
    }

    fn container_modified(&self) -> i64 {
        self.source.last_modified()
    }
}

pub type ClassCursor = TreeCursor<ClassDef>;

/// A read-only filesystem over the classes of a dex file.
///
/// A class that is listed by the source but cannot be found ends up as an
/// empty directory at its file position; such classes are logged.
pub struct DexFS {
    tree: Arc<Tree<ClassDef>>,
    content: Arc<ClassContent>,
}

impl DexFS {
    pub fn new<S: ClassSource + 'static>(source: S) -> Self {
        Self::with_extension(source, DEFAULT_EXTENSION)
    }

    /// Like `new()`, with class files named `<Class><extension>`.
    pub fn with_extension<S: ClassSource + 'static>(source: S, extension: &str) -> Self {
        let names = source.class_names();
        let tree = Tree::build(names.iter().map(|name| {
            let source = &source;
            (class_path(name, extension), move || {
                let class = source.find_class(name);
                if class.is_none() {
                    warn!(class = %name, "listed class has no definition");
                }
                class
            })
        }));
        debug!(
            classes = names.len(),
            nodes = tree.len(),
            conflicts = tree.conflicts().len(),
            "class tree built"
        );
        Self {
            tree: Arc::new(tree),
            content: Arc::new(ClassContent {
                source: Box::new(source),
            }),
        }
    }

    /// Class files that could not be placed in the tree.
    pub fn conflicts(&self) -> &[String] {
        self.tree.conflicts()
    }

    pub fn source(&self) -> &dyn ClassSource {
        self.content.source.as_ref()
    }
}

impl FsBackend for DexFS {
    type Cursor = ClassCursor;

    fn root(&self) -> ClassCursor {
        let content: Arc<dyn ContentProvider<ClassDef>> = self.content.clone();
        TreeCursor::new(Arc::clone(&self.tree), content)
    }

    fn is_read_only(&self) -> bool {
        true
    }
}
