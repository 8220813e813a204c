use std::fmt;
use std::io::Read;
use std::sync::Arc;

use crate::core::{FsCursor, Result, VfsError};
use crate::vfs::tree::{Node, NodeId, Tree};

/// Materializes the content of a leaf from its payload.
///
/// Providers are owned by their backend and shared with every cursor through
/// an `Arc`, so they outlive any cursor that may call `open()`.
pub trait ContentProvider<P>: Send + Sync {
    /// Opens the content described by `payload`. `path` is only used in errors.
    fn open(&self, path: &str, payload: &P) -> Result<Box<dyn Read + Send>>;

    fn length(&self, payload: &P) -> u64;

    fn last_modified(&self, payload: &P) -> i64;

    /// Modification time of the container itself (archive or dex file),
    /// reported for directories. 0 if unknown.
    fn container_modified(&self) -> i64;
}

/// A resolved-or-absent position inside a shared [`Tree`].
///
/// Cloning is cheap: the tree and the provider are reference counted.
pub struct TreeCursor<P> {
    tree: Arc<Tree<P>>,
    provider: Arc<dyn ContentProvider<P>>,
    current: Option<NodeId>,
}

impl<P> TreeCursor<P> {
    pub fn new(tree: Arc<Tree<P>>, provider: Arc<dyn ContentProvider<P>>) -> Self {
        Self {
            tree,
            provider,
            current: Some(NodeId::ROOT),
        }
    }

    fn at(&self, current: Option<NodeId>) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            provider: Arc::clone(&self.provider),
            current,
        }
    }

    fn node(&self) -> Option<&Node<P>> {
        self.current.map(|id| self.tree.node(id))
    }

    /// Payload of the current node, `None` for directories and absent cursors.
    pub fn payload(&self) -> Option<&P> {
        self.node().and_then(Node::payload)
    }

    pub fn shared_tree(&self) -> &Arc<Tree<P>> {
        &self.tree
    }
}

impl<P> Clone for TreeCursor<P> {
    fn clone(&self) -> Self {
        self.at(self.current)
    }
}

impl<P> fmt::Debug for TreeCursor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeCursor")
            .field("path", &self.full_path())
            .finish()
    }
}

impl<P> FsCursor for TreeCursor<P> {
    fn name(&self) -> Option<&str> {
        self.node().map(Node::name)
    }

    fn full_path(&self) -> Option<&str> {
        self.node().map(Node::full_path)
    }

    fn exists(&self) -> bool {
        self.current.is_some()
    }

    fn is_dir(&self) -> bool {
        self.node().is_some_and(Node::is_dir)
    }

    fn is_file(&self) -> bool {
        self.node().is_some_and(Node::is_file)
    }

    fn resolve(&self, path: &str) -> Self {
        let target = self
            .current
            .and_then(|from| self.tree.lookup(from, path));
        self.at(target)
    }

    fn ls(&self) -> Vec<Self> {
        match self.node() {
            Some(node) => node.children().map(|id| self.at(Some(id))).collect(),
            None => Vec::new(),
        }
    }

    fn length(&self) -> u64 {
        self.payload()
            .map(|payload| self.provider.length(payload))
            .unwrap_or(0)
    }

    fn last_modified(&self) -> i64 {
        match self.node() {
            Some(node) => match node.payload() {
                Some(payload) => self.provider.last_modified(payload),
                None => self.provider.container_modified(),
            },
            None => 0,
        }
    }

    fn open(&self) -> Result<Box<dyn Read + Send>> {
        let Some(node) = self.node() else {
            return Err(VfsError::NotFound("document".to_string())); // absent cursors keep no path
        };
        let Some(payload) = node.payload() else {
            return Err(VfsError::IsDirectory(node.full_path().to_string()));
        };
        tracing::trace!(path = node.full_path(), "opening content");
        self.provider.open(node.full_path(), payload)
    }

    fn can_write(&self) -> bool {
        false
    }
}
