//! Immutable path index shared by the synthetic backends.
//!
//! A [`Tree`] is built once from a flat enumeration of path-like keys and never
//! changes afterwards, so any number of cursors may read it from any thread.
//! Nodes live in an arena and refer to their children by [`NodeId`]; there are
//! no back-pointers because every node stores its full path.
//!
//! ### Invariants
//!
//! 1. **Root**: node `0` is the root, has no payload and its name and full
//!    path are both `""`.
//! 2. **Kind**: a node with a payload is a file, a node without one is a
//!    directory. Nothing else decides it.
//! 3. **Full path**: `full_path == join(parent.full_path, name)`, computed once
//!    on insertion.
//! 4. **Parents**: every parent segment of an inserted leaf exists as a
//!    directory.
//! 5. **Uniqueness**: child keys are unique and equal to the child's name.

use std::collections::BTreeMap;

use tracing::warn;

use crate::core::utils;

/// Index of a node inside its [`Tree`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Debug)]
pub struct Node<P> {
    name: String,
    full_path: String,
    payload: Option<P>,
    children: BTreeMap<String, NodeId>,
}

impl<P> Node<P> {
    fn new(parent_path: &str, name: &str, payload: Option<P>) -> Self {
        Node {
            name: name.to_string(),
            full_path: utils::join(parent_path, name),
            payload,
            children: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn payload(&self) -> Option<&P> {
        self.payload.as_ref()
    }

    pub fn is_dir(&self) -> bool {
        self.payload.is_none()
    }

    pub fn is_file(&self) -> bool {
        self.payload.is_some()
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// Children ids ordered by name.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }
}

#[derive(Debug)]
pub struct Tree<P> {
    nodes: Vec<Node<P>>,
    conflicts: Vec<String>,
}

impl<P> Tree<P> {
    /// Builds a tree from `(raw_path, payload_factory)` pairs in enumeration order.
    ///
    /// The factory is not called for entries rejected on a parent segment. A
    /// factory returning `None` produces a directory at that position.
    pub fn build<I, S, F>(entries: I) -> Tree<P>
    where
        I: IntoIterator<Item = (S, F)>,
        S: AsRef<str>,
        F: FnOnce() -> Option<P>,
    {
        let mut builder = TreeBuilder::new();
        for (raw_path, payload) in entries {
            builder.insert_with(raw_path.as_ref(), payload);
        }
        builder.build()
    }

    pub fn root(&self) -> &Node<P> {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Returns the node `id` names, `None` if `id` does not belong to this tree.
    pub fn get(&self, id: NodeId) -> Option<&Node<P>> {
        self.nodes.get(id.0)
    }

    /// Ids handed out by this tree only.
    pub(crate) fn node(&self, id: NodeId) -> &Node<P> {
        &self.nodes[id.0]
    }

    /// Walks `path` down from `from`. Any missing segment fails the whole lookup.
    /// The empty path resolves to `from` itself.
    pub fn lookup(&self, from: NodeId, path: &str) -> Option<NodeId> {
        let path = utils::sanitize(path);
        self.get(from)?;
        let mut current = from;
        for segment in utils::segments(&path) {
            current = self.get(current)?.child(segment)?;
        }
        Some(current)
    }

    /// Raw paths rejected because they collided with an incompatible node.
    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }

    /// Number of nodes reachable from the root, root included.
    pub fn len(&self) -> usize {
        self.reachable().count()
    }

    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }

    /// Number of reachable files.
    pub fn leaf_count(&self) -> usize {
        self.reachable().filter(|&id| self.node(id).is_file()).count()
    }

    fn reachable(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![NodeId::ROOT];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.node(id).children());
            Some(id)
        })
    }
}

/// Incremental form of [`Tree::build`].
///
/// Collision rule, applied to the last segment of every entry:
/// * file over file: the later entry wins;
/// * directory over directory: the existing node stays, children survive;
/// * file over an empty directory: the file replaces it;
/// * file over a non-empty directory, or directory over a file: rejected.
///
/// An entry whose intermediate segment hits a file is rejected as well.
/// Rejected entries are logged and listed in [`Tree::conflicts`].
pub struct TreeBuilder<P> {
    tree: Tree<P>,
}

impl<P> TreeBuilder<P> {
    pub fn new() -> Self {
        Self {
            tree: Tree {
                nodes: vec![Node::new("", "", None)],
                conflicts: Vec::new(),
            },
        }
    }

    /// Inserts `raw_path` with a ready payload. See [`TreeBuilder::insert_with`].
    pub fn insert(&mut self, raw_path: &str, payload: Option<P>) -> bool {
        self.insert_with(raw_path, || payload)
    }

    /// Inserts `raw_path`, creating missing parent directories.
    /// Returns false if the entry was skipped (empty path or conflict).
    pub fn insert_with<F>(&mut self, raw_path: &str, payload: F) -> bool
    where
        F: FnOnce() -> Option<P>,
    {
        let sanitized = utils::sanitize(raw_path);
        let segments: Vec<&str> = utils::segments(&sanitized).collect();
        let Some((last, parents)) = segments.split_last() else {
            return false;
        };

        let mut current = NodeId::ROOT;
        for &segment in parents {
            current = match self.tree.node(current).child(segment) {
                Some(id) if self.tree.node(id).is_file() => {
                    return self.reject(raw_path, "a parent segment is a file");
                }
                Some(id) => id,
                None => self.push_child(current, segment, None),
            };
        }

        let payload = payload();
        let existing = self.tree.node(current).child(last).map(|id| {
            let node = self.tree.node(id);
            (node.is_file(), node.children.is_empty())
        });
        match (existing, payload.is_some()) {
            (None, _) | (Some((true, _)), true) | (Some((false, true)), true) => {
                self.push_child(current, last, payload);
            }
            (Some((false, _)), false) => {}
            (Some((false, false)), true) => {
                return self.reject(raw_path, "a file would replace a non-empty directory");
            }
            (Some((true, _)), false) => {
                return self.reject(raw_path, "a directory would replace a file");
            }
        }
        true
    }

    pub fn build(self) -> Tree<P> {
        self.tree
    }

    /// Appends a node and links it under `parent`, replacing any previous link.
    fn push_child(&mut self, parent: NodeId, name: &str, payload: Option<P>) -> NodeId {
        let id = NodeId(self.tree.nodes.len());
        let node = Node::new(self.tree.node(parent).full_path(), name, payload);
        self.tree.nodes.push(node);
        self.tree.nodes[parent.0].children.insert(name.to_string(), id);
        id
    }

    fn reject(&mut self, raw_path: &str, reason: &str) -> bool {
        warn!(path = raw_path, reason, "ambiguous entry skipped");
        self.tree.conflicts.push(raw_path.to_string());
        false
    }
}

impl<P> Default for TreeBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_of<P: Clone>(items: &[(&str, Option<P>)]) -> Tree<P> {
        Tree::build(items.iter().map(|(path, payload)| {
            let payload = payload.clone();
            (*path, move || payload)
        }))
    }

    fn names<P>(tree: &Tree<P>, id: NodeId) -> Vec<&str> {
        tree.node(id)
            .children()
            .map(|child| tree.node(child).name())
            .collect()
    }

    mod build {
        use super::*;

        #[test]
        fn test_build_creates_intermediate_directories() {
            let tree: Tree<u32> = tree_of(&[
                ("a/b/f1.bin", Some(1)),
                ("a/b/f2.bin", Some(2)),
                ("a/c.bin", Some(3)),
            ]);

            let a = tree.lookup(NodeId::ROOT, "a").unwrap();
            assert!(tree.node(a).is_dir());
            assert_eq!(names(&tree, a), vec!["b", "c.bin"]);

            let b = tree.lookup(NodeId::ROOT, "a/b").unwrap();
            assert!(tree.node(b).is_dir());
            assert_eq!(names(&tree, b), vec!["f1.bin", "f2.bin"]);

            let c = tree.lookup(a, "c.bin").unwrap();
            assert_eq!(tree.node(c).payload(), Some(&3));
        }

        #[test]
        fn test_build_full_paths_match_sanitized_input() {
            let inputs = ["/x/y/z.txt", "x//w.txt", "\\v\\u.txt", "top.txt"];
            let tree: Tree<()> = Tree::build(inputs.iter().map(|p| (*p, || Some(()))));

            assert_eq!(tree.leaf_count(), inputs.len());
            for input in inputs {
                let sanitized = utils::sanitize(input);
                let id = tree.lookup(NodeId::ROOT, &sanitized).unwrap();
                assert_eq!(tree.node(id).full_path(), sanitized);
                assert!(tree.node(id).is_file());
            }
            let x = tree.lookup(NodeId::ROOT, "x/y").unwrap();
            assert_eq!(tree.node(x).full_path(), "x/y");
            assert!(tree.node(x).is_dir());
        }

        #[test]
        fn test_build_root() {
            let tree: Tree<u8> = tree_of(&[("a", Some(1))]);
            let root = tree.root();
            assert_eq!(root.name(), "");
            assert_eq!(root.full_path(), "");
            assert!(root.is_dir());
            assert!(root.payload().is_none());
        }

        #[test]
        fn test_build_skips_empty_paths() {
            let tree: Tree<u8> = tree_of(&[("", Some(1)), ("///", Some(2))]);
            assert!(tree.is_empty());
            assert_eq!(tree.len(), 1);
            assert!(tree.conflicts().is_empty());
        }

        #[test]
        fn test_build_without_payload_is_directory() {
            let tree: Tree<u8> = tree_of(&[("com/acme/Foo.smali", None)]);
            let id = tree.lookup(NodeId::ROOT, "com/acme/Foo.smali").unwrap();
            assert!(tree.node(id).is_dir());
            assert_eq!(tree.leaf_count(), 0);
        }

        #[test]
        fn test_build_listing_independent_of_order() {
            let forward: Tree<u8> = tree_of(&[
                ("d/1", Some(1)),
                ("d/2", Some(2)),
                ("d/sub/3", Some(3)),
            ]);
            let backward: Tree<u8> = tree_of(&[
                ("d/sub/3", Some(3)),
                ("d/2", Some(2)),
                ("d/1", Some(1)),
            ]);
            let f = forward.lookup(NodeId::ROOT, "d").unwrap();
            let b = backward.lookup(NodeId::ROOT, "d").unwrap();
            assert_eq!(names(&forward, f), names(&backward, b));
            assert_eq!(names(&forward, f), vec!["1", "2", "sub"]);
        }

        #[test]
        fn test_build_kind_is_exclusive() {
            let tree: Tree<u8> = tree_of(&[
                ("a/b/c", Some(1)),
                ("a/d", None),
                ("e", Some(2)),
            ]);
            for id in tree.reachable() {
                let node = tree.node(id);
                assert_ne!(node.is_dir(), node.is_file());
            }
        }
    }

    mod collisions {
        use super::*;

        #[test]
        fn test_file_over_file_last_writer_wins() {
            let tree: Tree<u8> = tree_of(&[("a/f", Some(1)), ("a/f", Some(2))]);
            let id = tree.lookup(NodeId::ROOT, "a/f").unwrap();
            assert_eq!(tree.node(id).payload(), Some(&2));
            assert_eq!(tree.leaf_count(), 1);
            assert!(tree.conflicts().is_empty());
        }

        #[test]
        fn test_directory_entry_keeps_existing_children() {
            let tree: Tree<u8> = tree_of(&[("a/b", Some(1)), ("a/", None)]);
            let id = tree.lookup(NodeId::ROOT, "a/b").unwrap();
            assert!(tree.node(id).is_file());
            assert!(tree.conflicts().is_empty());
        }

        #[test]
        fn test_file_replaces_empty_directory() {
            let tree: Tree<u8> = tree_of(&[("a/", None), ("a", Some(7))]);
            let id = tree.lookup(NodeId::ROOT, "a").unwrap();
            assert_eq!(tree.node(id).payload(), Some(&7));
        }

        #[test]
        fn test_file_over_populated_directory_rejected() {
            let tree: Tree<u8> = tree_of(&[("a/b", Some(1)), ("a", Some(2))]);
            let a = tree.lookup(NodeId::ROOT, "a").unwrap();
            assert!(tree.node(a).is_dir());
            assert!(tree.lookup(NodeId::ROOT, "a/b").is_some());
            assert_eq!(tree.conflicts(), ["a"]);
        }

        #[test]
        fn test_directory_implied_through_file_rejected() {
            let tree: Tree<u8> = tree_of(&[("a", Some(1)), ("a/b", Some(2))]);
            let a = tree.lookup(NodeId::ROOT, "a").unwrap();
            assert!(tree.node(a).is_file());
            assert!(tree.lookup(NodeId::ROOT, "a/b").is_none());
            assert_eq!(tree.conflicts(), ["a/b"]);
        }

        #[test]
        fn test_directory_over_file_rejected() {
            let mut builder: TreeBuilder<u8> = TreeBuilder::new();
            assert!(builder.insert("a", Some(1)));
            assert!(!builder.insert("a/", None));
            let tree = builder.build();
            assert!(tree.node(tree.lookup(NodeId::ROOT, "a").unwrap()).is_file());
            assert_eq!(tree.conflicts(), ["a/"]);
        }

        #[test]
        fn test_rejected_entry_does_not_call_factory() {
            let mut builder: TreeBuilder<u8> = TreeBuilder::new();
            builder.insert("a", Some(1));
            let inserted = builder.insert_with("a/b/c", || panic!("factory must not run"));
            assert!(!inserted);
        }
    }

    mod lookup {
        use super::*;

        fn setup_tree() -> Tree<u8> {
            tree_of(&[("a/b/f1.bin", Some(1)), ("a/c.bin", Some(2))])
        }

        #[test]
        fn test_lookup_missing_segment() {
            let tree = setup_tree();
            assert!(tree.lookup(NodeId::ROOT, "a/missing").is_none());
            assert!(tree.lookup(NodeId::ROOT, "a/missing/f1.bin").is_none());
            assert!(tree.lookup(NodeId::ROOT, "a/c.bin/x").is_none());
        }

        #[test]
        fn test_lookup_empty_path_is_start() {
            let tree = setup_tree();
            let a = tree.lookup(NodeId::ROOT, "a").unwrap();
            assert_eq!(tree.lookup(a, ""), Some(a));
            assert_eq!(tree.lookup(NodeId::ROOT, "/"), Some(NodeId::ROOT));
        }

        #[test]
        fn test_foreign_node_id() {
            let tree = setup_tree();
            let big: Tree<u8> = tree_of(&[("x/y/z/w/v/u", Some(1))]);
            let deep = big.lookup(NodeId::ROOT, "x/y/z/w/v/u").unwrap();

            assert!(tree.get(deep).is_none());
            assert!(tree.lookup(deep, "").is_none());
            assert!(tree.lookup(deep, "a").is_none());
            assert_eq!(tree.get(NodeId::ROOT).map(Node::full_path), Some(""));
        }

        #[test]
        fn test_lookup_relative_and_dirty() {
            let tree = setup_tree();
            let a = tree.lookup(NodeId::ROOT, "a").unwrap();
            let f1 = tree.lookup(a, "//b\\f1.bin/").unwrap();
            assert_eq!(tree.node(f1).full_path(), "a/b/f1.bin");
        }
    }
}
