use std::io::Read;

use crate::core::{FsCursor, FsCursorMut, Result, VfsError};
use crate::vfs::dex_fs::ClassCursor;
use crate::vfs::dir_fs::NativeCursor;
use crate::vfs::zip_fs::ArchiveCursor;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Archive,
    Bytecode,
    Native,
}

/// A cursor from any backend, used where callers should not care about the source.
///
/// Mutations are forwarded to native cursors; archive and bytecode cursors
/// answer `Unsupported`.
#[derive(Debug, Clone)]
pub enum Handle {
    Archive(ArchiveCursor),
    Bytecode(ClassCursor),
    Native(NativeCursor),
}

macro_rules! dispatch {
    ($handle:expr, $cursor:ident => $body:expr) => {
        match $handle {
            Handle::Archive($cursor) => $body,
            Handle::Bytecode($cursor) => $body,
            Handle::Native($cursor) => $body,
        }
    };
}

macro_rules! rewrap {
    ($handle:expr, $cursor:ident => $body:expr) => {
        match $handle {
            Handle::Archive($cursor) => Handle::Archive($body),
            Handle::Bytecode($cursor) => Handle::Bytecode($body),
            Handle::Native($cursor) => Handle::Native($body),
        }
    };
}

impl Handle {
    pub fn kind(&self) -> BackendKind {
        match self {
            Handle::Archive(_) => BackendKind::Archive,
            Handle::Bytecode(_) => BackendKind::Bytecode,
            Handle::Native(_) => BackendKind::Native,
        }
    }
}

impl From<ArchiveCursor> for Handle {
    fn from(cursor: ArchiveCursor) -> Self {
        Handle::Archive(cursor)
    }
}

impl From<ClassCursor> for Handle {
    fn from(cursor: ClassCursor) -> Self {
        Handle::Bytecode(cursor)
    }
}

impl From<NativeCursor> for Handle {
    fn from(cursor: NativeCursor) -> Self {
        Handle::Native(cursor)
    }
}

impl FsCursor for Handle {
    fn name(&self) -> Option<&str> {
        dispatch!(self, c => c.name())
    }

    fn full_path(&self) -> Option<&str> {
        dispatch!(self, c => c.full_path())
    }

    fn exists(&self) -> bool {
        dispatch!(self, c => c.exists())
    }

    fn is_dir(&self) -> bool {
        dispatch!(self, c => c.is_dir())
    }

    fn is_file(&self) -> bool {
        dispatch!(self, c => c.is_file())
    }

    fn resolve(&self, path: &str) -> Self {
        rewrap!(self, c => c.resolve(path))
    }

    fn ls(&self) -> Vec<Self> {
        dispatch!(self, c => c.ls().into_iter().map(Handle::from).collect())
    }

    fn length(&self) -> u64 {
        dispatch!(self, c => c.length())
    }

    fn last_modified(&self) -> i64 {
        dispatch!(self, c => c.last_modified())
    }

    fn open(&self) -> Result<Box<dyn Read + Send>> {
        dispatch!(self, c => c.open())
    }

    fn can_write(&self) -> bool {
        dispatch!(self, c => c.can_write())
    }
}

impl FsCursorMut for Handle {
    fn mkfile(&self, name: &str) -> Result<Self> {
        match self {
            Handle::Native(c) => c.mkfile(name).map(Handle::Native),
            Handle::Archive(_) | Handle::Bytecode(_) => Err(VfsError::Unsupported { op: "mkfile" }),
        }
    }

    fn mkdir(&self, name: &str) -> Result<Self> {
        match self {
            Handle::Native(c) => c.mkdir(name).map(Handle::Native),
            Handle::Archive(_) | Handle::Bytecode(_) => Err(VfsError::Unsupported { op: "mkdir" }),
        }
    }

    fn rm(&self) -> Result<()> {
        match self {
            Handle::Native(c) => c.rm(),
            Handle::Archive(_) | Handle::Bytecode(_) => Err(VfsError::Unsupported { op: "rm" }),
        }
    }

    fn rename(&self, new_name: &str) -> Result<Self> {
        match self {
            Handle::Native(c) => c.rename(new_name).map(Handle::Native),
            Handle::Archive(_) | Handle::Bytecode(_) => Err(VfsError::Unsupported { op: "rename" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{self, Write};

    use tempdir::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::core::FsBackend;
    use crate::vfs::dex_fs::{ClassDef, ClassSource, DexFS};
    use crate::vfs::dir_fs::DirFS;
    use crate::vfs::zip_fs::ZipFS;

    struct OneClass;

    impl ClassSource for OneClass {
        fn class_names(&self) -> Vec<String> {
            vec!["a.b.Main".to_string()]
        }

        fn find_class(&self, name: &str) -> Option<ClassDef> {
            (name == "a.b.Main").then(|| ClassDef::new(name, 0))
        }

        fn disassemble(&self, class: &ClassDef) -> anyhow::Result<String> {
            Ok(format!(".class public L{};\n", class.name().replace('.', "/")))
        }
    }

    fn archive_handle() -> Handle {
        let mut writer = ZipWriter::new(io::Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("a/b/Main.txt", options).unwrap();
        writer.write_all(b"archived").unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        ZipFS::from_reader(io::Cursor::new(bytes)).unwrap().root().into()
    }

    fn bytecode_handle() -> Handle {
        DexFS::new(OneClass).root().into()
    }

    fn native_handle(temp_dir: &TempDir) -> Handle {
        fs::create_dir_all(temp_dir.path().join("a/b")).unwrap();
        fs::write(temp_dir.path().join("a/b/Main.txt"), b"native").unwrap();
        DirFS::new(temp_dir.path()).unwrap().root().into()
    }

    fn all_handles(temp_dir: &TempDir) -> Vec<Handle> {
        vec![archive_handle(), bytecode_handle(), native_handle(temp_dir)]
    }

    #[test]
    fn test_kinds() {
        let temp_dir = TempDir::new("vfs_tree_handle").unwrap();
        let kinds: Vec<_> = all_handles(&temp_dir).iter().map(Handle::kind).collect();
        assert_eq!(
            kinds,
            vec![BackendKind::Archive, BackendKind::Bytecode, BackendKind::Native]
        );
    }

    #[test]
    fn test_same_queries_on_every_backend() {
        let temp_dir = TempDir::new("vfs_tree_handle").unwrap();
        for root in all_handles(&temp_dir) {
            let a = root.resolve("a");
            assert!(a.is_dir(), "{:?}", root.kind());

            let children = a.resolve("b").ls();
            assert_eq!(children.len(), 1, "{:?}", root.kind());
            let leaf = &children[0];
            assert!(leaf.is_file());
            assert!(leaf.length() > 0);
            assert!(!leaf.read().unwrap().is_empty());

            let missing = root.resolve("a/missing");
            assert!(!missing.exists());
            assert!(matches!(missing.open(), Err(VfsError::NotFound(_))));
        }
    }

    #[test]
    fn test_synthetic_handles_are_read_only() {
        for root in [archive_handle(), bytecode_handle()] {
            assert!(!root.can_write());
            assert!(matches!(root.mkfile("x"), Err(VfsError::Unsupported { op: "mkfile" })));
            assert!(matches!(root.mkdir("x"), Err(VfsError::Unsupported { op: "mkdir" })));
            assert!(matches!(root.resolve("a").rm(), Err(VfsError::Unsupported { op: "rm" })));
            assert!(matches!(
                root.resolve("a").rename("z"),
                Err(VfsError::Unsupported { op: "rename" })
            ));
            assert!(root.resolve("a").exists());
        }
    }

    #[test]
    fn test_native_handle_mutates() -> Result<()> {
        let temp_dir = TempDir::new("vfs_tree_handle").unwrap();
        let root = native_handle(&temp_dir);
        assert!(root.can_write());

        let dir = root.mkdir("new")?;
        assert_eq!(dir.kind(), BackendKind::Native);
        let file = dir.mkfile("file.txt")?;
        let renamed = file.rename("renamed.txt")?;
        assert_eq!(renamed.full_path(), Some("new/renamed.txt"));
        dir.rm()?;
        assert!(!root.resolve("new").exists());
        Ok(())
    }
}
