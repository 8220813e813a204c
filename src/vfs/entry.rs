#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// Metadata snapshot of a resolved cursor, as returned by `FsCursor::stat()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    path: String,
    entry_type: EntryType,
    length: u64,
    last_modified: i64,
}

impl Entry {
    pub fn new(name: &str, path: &str, is_dir: bool, length: u64, last_modified: i64) -> Entry {
        let entry_type = if is_dir {
            EntryType::Directory
        } else {
            EntryType::File
        };
        Entry {
            name: name.to_string(),
            path: path.to_string(),
            entry_type,
            length,
            last_modified,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn last_modified(&self) -> i64 {
        self.last_modified
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}
