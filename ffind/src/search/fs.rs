//! The filesystem primitives the walker is built on.
//!
//! The engine only ever needs two things from the OS: the children of a
//! directory (name plus the entry's own kind) and, when symlinks are being
//! followed, the kind of whatever a link points at. Keeping those behind a
//! trait lets tests drive the engine with fault-injecting filesystems.

use std::ffi::{OsStr, OsString};
use std::fs::{self, FileType};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::FindResult;

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Sockets, fifos, device nodes
    Other,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}

impl From<FileType> for EntryKind {
    fn from(file_type: FileType) -> Self {
        if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else if file_type.is_symlink() {
            Self::Symlink
        } else {
            Self::Other
        }
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    pub name: OsString,
    /// Kind of the entry itself; symlinks are reported as `Symlink`
    pub kind: EntryKind,
}

impl Child {
    pub fn new(name: impl Into<OsString>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Directory listing and type probing, as consumed by the traversal engine
pub trait Filesystem: Sync {
    /// Lists the children of `dir`, excluding `.` and `..`
    fn list_children(&self, dir: &Path) -> io::Result<Vec<Child>>;

    /// Kind of the entry at `path` after following symlinks
    fn resolve_kind(&self, path: &Path) -> io::Result<EntryKind>;

    /// Builds the full path of `name` inside `dir`
    fn child_path(&self, dir: &Path, name: &OsStr) -> FindResult<PathBuf> {
        join_child(dir, name)
    }
}

/// Joins a directory and an entry name, inserting `/` unless `dir` already ends
/// with one. Allocation failure is reported instead of aborting the process.
pub fn join_child(dir: &Path, name: &OsStr) -> FindResult<PathBuf> {
    let mut path = PathBuf::new();
    path.try_reserve(dir.as_os_str().len() + name.len() + 1)?;
    path.push(dir);
    path.push(name);
    Ok(path)
}

/// The real filesystem, via `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn list_children(&self, dir: &Path) -> io::Result<Vec<Child>> {
        let mut children = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            let kind = match entry.file_type() {
                Ok(file_type) => EntryKind::from(file_type),
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "Failed to probe entry type");
                    EntryKind::Other
                }
            };
            children.push(Child::new(entry.file_name(), kind));
        }
        Ok(children)
    }

    fn resolve_kind(&self, path: &Path) -> io::Result<EntryKind> {
        fs::metadata(path).map(|metadata| EntryKind::from(metadata.file_type()))
    }
}
