//! In-memory mirror of a live directory subtree.
//!
//! The mirror is the foundation every other layer builds on: the content
//! tree, the template cache, and the destination build tree are all views
//! over [`DirNode`]/[`FileNode`]. It keeps a cheap reflection of the
//! filesystem — names, permissions, modification times — without reading
//! file contents unless a caller explicitly opens a file.
//!
//! # Reconciliation
//!
//! A mirror is synchronized explicitly via [`DirNode::refresh`]: the
//! directory is re-listed, cached entries absent from the new listing are
//! dropped (recursively for directories), new entries are added, and
//! surviving files are re-stat'ed. The stat diff — "did permissions or
//! mtime change since last observed" — is the single staleness signal the
//! rest of the crate reuses, from template recompilation to skipping
//! up-to-date artifacts.
//!
//! # Scoped file access
//!
//! [`FileNode`] owns an optional handle with a strict open → consume →
//! close protocol. Double-open, double-close, and use-while-closed are
//! distinct [`MirrorError`] variants rather than silent no-ops: every
//! layer above relies on file access being fully scoped, so a protocol
//! violation is a bug worth surfacing by name.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("merge collision on subdirectory {0:?}")]
    DirCollision(String),
    #[error("merge collision on file {0:?}")]
    FileCollision(String),
    #[error("file {0:?} is already open")]
    AlreadyOpen(PathBuf),
    #[error("file {0:?} was already closed")]
    AlreadyClosed(PathBuf),
    #[error("file {0:?} has not been opened")]
    NotOpen(PathBuf),
    #[error("no subdirectory named {0:?}")]
    MissingDir(String),
}

/// A file as last observed on disk.
///
/// `name` is the stem before the first dot and `ext` the remainder
/// including its leading dot, so `post.tar.gz` splits into `post` and
/// `.tar.gz`. Lookups by template or page name use the stem; the owning
/// [`DirNode`] keys its file map by the full on-disk name.
#[derive(Debug)]
pub struct FileNode {
    pub name: String,
    pub ext: String,
    pub dir: PathBuf,
    /// Permissions at the last stat, `None` before the first stat.
    pub perms: Option<fs::Permissions>,
    /// Modification time at the last stat, epoch before the first stat.
    pub modified: SystemTime,
    handle: Option<fs::File>,
}

impl Clone for FileNode {
    /// Clones metadata only. A clone starts closed regardless of the
    /// source's open state; handles never survive duplication.
    fn clone(&self) -> Self {
        FileNode {
            name: self.name.clone(),
            ext: self.ext.clone(),
            dir: self.dir.clone(),
            perms: self.perms.clone(),
            modified: self.modified,
            handle: None,
        }
    }
}

impl FileNode {
    /// Create a node for `file_name` inside `dir` without touching disk.
    pub fn new(dir: &Path, file_name: &str) -> FileNode {
        let (name, ext) = match file_name.split_once('.') {
            Some((stem, rest)) => (stem.to_string(), format!(".{rest}")),
            None => (file_name.to_string(), String::new()),
        };
        FileNode {
            name,
            ext,
            dir: dir.to_path_buf(),
            perms: None,
            modified: SystemTime::UNIX_EPOCH,
            handle: None,
        }
    }

    /// Full on-disk name, `<name><ext>`.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.name, self.ext)
    }

    /// Full path of the underlying file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(self.file_name())
    }

    /// Re-read metadata from disk, updating the cached permissions and
    /// modification time. Returns `true` if either differed from the
    /// previously observed values — the staleness signal consumed by the
    /// template cache and the render pipeline.
    pub fn stat(&mut self) -> Result<bool, MirrorError> {
        let meta = match &self.handle {
            Some(handle) => handle.metadata()?,
            None => fs::metadata(self.path())?,
        };
        let mut changed = false;
        let perms = meta.permissions();
        if self.perms.as_ref() != Some(&perms) {
            self.perms = Some(perms);
            changed = true;
        }
        let modified = meta.modified()?;
        if self.modified != modified {
            self.modified = modified;
            changed = true;
        }
        Ok(changed)
    }

    /// True iff the file was modified strictly after `t`.
    pub fn is_newer(&self, t: SystemTime) -> bool {
        self.modified > t
    }

    /// Open for reading. Stats first, so a missing file surfaces as an
    /// IO error before any handle exists.
    pub fn open_read(&mut self) -> Result<(), MirrorError> {
        if self.handle.is_some() {
            return Err(MirrorError::AlreadyOpen(self.path()));
        }
        self.stat()?;
        self.handle = Some(fs::File::open(self.path())?);
        Ok(())
    }

    /// Open for writing, creating the file if missing and truncating any
    /// existing contents.
    pub fn open_write(&mut self) -> Result<(), MirrorError> {
        if self.handle.is_some() {
            return Err(MirrorError::AlreadyOpen(self.path()));
        }
        let handle = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(self.path())?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Close the handle and re-stat so the cached metadata reflects any
    /// write that just happened.
    pub fn close(&mut self) -> Result<(), MirrorError> {
        if self.handle.take().is_none() {
            return Err(MirrorError::AlreadyClosed(self.path()));
        }
        self.stat()?;
        Ok(())
    }

    /// Read the entire contents as a string. The file must be open.
    pub fn read_to_string(&mut self) -> Result<String, MirrorError> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(MirrorError::NotOpen(self.path()));
        };
        let mut raw = String::new();
        handle.read_to_string(&mut raw)?;
        Ok(raw)
    }

    /// Write `data` to the open handle.
    pub fn write_all(&mut self, data: &[u8]) -> Result<(), MirrorError> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(MirrorError::NotOpen(self.path()));
        };
        handle.write_all(data)?;
        Ok(())
    }

    /// Copy all bytes of `src` into this file.
    ///
    /// Opens source read-only and this node create-truncate-write,
    /// streams the contents, then closes destination and source in that
    /// fixed order. The first error wins, but whichever handles were
    /// opened are released before returning.
    pub fn duplicate(&mut self, src: &mut FileNode) -> Result<(), MirrorError> {
        src.open_read()?;
        if let Err(err) = self.open_write() {
            let _ = src.close();
            return Err(err);
        }
        let copied = match (src.handle.as_mut(), self.handle.as_mut()) {
            (Some(from), Some(to)) => io::copy(from, to).map(|_| ()).map_err(MirrorError::from),
            // Both handles were just opened; unreachable in practice.
            _ => Err(MirrorError::NotOpen(self.path())),
        };
        let closed_dst = self.close();
        let closed_src = src.close();
        copied.and(closed_dst).and(closed_src)
    }
}

/// A directory as last observed on disk: owned name → child maps for
/// subdirectories and files. The file map is keyed by full on-disk name.
#[derive(Debug, Clone)]
pub struct DirNode {
    pub path: PathBuf,
    pub dirs: BTreeMap<String, DirNode>,
    pub files: BTreeMap<String, FileNode>,
}

impl DirNode {
    /// Recursively materialize the subtree rooted at `path`.
    pub fn build(path: &Path) -> Result<DirNode, MirrorError> {
        let mut node = DirNode {
            path: path.to_path_buf(),
            dirs: BTreeMap::new(),
            files: BTreeMap::new(),
        };
        node.refresh()?;
        Ok(node)
    }

    /// Reconcile this node against the current on-disk listing.
    ///
    /// Entries absent from the listing are removed (recursively for
    /// directories), new entries are added, existing directories recurse,
    /// and existing files re-stat. Returns the number of changed entries:
    /// removals, additions, and files whose stat diff fired.
    pub fn refresh(&mut self) -> Result<usize, MirrorError> {
        let mut listing: BTreeMap<String, bool> = BTreeMap::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            listing.insert(name, entry.file_type()?.is_dir());
        }

        let mut changed = 0;

        let stale_dirs: Vec<String> = self
            .dirs
            .keys()
            .filter(|name| listing.get(*name) != Some(&true))
            .cloned()
            .collect();
        for name in stale_dirs {
            self.dirs.remove(&name);
            changed += 1;
        }
        let stale_files: Vec<String> = self
            .files
            .keys()
            .filter(|name| listing.get(*name) != Some(&false))
            .cloned()
            .collect();
        for name in stale_files {
            self.files.remove(&name);
            changed += 1;
        }

        for (name, is_dir) in listing {
            if is_dir {
                match self.dirs.get_mut(&name) {
                    Some(sub) => changed += sub.refresh()?,
                    None => {
                        let sub = DirNode::build(&self.path.join(&name))?;
                        self.dirs.insert(name, sub);
                        changed += 1;
                    }
                }
            } else {
                match self.files.get_mut(&name) {
                    Some(file) => {
                        if file.stat()? {
                            changed += 1;
                        }
                    }
                    None => {
                        let mut file = FileNode::new(&self.path, &name);
                        file.stat()?;
                        self.files.insert(name, file);
                        changed += 1;
                    }
                }
            }
        }
        Ok(changed)
    }

    /// Structural union of two mirrors with disjoint namespaces.
    ///
    /// Any overlapping subdirectory or file name is a collision error.
    /// Neither input is mutated; the result is assembled from metadata
    /// snapshots, so a failed merge leaves no partial tree behind and a
    /// successful one starts with every file closed.
    pub fn merge(&self, other: &DirNode) -> Result<DirNode, MirrorError> {
        let mut merged = self.clone();
        for (name, sub) in &other.dirs {
            if merged.dirs.contains_key(name) {
                return Err(MirrorError::DirCollision(name.clone()));
            }
            merged.dirs.insert(name.clone(), sub.clone());
        }
        for (name, file) in &other.files {
            if merged.files.contains_key(name) {
                return Err(MirrorError::FileCollision(name.clone()));
            }
            merged.files.insert(name.clone(), file.clone());
        }
        Ok(merged)
    }

    /// Borrow an immediate subdirectory, or fail with a missing-dir
    /// error callers treat as a configuration problem.
    pub fn sub(&self, name: &str) -> Result<&DirNode, MirrorError> {
        self.dirs
            .get(name)
            .ok_or_else(|| MirrorError::MissingDir(name.to_string()))
    }

    /// Get or create the immediate subdirectory `name`, creating it on
    /// disk if missing. Destination trees grow through this.
    pub fn ensure_dir(&mut self, name: &str) -> Result<&mut DirNode, MirrorError> {
        if !self.dirs.contains_key(name) {
            let path = self.path.join(name);
            fs::create_dir_all(&path)?;
            let sub = DirNode::build(&path)?;
            self.dirs.insert(name.to_string(), sub);
        }
        Ok(self.dirs.get_mut(name).expect("just inserted"))
    }

    /// Recursively delete the subdirectory `name` from disk and drop it
    /// from the mirror.
    pub fn remove_all(&mut self, name: &str) -> Result<(), MirrorError> {
        fs::remove_dir_all(self.path.join(name))?;
        self.dirs.remove(name);
        Ok(())
    }
}
