//! File system abstraction.
//!
//! The executor and the quarantine sweep only touch the disk through
//! [`FileSystem`]. Three implementations exist:
//! - [`RealFileSystem`]: the host file system
//! - [`MemoryFileSystem`]: an in-memory tree for tests
//! - [`DryRunFs`]: a copy-on-write overlay that records simulated effects on
//!   top of another file system without mutating it

use crate::utils::hash;
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Operations the engine needs from a file system.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    /// Move a file or directory. Missing parents of `to` are created.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    /// Immediate children of a directory, sorted.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Check if a path exists and is a directory.
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::PathNotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(Error::NotADirectory(path.display().to_string()));
    }
    Ok(())
}

/// Get file extension in lowercase.
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// File name of a path as a string.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn poisoned() -> Error {
    Error::other("file system state poisoned")
}

// ========== Real ==========

/// The host file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl RealFileSystem {
    /// Copy `from` to `to`, verify the checksum, then delete `from`.
    fn copy_file_verified(from: &Path, to: &Path) -> Result<()> {
        let checksum = hash::sha256_file(from)?;
        std::fs::copy(from, to)?;
        if hash::sha256_file(to)? != checksum {
            // Remove incomplete copy
            let _ = std::fs::remove_file(to);
            return Err(Error::operation(to, "checksum mismatch after copy"));
        }
        std::fs::remove_file(from)?;
        Ok(())
    }

    fn copy_tree_verified(from: &Path, to: &Path) -> Result<()> {
        for entry in walkdir::WalkDir::new(from).follow_links(false) {
            let entry = entry.map_err(|e| Error::operation(from, e.to_string()))?;
            let rel = entry
                .path()
                .strip_prefix(from)
                .map_err(|e| Error::operation(entry.path(), e.to_string()))?;
            let dest = to.join(rel);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest)?;
            } else {
                Self::copy_file_verified(entry.path(), &dest)?;
            }
        }
        std::fs::remove_dir_all(from)?;
        Ok(())
    }
}

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Try atomic rename first (same filesystem, instant)
        match std::fs::rename(from, to) {
            Ok(()) => {
                tracing::debug!("Moved (rename): {:?} -> {:?}", from, to);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
                tracing::debug!("Cross-filesystem move detected, using copy+delete");
                if from.is_dir() {
                    Self::copy_tree_verified(from, to)
                } else {
                    Self::copy_file_verified(from, to)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = std::fs::read_dir(path)?
            .map(|e| e.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }
}

// ========== In-memory ==========

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// In-memory file system for tests. Paths are treated literally.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
    denied: Mutex<HashSet<PathBuf>>,
    mutations: Mutex<usize>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file (and its parent directories).
    pub fn add_file(&self, path: impl AsRef<Path>, contents: &[u8]) {
        let path = path.as_ref();
        if let Ok(mut nodes) = self.nodes.lock() {
            Self::insert_ancestors(&mut nodes, path);
            nodes.insert(path.to_path_buf(), Node::File(contents.to_vec()));
        }
    }

    /// Add a directory (and its parents).
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if let Ok(mut nodes) = self.nodes.lock() {
            Self::insert_ancestors(&mut nodes, path);
            nodes.insert(path.to_path_buf(), Node::Dir);
        }
    }

    /// Make every mutation targeting `path` fail with permission denied.
    pub fn deny(&self, path: impl AsRef<Path>) {
        if let Ok(mut denied) = self.denied.lock() {
            denied.insert(path.as_ref().to_path_buf());
        }
    }

    /// Contents of a file, if present.
    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let nodes = self.nodes.lock().ok()?;
        match nodes.get(path.as_ref()) {
            Some(Node::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// All file paths, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.nodes
            .lock()
            .map(|nodes| {
                nodes
                    .iter()
                    .filter(|(_, n)| matches!(n, Node::File(_)))
                    .map(|(p, _)| p.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of successful mutations so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations.lock().map(|m| *m).unwrap_or_default()
    }

    fn insert_ancestors(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
    }

    fn check_allowed(&self, path: &Path) -> Result<()> {
        let denied = self.denied.lock().map_err(|_| poisoned())?;
        if denied.iter().any(|d| path.starts_with(d)) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            )));
        }
        Ok(())
    }

    fn record_mutation(&self) {
        if let Ok(mut m) = self.mutations.lock() {
            *m += 1;
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.nodes
            .lock()
            .map(|n| n.contains_key(path))
            .unwrap_or(false)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.nodes
            .lock()
            .map(|n| matches!(n.get(path), Some(Node::Dir)))
            .unwrap_or(false)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.check_allowed(path)?;
        let mut nodes = self.nodes.lock().map_err(|_| poisoned())?;
        for ancestor in path.ancestors() {
            if let Some(Node::File(_)) = nodes.get(ancestor) {
                return Err(Error::operation(ancestor, "not a directory"));
            }
        }
        Self::insert_ancestors(&mut nodes, path);
        nodes.insert(path.to_path_buf(), Node::Dir);
        drop(nodes);
        self.record_mutation();
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.check_allowed(from)?;
        self.check_allowed(to)?;
        let mut nodes = self.nodes.lock().map_err(|_| poisoned())?;
        if !nodes.contains_key(from) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", from.display()),
            )));
        }
        if nodes.contains_key(to) {
            return Err(Error::operation(to, "destination exists"));
        }

        let moved: Vec<(PathBuf, Node)> = nodes
            .range(from.to_path_buf()..)
            .take_while(|(p, _)| p.starts_with(from))
            .map(|(p, n)| (p.clone(), n.clone()))
            .collect();
        for (path, _) in &moved {
            nodes.remove(path);
        }
        Self::insert_ancestors(&mut nodes, to);
        for (path, node) in moved {
            let rel = path.strip_prefix(from).unwrap_or(Path::new(""));
            let dest = if rel.as_os_str().is_empty() {
                to.to_path_buf()
            } else {
                to.join(rel)
            };
            nodes.insert(dest, node);
        }
        drop(nodes);
        self.record_mutation();
        Ok(())
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.check_allowed(path)?;
        let mut nodes = self.nodes.lock().map_err(|_| poisoned())?;
        if let Some(Node::Dir) = nodes.get(path) {
            return Err(Error::operation(path, "is a directory"));
        }
        Self::insert_ancestors(&mut nodes, path);
        nodes.insert(path.to_path_buf(), Node::File(contents.to_vec()));
        drop(nodes);
        self.record_mutation();
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let nodes = self.nodes.lock().map_err(|_| poisoned())?;
        if !matches!(nodes.get(path), Some(Node::Dir)) {
            return Err(Error::NotADirectory(path.display().to_string()));
        }
        Ok(nodes
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect())
    }
}

// ========== Dry-run overlay ==========

#[derive(Debug, Clone, PartialEq)]
enum Overlay {
    /// Simulated new directory.
    Dir,
    /// Simulated new file.
    File,
    /// Moved or deleted away.
    Removed,
    /// Now holds what lives at this path of the underlying file system.
    Moved(PathBuf),
}

/// Where a path resolves to after simulated changes.
#[derive(Debug, Clone, PartialEq)]
enum Located {
    Base(PathBuf),
    VirtualDir,
    VirtualFile,
    Missing,
}

/// Copy-on-write overlay that simulates mutations over another file system.
///
/// Reads see the simulated effects of earlier writes; the underlying file
/// system is never mutated.
pub struct DryRunFs {
    base: Arc<dyn FileSystem>,
    overlay: Mutex<HashMap<PathBuf, Overlay>>,
}

impl DryRunFs {
    pub fn new(base: Arc<dyn FileSystem>) -> Self {
        Self {
            base,
            overlay: Mutex::new(HashMap::new()),
        }
    }

    fn locate(&self, path: &Path) -> Located {
        let overlay = match self.overlay.lock() {
            Ok(o) => o,
            Err(_) => return Located::Missing,
        };
        Self::locate_in(&overlay, path)
    }

    fn locate_in(overlay: &HashMap<PathBuf, Overlay>, path: &Path) -> Located {
        for ancestor in path.ancestors() {
            match overlay.get(ancestor) {
                Some(Overlay::Removed) => return Located::Missing,
                Some(Overlay::Dir) if ancestor == path => return Located::VirtualDir,
                Some(Overlay::File) if ancestor == path => return Located::VirtualFile,
                Some(Overlay::Moved(origin)) => {
                    let rel = path.strip_prefix(ancestor).unwrap_or(Path::new(""));
                    let translated = if rel.as_os_str().is_empty() {
                        origin.clone()
                    } else {
                        origin.join(rel)
                    };
                    // Children taken out of the origin before it moved stay gone
                    for inner in translated.ancestors() {
                        if inner == origin.as_path() {
                            break;
                        }
                        if overlay.get(inner) == Some(&Overlay::Removed) {
                            return Located::Missing;
                        }
                    }
                    return Located::Base(translated);
                }
                _ => {}
            }
        }
        Located::Base(path.to_path_buf())
    }
}

impl FileSystem for DryRunFs {
    fn exists(&self, path: &Path) -> bool {
        match self.locate(path) {
            Located::Base(p) => self.base.exists(&p),
            Located::VirtualDir | Located::VirtualFile => true,
            Located::Missing => false,
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        match self.locate(path) {
            Located::Base(p) => self.base.is_dir(&p),
            Located::VirtualDir => true,
            Located::VirtualFile | Located::Missing => false,
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let missing: Vec<PathBuf> = path
            .ancestors()
            .filter(|a| !a.as_os_str().is_empty() && !self.exists(a))
            .map(Path::to_path_buf)
            .collect();
        let mut overlay = self.overlay.lock().map_err(|_| poisoned())?;
        for dir in missing {
            overlay.insert(dir, Overlay::Dir);
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let located = self.locate(from);
        let entry = match located {
            Located::Base(p) if self.base.exists(&p) => Overlay::Moved(p),
            Located::VirtualDir => Overlay::Dir,
            Located::VirtualFile => Overlay::File,
            _ => {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no such file: {}", from.display()),
                )))
            }
        };
        if let Some(parent) = to.parent() {
            self.create_dir_all(parent)?;
        }
        let mut overlay = self.overlay.lock().map_err(|_| poisoned())?;
        overlay.insert(from.to_path_buf(), Overlay::Removed);
        overlay.insert(to.to_path_buf(), entry);
        Ok(())
    }

    fn write(&self, path: &Path, _contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        let mut overlay = self.overlay.lock().map_err(|_| poisoned())?;
        overlay.insert(path.to_path_buf(), Overlay::File);
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut children = BTreeSet::new();
        match self.locate(path) {
            Located::Base(p) => {
                for child in self.base.read_dir(&p)? {
                    if let Some(name) = child.file_name() {
                        children.insert(path.join(name));
                    }
                }
            }
            Located::VirtualDir => {}
            Located::VirtualFile | Located::Missing => {
                return Err(Error::NotADirectory(path.display().to_string()))
            }
        }

        let added: Vec<PathBuf> = {
            let overlay = self.overlay.lock().map_err(|_| poisoned())?;
            overlay
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect()
        };
        children.extend(added);

        Ok(children.into_iter().filter(|c| self.exists(c)).collect())
    }
}
