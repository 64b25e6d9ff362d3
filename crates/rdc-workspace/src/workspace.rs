use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use tracing::{info, warn};

use crate::error::WorkspaceError;

/// A scoped handle to a filesystem subtree under a shared workspace root.
/// Owned by whoever called `build_tree`; must be released with
/// `remove_all` before the enclosing request completes.
#[derive(Debug, Clone)]
pub struct DirectoryTree {
    root: PathBuf,
}

impl DirectoryTree {
    fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn list(&self) -> Result<Vec<PathBuf>, WorkspaceError> {
        let mut out = Vec::new();
        if self.root.exists() {
            for entry in walk(&self.root)? {
                out.push(entry);
            }
        }
        Ok(out)
    }

    /// Releases this tree. The caller is contractually obliged to invoke
    /// this before the unit of work that opened it completes; the core
    /// never double-releases a tree.
    pub fn remove_all(self) -> Result<(), WorkspaceError> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}

fn walk(dir: &Path) -> Result<Vec<PathBuf>, WorkspaceError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            out.extend(walk(&path)?);
        } else {
            out.push(path);
        }
    }
    Ok(out)
}

/// Decodes, unpacks, and hands out a scoped on-disk tree of driver scripts
/// for one request; destroys it on request.
pub struct DriverFilesWorkspace {
    root: PathBuf,
}

impl DriverFilesWorkspace {
    /// Ensures the configured workspace root exists. Tolerates a concurrent
    /// creation race: `create_dir_all` already treats "already exists" as
    /// success, so no extra check-then-create dance is needed here.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// `build_tree(tree_name, base64_zip) -> DirectoryTree`. Never
    /// partially succeeds: on failure the extraction directory is either
    /// absent or empty.
    pub fn build_tree(
        &self,
        tree_name: &str,
        base64_zip: &str,
    ) -> Result<DirectoryTree, WorkspaceError> {
        let package_path = self.root.join(format!("{tree_name}.zip"));
        let extract_path = self.root.join(tree_name);

        clear_existing(&package_path, &extract_path)?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(base64_zip)
            .map_err(|e| WorkspaceError::InvalidDriverFiles(format!("invalid base64: {e}")))?;
        std::fs::write(&package_path, &bytes)?;

        let result = extract(&bytes, &extract_path);
        // Clean up the zip payload regardless of outcome, and leave no
        // partial extraction directory behind on failure.
        let _ = std::fs::remove_file(&package_path);
        if result.is_err() && extract_path.exists() {
            let _ = std::fs::remove_dir_all(&extract_path);
        }
        result?;

        info!(tree_name, "driver files extracted");
        Ok(DirectoryTree::new(extract_path))
    }
}

fn clear_existing(package_path: &Path, extract_path: &Path) -> Result<(), WorkspaceError> {
    if package_path.exists() {
        std::fs::remove_file(package_path)?;
    }
    if extract_path.exists() {
        std::fs::remove_dir_all(extract_path)?;
    }
    Ok(())
}

fn extract(bytes: &[u8], extract_path: &Path) -> Result<(), WorkspaceError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| WorkspaceError::InvalidDriverFiles(format!("not a valid zip: {e}")))?;

    std::fs::create_dir_all(extract_path)?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| WorkspaceError::InvalidDriverFiles(format!("corrupt zip entry: {e}")))?;

        // `enclosed_name` refuses absolute paths and `..` components; an
        // entry that fails this check is a path-traversal attempt and
        // fails the whole extraction rather than being silently skipped.
        let relative = entry.enclosed_name().ok_or_else(|| {
            warn!(name = entry.name(), "rejecting zip entry that escapes extraction root");
            WorkspaceError::InvalidDriverFiles(format!(
                "entry '{}' escapes the extraction root",
                entry.name()
            ))
        })?;
        let out_path = extract_path.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out_file = std::fs::File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out_file)?;
    }

    Ok(())
}
