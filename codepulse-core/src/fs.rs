//! Filesystem abstractions and repository snapshots used for analysis.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{CodePulseError, Result};

/// Directory names pruned during traversal in addition to dot-directories.
pub const EXCLUDED_DIRS: &[&str] = &["node_modules", "__pycache__", "venv", "env", "dist", "build"];

/// One directory visited during traversal, with its immediate children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirListing {
    /// Directory relative to the traversal root; empty for the root itself.
    pub dir: PathBuf,
    /// Names of subdirectories that survived pruning.
    pub subdirs: Vec<String>,
    /// Names of regular files in the directory.
    pub files: Vec<String>,
}

impl DirListing {
    /// Create an empty listing for a relative directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            subdirs: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Builder-style helper that appends file names.
    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    /// Lower-cased name of this directory; empty for the root.
    pub fn dir_name(&self) -> String {
        self.dir
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Root-relative path of a file in this directory, using forward slashes.
    pub fn relative_file(&self, name: &str) -> String {
        let dir = to_forward_slashes(&self.dir);
        if dir.is_empty() {
            name.to_string()
        } else {
            format!("{dir}/{name}")
        }
    }
}

/// Abstraction over filesystem access for testability.
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem {
    /// Traverse the tree under `root`, skipping anything that cannot be read.
    fn walk(&self, root: &Path) -> Vec<DirListing>;
    /// Read a file into a string.
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Size of a file in bytes.
    fn file_size(&self, path: &Path) -> Result<u64>;
}

/// Default filesystem implementation backed by `walkdir` and `std::fs`.
#[derive(Debug, Default, Clone)]
pub struct StdFileSystem;

impl StdFileSystem {
    /// Create a new standard filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for StdFileSystem {
    fn walk(&self, root: &Path) -> Vec<DirListing> {
        let mut listings: BTreeMap<PathBuf, DirListing> = BTreeMap::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_pruned(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = relative.to_path_buf();
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                listings
                    .entry(relative.clone())
                    .or_insert_with(|| DirListing::new(relative.clone()));
                if entry.depth() > 0 {
                    parent_listing(&mut listings, &relative).subdirs.push(name);
                }
            } else if file_type.is_file() {
                parent_listing(&mut listings, &relative).files.push(name);
            }
        }

        listings.into_values().collect()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn file_size(&self, path: &Path) -> Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }
}

fn parent_listing<'a>(
    listings: &'a mut BTreeMap<PathBuf, DirListing>,
    relative: &Path,
) -> &'a mut DirListing {
    let parent = relative.parent().map(Path::to_path_buf).unwrap_or_default();
    listings
        .entry(parent.clone())
        .or_insert_with(|| DirListing::new(parent))
}

fn is_pruned(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || EXCLUDED_DIRS.iter().any(|excluded| name == *excluded)
}

/// Render a relative path with forward slashes regardless of platform.
pub fn to_forward_slashes(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// A traversal of one repository checkout, captured once per analysis.
pub struct RepositorySnapshot<'a> {
    root: PathBuf,
    fs: &'a dyn FileSystem,
    listings: Vec<DirListing>,
}

impl<'a> RepositorySnapshot<'a> {
    /// Walk `root` through `fs` and keep the listing for the rest of the analysis.
    pub fn capture(fs: &'a dyn FileSystem, root: &Path) -> Self {
        let listings = fs.walk(root);
        debug!(
            "captured {} directories under {}",
            listings.len(),
            root.display()
        );
        Self {
            root: root.to_path_buf(),
            fs,
            listings,
        }
    }

    /// Root path of the checkout.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories in traversal order.
    pub fn walk(&self) -> &[DirListing] {
        &self.listings
    }

    /// Every root-relative file path in the snapshot.
    pub fn files(&self) -> impl Iterator<Item = String> + '_ {
        self.listings.iter().flat_map(|listing| {
            listing
                .files
                .iter()
                .map(move |name| listing.relative_file(name))
        })
    }

    /// Absolute path for a root-relative one.
    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Size in bytes of a root-relative file.
    pub fn file_size(&self, relative: &str) -> Result<u64> {
        self.fs.file_size(&self.absolute(relative))
    }

    /// Read a root-relative file, refusing anything larger than `max_bytes`.
    pub fn read_bounded(&self, relative: &str, max_bytes: u64) -> Result<String> {
        let path = self.absolute(relative);
        let size = self.fs.file_size(&path)?;
        if size > max_bytes {
            return Err(CodePulseError::Other(format!(
                "{relative} is {size} bytes, above the {max_bytes} byte limit"
            )));
        }
        self.fs.read_to_string(&path)
    }

    /// Whether a root-level entry with this exact name exists.
    pub fn has_root_file(&self, name: &str) -> bool {
        self.root_listing()
            .map(|listing| listing.files.iter().any(|file| file == name))
            .unwrap_or(false)
    }

    /// Whether a root-level directory with this exact name exists.
    pub fn has_root_dir(&self, name: &str) -> bool {
        self.root_listing()
            .map(|listing| listing.subdirs.iter().any(|dir| dir == name))
            .unwrap_or(false)
    }

    /// Listing of the root directory, if it could be read.
    pub fn root_listing(&self) -> Option<&DirListing> {
        self.listings
            .iter()
            .find(|listing| listing.dir.as_os_str().is_empty())
    }
}
