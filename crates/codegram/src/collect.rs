//! Gathering source files from a local directory for submission.

use crate::error::{Result, ValidationError};
use codegram_core::config::FileConfig;
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Summary of a collection, as shown next to the selected directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryInfo {
    /// Name of the selected root directory.
    pub path: String,
    pub file_count: usize,
    /// Unique lower-case extensions with the leading dot, sorted.
    pub extensions: Vec<String>,
}

/// Supported source files under one directory, keyed by `/`-separated relative path.
#[derive(Debug, Clone, Default)]
pub struct FileCollection {
    root_name: String,
    files: BTreeMap<String, String>,
    total_files: usize,
}

impl FileCollection {
    /// Walks `root`, keeping readable UTF-8 files with a supported extension.
    ///
    /// Fails when no supported file exists, when there are more than
    /// `config.max_total_files` of them, or when none could be read. Oversized and
    /// unreadable files are skipped with a warning.
    pub fn from_dir(root: &Path, config: &FileConfig) -> Result<Self> {
        if !root.is_dir() {
            return Err(ValidationError::NotADirectory {
                path: root.display().to_string(),
            }
            .into());
        }

        let (candidates, total_files) = walk_supported(root, config);
        tracing::debug!(
            supported = candidates.len(),
            total = total_files,
            "scanned {}",
            root.display()
        );

        if candidates.is_empty() {
            return Err(ValidationError::NoSupportedFiles.into());
        }
        if candidates.len() > config.max_total_files {
            return Err(ValidationError::TooManyFiles {
                found: candidates.len(),
                max: config.max_total_files,
            }
            .into());
        }

        let mut files = BTreeMap::new();
        for path in candidates {
            let size = match std::fs::metadata(&path) {
                Ok(meta) => meta.len(),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable file");
                    continue;
                }
            };
            if size > config.max_file_size {
                tracing::warn!(path = %path.display(), size, "skipping file larger than the size limit");
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    files.insert(relative_path(root, &path), content);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable file");
                }
            }
        }

        if files.is_empty() {
            return Err(ValidationError::NoReadableFiles.into());
        }

        let root_name = root
            .canonicalize()
            .ok()
            .as_deref()
            .unwrap_or(root)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            root_name,
            files,
            total_files,
        })
    }

    /// Relative path to content, ready for the `code_files` request field.
    pub fn selected_files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    pub fn into_files(self) -> BTreeMap<String, String> {
        self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Every regular file seen during the walk, supported or not.
    pub fn total_files(&self) -> usize {
        self.total_files
    }

    pub fn directory_info(&self) -> DirectoryInfo {
        let extensions: BTreeSet<String> = self
            .files
            .keys()
            .filter_map(|path| path.rsplit_once('.'))
            .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
            .collect();
        DirectoryInfo {
            path: self.root_name.clone(),
            file_count: self.files.len(),
            extensions: extensions.into_iter().collect(),
        }
    }
}

/// Supported file paths in walk order, plus the count of all regular files seen.
fn walk_supported(root: &Path, config: &FileConfig) -> (Vec<PathBuf>, usize) {
    let skip = config.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            let name = entry.file_name().to_string_lossy();
            !(is_dir && entry.depth() > 0 && skip.should_skip_dir(&name))
        })
        .build();

    let mut supported = Vec::new();
    let mut total = 0usize;
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "error while walking directory");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        total += 1;
        let name = entry.file_name().to_string_lossy();
        if config.is_supported(&name) {
            supported.push(entry.into_path());
        } else {
            tracing::trace!(file = %name, "skipping unsupported file");
        }
    }
    (supported, total)
}

fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
