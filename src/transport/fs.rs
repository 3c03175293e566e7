use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::PipelineError;

/// Filesystem transport that enumerates the extract files of one dataset.
///
/// Finance extracts arrive as a directory of delimited files per dataset (one
/// file per export batch); the loader concatenates them into a single table.
/// Enumeration order is made deterministic by sorting on the full path.
pub struct FileStream {
    root: PathBuf,
    follow_links: bool,
    extension: Option<String>,
}

impl FileStream {
    /// Create a stream rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_links: false,
            extension: None,
        }
    }

    /// Configure symlink traversal.
    pub fn with_follow_symlinks(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Only yield files with the given extension (e.g. `csv`).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Root directory this stream scans.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All regular files under the root, in stable sorted order.
    pub fn files(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let mut walker = WalkDir::new(&self.root);
        if self.follow_links {
            walker = walker.follow_links(true);
        }
        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|err| {
                PipelineError::Configuration(format!(
                    "cannot scan extract root '{}': {err}",
                    self.root.display()
                ))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(extension) = &self.extension {
                let matches = entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case(extension))
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
            }
            files.push(entry.path().to_path_buf());
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn files_are_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.csv"), "x").unwrap();
        fs::write(dir.path().join("a.CSV"), "x").unwrap();
        fs::write(dir.path().join("sub/c.csv"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = FileStream::new(dir.path())
            .with_extension("csv")
            .files()
            .unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, vec!["a.CSV", "b.csv", "sub/c.csv"]);
    }
}
