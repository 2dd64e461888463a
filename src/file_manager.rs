use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{MirrorError, Result};

/// Write-only access to the output directory.
#[derive(Clone, Debug)]
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    /// Create `base_dir` if needed and anchor it to an absolute path.
    pub fn new(base_dir: &Path) -> Result<Self> {
        fs::create_dir_all(base_dir).map_err(|e| MirrorError::filesystem(base_dir, e))?;
        let base_dir =
            fs::canonicalize(base_dir).map_err(|e| MirrorError::filesystem(base_dir, e))?;

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create `dir` (relative to the base directory) unless it already exists.
    pub fn mkdir_if_absent(&self, dir: &str) -> Result<PathBuf> {
        let path = self.base_dir.join(dir);
        fs::create_dir_all(&path).map_err(|e| MirrorError::filesystem(&path, e))?;
        Ok(path)
    }

    pub fn write_text(&self, path: &Path, content: &str) -> Result<PathBuf> {
        self.write_bytes(path, content.as_bytes())
    }

    /// Write `content` to `path`, relative to the base directory unless
    /// absolute. Returns the absolute path written.
    pub fn write_bytes(&self, path: &Path, content: &[u8]) -> Result<PathBuf> {
        let file_path = self.base_dir.join(path);

        let mut file =
            fs::File::create(&file_path).map_err(|e| MirrorError::filesystem(&file_path, e))?;
        file.write_all(content)
            .map_err(|e| MirrorError::filesystem(&file_path, e))?;

        tracing::debug!(path = %file_path.display(), bytes = content.len(), "file written");
        Ok(file_path)
    }
}
