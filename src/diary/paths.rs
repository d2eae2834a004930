use std::path::{Path, PathBuf};

/// Resolved output locations for one run. Everything the pipeline persists
/// lives under `output_dir`; the audit log goes to its own subdirectory so
/// the year-file naming scan is never confused by it.
#[derive(Debug, Clone)]
pub struct DigestPaths {
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl DigestPaths {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            logs_dir: output_dir.join("logs"),
        }
    }
}
