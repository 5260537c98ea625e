//! Filesystem layout for uploaded documents, label snapshots, image
//! mappings, and generated reports (§6 Persistence layout).
//!
//! Grounded on `original_source/core/utils.py`'s `ensure_dir` helper:
//! every path-returning function here creates its parent directory if
//! missing before handing the path back to the caller.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root of the on-disk data directory. Configurable so tests can point
/// it at a temp directory.
#[derive(Debug, Clone)]
pub struct DataRoot(PathBuf);

impl DataRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self(root.into())
    }

    fn ensured(dir: PathBuf) -> Result<PathBuf> {
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// `data/pdfs/<document_id>_<original_filename>`
    pub fn pdf_path(&self, document_id: &str, original_filename: &str) -> Result<PathBuf> {
        let dir = Self::ensured(self.0.join("pdfs"))?;
        Ok(dir.join(format!("{document_id}_{original_filename}")))
    }

    /// `data/labels/` — directory for label snapshots, one file per task.
    pub fn labels_dir(&self) -> Result<PathBuf> {
        Self::ensured(self.0.join("labels"))
    }

    /// `data/mappings/` — directory for case->image maps, one file per task.
    pub fn mappings_dir(&self) -> Result<PathBuf> {
        Self::ensured(self.0.join("mappings"))
    }

    /// `data/report/` — directory for generated spreadsheets.
    pub fn report_dir(&self) -> Result<PathBuf> {
        Self::ensured(self.0.join("report"))
    }

    pub fn root(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_and_returns_pdf_path() {
        let tmp = tempdir().unwrap();
        let root = DataRoot::new(tmp.path());
        let path = root.pdf_path("DOC1", "requirements.pdf").unwrap();
        assert!(path.parent().unwrap().exists());
        assert_eq!(path.file_name().unwrap(), "DOC1_requirements.pdf");
    }
}
