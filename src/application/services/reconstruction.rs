//! Reconstruction I/O service
//!
//! Loads, saves and discovers SWC files through the `FileSystem` boundary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::application::error_ext::DomainResultExt;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{swc, Tree};
use crate::infrastructure::traits::FileSystem;
use crate::util::path::is_swc_file;

/// Service for reading and writing reconstructions.
pub struct ReconstructionService {
    fs: Arc<dyn FileSystem>,
}

impl ReconstructionService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Parse and validate one SWC file.
    pub fn load(&self, path: &Path) -> ApplicationResult<Tree> {
        debug!("load: {}", path.display());
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read reconstruction", path)?;
        swc::parse(&content).for_reconstruction(path)
    }

    /// Write `tree` as SWC, creating parent directories as needed.
    pub fn save(&self, path: &Path, tree: &Tree) -> ApplicationResult<()> {
        debug!("save: {} ({} nodes)", path.display(), tree.len());
        self.fs
            .ensure_parent(path)
            .with_path_context("create output directory", path)?;
        self.fs
            .write(path, &swc::to_swc(tree))
            .with_path_context("write reconstruction", path)
    }

    /// A single file, or every `.swc` file below a directory (sorted).
    ///
    /// The directory walk skips files this crate wrote (`<stem>_view<k>.swc`,
    /// `<stem>_perturbed.swc`), so a batch written next to its inputs is not
    /// augmented again on the next run.
    pub fn discover(&self, path: &Path) -> ApplicationResult<Vec<PathBuf>> {
        if self.fs.is_file(path) {
            return Ok(vec![path.to_path_buf()]);
        }
        if !self.fs.is_dir(path) {
            return Err(ApplicationError::OperationFailed {
                context: format!("input not found: {}", path.display()),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such file or directory",
                )),
            });
        }

        let generated = Regex::new(r"_(view\d+|perturbed)$").map_err(|e| {
            ApplicationError::OperationFailed {
                context: "compile generated-output pattern".to_string(),
                source: Box::new(e),
            }
        })?;

        let mut files = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| ApplicationError::OperationFailed {
                context: format!("scan {}", path.display()),
                source: Box::new(e),
            })?;
            if !entry.file_type().is_file() || !is_swc_file(entry.path()) {
                continue;
            }
            let is_generated = entry
                .path()
                .file_stem()
                .is_some_and(|stem| generated.is_match(&stem.to_string_lossy()));
            if is_generated {
                trace!("skip generated {}", entry.path().display());
                continue;
            }
            files.push(entry.into_path());
        }
        debug!("discover: {} files under {}", files.len(), path.display());

        if files.is_empty() {
            return Err(ApplicationError::NoInputs(path.to_path_buf()));
        }
        Ok(files)
    }
}
