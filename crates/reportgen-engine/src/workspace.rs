//! Per-request working directory and copied-in assets.
//!
//! Every request gets `<output_dir>/<slug>-XXXXXX/`. The directory is removed
//! if the request fails before [`ReportWorkspace::keep`] is called. Uploaded
//! assets live in the same directory so the compiler can find them by bare
//! file name, and are deleted by [`AssetGuard`] when the request ends.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, warn};

use crate::error::{AssetError, ReportError};

static NOT_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("slug filter pattern is valid"));
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-\s]+").expect("slug separator pattern is valid"));

/// File-system friendly form of a title, `"report"` when nothing is left.
pub fn slugify(title: &str) -> String {
    let kept = NOT_SLUG.replace_all(title, "");
    let slug = SEPARATORS.replace_all(kept.trim(), "-").to_lowercase();
    if slug.is_empty() {
        "report".to_string()
    } else {
        slug
    }
}

/// Keep `[A-Za-z0-9._-]` of a file name.
///
/// A stem with nothing left is replaced by `fallback_stem`; the sanitised
/// extension is kept either way.
pub fn sanitize_file_name(path: &Path, fallback_stem: &str) -> String {
    let keep = |s: Option<&std::ffi::OsStr>| -> String {
        s.map(|s| {
            s.to_string_lossy()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
                .collect()
        })
        .unwrap_or_default()
    };

    let mut stem = keep(path.file_stem());
    if stem.chars().all(|c| c == '.') {
        stem = fallback_stem.to_string();
    }
    match keep(path.extension()) {
        ext if ext.is_empty() => stem,
        ext => format!("{stem}.{ext}"),
    }
}

fn workspace_error(path: &Path, reason: impl ToString) -> ReportError {
    ReportError::Workspace {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Isolated directory for one report.
#[derive(Debug)]
pub struct ReportWorkspace {
    dir: TempDir,
    slug: String,
}

impl ReportWorkspace {
    /// Create `<output_dir>/<slug>-XXXXXX/`, creating `output_dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Workspace` when either directory cannot be created.
    pub fn create(output_dir: &Path, title: &str) -> Result<Self, ReportError> {
        fs::create_dir_all(output_dir).map_err(|e| workspace_error(output_dir, e))?;

        let slug = slugify(title);
        let dir = tempfile::Builder::new()
            .prefix(&format!("{slug}-"))
            .tempdir_in(output_dir)
            .map_err(|e| workspace_error(output_dir, e))?;

        debug!(path = %dir.path().display(), "Created report workspace");
        Ok(Self { dir, slug })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn tex_path(&self) -> PathBuf {
        self.path().join(format!("{}_report.tex", self.slug))
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.path().join(format!("{}_report.pdf", self.slug))
    }

    /// Write the document through a temporary file and rename it into place.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Workspace` when the file cannot be written.
    pub fn write_document(&self, latex: &str) -> Result<PathBuf, ReportError> {
        let target = self.tex_path();
        let mut temp = NamedTempFile::new_in(self.path()).map_err(|e| workspace_error(&target, e))?;
        temp.write_all(latex.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| workspace_error(&target, e))?;
        temp.persist(&target)
            .map_err(|e| workspace_error(&target, e.error))?;
        Ok(target)
    }

    /// Stop the directory from being removed on drop.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

/// Copies of user assets, deleted when the guard is dropped.
#[derive(Debug, Default)]
pub struct AssetGuard {
    files: Vec<PathBuf>,
}

impl AssetGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `source` into `dir` and return the bare file name of the copy.
    ///
    /// A name already taken by an earlier asset is prefixed with
    /// `<fallback_stem>_`.
    ///
    /// # Errors
    ///
    /// `AssetError::NotFound` if `source` is not a file, `AssetError::CopyFailed`
    /// if it cannot be copied.
    pub fn copy_in(
        &mut self,
        source: &Path,
        dir: &Path,
        fallback_stem: &str,
    ) -> Result<String, AssetError> {
        if !source.is_file() {
            return Err(AssetError::NotFound {
                path: source.display().to_string(),
            });
        }

        let mut name = sanitize_file_name(source, fallback_stem);
        if self.files.iter().any(|f| f.file_name() == Some(std::ffi::OsStr::new(&name))) {
            name = format!("{fallback_stem}_{name}");
        }

        let target = dir.join(&name);
        fs::copy(source, &target).map_err(|e| AssetError::CopyFailed {
            path: source.display().to_string(),
            reason: e.to_string(),
        })?;

        debug!(source = %source.display(), name = %name, "Copied asset");
        self.files.push(target);
        Ok(name)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl Drop for AssetGuard {
    fn drop(&mut self) {
        for file in self.files.drain(..) {
            if let Err(e) = fs::remove_file(&file) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %file.display(), error = %e, "Could not remove asset copy");
                }
            }
        }
    }
}
