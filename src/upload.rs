//! Temporary storage for uploaded CSV files
//!
//! An upload is written to `<dir>/upload_<unix_millis>_<seq>_<name>` and
//! removed again when the [`TempUpload`] guard is dropped.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// An uploaded file persisted to disk for the lifetime of the guard
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    /// Write `bytes` to a new uniquely named file in `dir`
    pub fn create(dir: &Path, original_name: &str, bytes: &[u8]) -> std::io::Result<Self> {
        let filename = format!(
            "upload_{}_{}_{}",
            chrono::Utc::now().timestamp_millis(),
            UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed),
            sanitize_filename(original_name)
        );
        let path = dir.join(filename);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        // From here on the guard owns the file, so a failed write still cleans up
        let upload = Self { path };
        file.write_all(bytes)?;
        file.sync_all()?;

        log::debug!(
            "Saved upload {} ({} bytes) to {}",
            original_name,
            bytes.len(),
            upload.path.display()
        );
        Ok(upload)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed temporary upload {}", self.path.display()),
            Err(e) => log::warn!(
                "Failed to remove temporary upload {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Reduce a client-supplied filename to a safe single path component
///
/// Drops any directory part, turns whitespace into `_`, keeps only ASCII
/// letters, digits, `.`, `_` and `-`, and strips leading dots/underscores.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => Some(c),
            _ => None,
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload.csv".to_string()
    } else {
        trimmed.to_string()
    }
}

/// True if `filename` has one of the given extensions (case-insensitive)
pub fn has_allowed_extension(filename: &str, allowed: &[&str]) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)),
        None => false,
    }
}
