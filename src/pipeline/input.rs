//! Input validation for the rasterisation step.
//!
//! We check the file exists, is readable and starts with the `%PDF` magic
//! bytes before handing it to pdfium, so callers get a meaningful error
//! rather than a pdfium parse failure.

use crate::error::Pdf2TexError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a local PDF path and return it as an owned `PathBuf`.
pub fn resolve_pdf(path: &Path) -> Result<PathBuf, Pdf2TexError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(Pdf2TexError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(Pdf2TexError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2TexError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2TexError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}
