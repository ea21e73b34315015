//! Error types for the edgequake-pdf2tex library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2TexError`] — **Fatal**: the operation cannot proceed at all
//!   (missing PDF, corrupt document, provider not configured). Returned as
//!   `Err(Pdf2TexError)` from the top-level entry points.
//!
//! * [`PageError`] — **Non-fatal**: a single page image failed to transcribe
//!   but the others are fine. Stored inside [`crate::output::PageResult`] so
//!   callers can inspect partial success.
//!
//! Cache purges have neither: per-entry deletion failures are recorded in
//! [`crate::cache::PurgeReport`] and never abort the sweep.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2tex library.
#[derive(Debug, Error)]
pub enum Pdf2TexError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input PDF was not found at the given path.
    #[error("Error: File '{path}' does not exist.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The page-image directory does not exist.
    #[error("Image directory not found: '{path}'\nRun `pdf2tex rasterize` first.")]
    ImagesDirNotFound { path: PathBuf },

    /// The page-image directory exists but holds no numbered images.
    #[error("No numbered page images (1.png, 2.png, …) found in '{path}'")]
    NoPageImages { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Error during conversion of page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A page failed and the error policy is [`crate::config::ErrorPolicy::Abort`].
    #[error("Transcription aborted: {0}")]
    PageFailed(#[source] PageError),

    /// Every page failed; output would be empty.
    #[error("All {total} pages failed.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── Hub errors ────────────────────────────────────────────────────────
    /// The hub API request failed or returned a non-success status.
    #[error("Hub request to '{url}' failed: {reason}")]
    HubRequestFailed { url: String, reason: String },

    /// The hub API answered with a body that is not the expected JSON.
    #[error("Unexpected hub response: {0}")]
    HubResponseInvalid(#[from] serde_json::Error),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read an input file or directory.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page image.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The image file could not be read or encoded.
    #[error("Page {page}: could not load image: {detail}")]
    ImageLoadFailed { page: usize, detail: String },

    /// The model call failed after retries.
    #[error("Page {page}: model call failed after {retries} retries: {detail}")]
    LlmFailed {
        page: usize,
        retries: u8,
        detail: String,
    },

    /// The model call timed out.
    #[error("Page {page}: model call timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

impl PageError {
    /// The 1-indexed page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::ImageLoadFailed { page, .. }
            | PageError::LlmFailed { page, .. }
            | PageError::Timeout { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_display() {
        let e = Pdf2TexError::FileNotFound {
            path: PathBuf::from("paper.pdf"),
        };
        assert_eq!(e.to_string(), "Error: File 'paper.pdf' does not exist.");
    }

    #[test]
    fn page_failed_wraps_page_error() {
        let e = Pdf2TexError::PageFailed(PageError::Timeout { page: 4, secs: 30 });
        let msg = e.to_string();
        assert!(msg.contains("aborted"), "got: {msg}");
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn page_error_reports_its_page() {
        let e = PageError::LlmFailed {
            page: 7,
            retries: 2,
            detail: "503".into(),
        };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().contains("2 retries"));
    }

    #[test]
    fn all_pages_failed_display() {
        let e = Pdf2TexError::AllPagesFailed {
            total: 3,
            first_error: "boom".into(),
        };
        assert!(e.to_string().contains("All 3 pages"));
        assert!(e.to_string().contains("boom"));
    }
}
