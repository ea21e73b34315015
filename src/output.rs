//! Result types produced by the transcription loop.

use crate::error::{PageError, Pdf2TexError};
use serde::{Deserialize, Serialize};

/// Outcome of transcribing one page image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number taken from the image filename.
    pub page_num: usize,
    /// LaTeX produced by the model; empty when `error` is set.
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub retries: u8,
    pub error: Option<PageError>,
}

impl PageResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate numbers for one transcription run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptionStats {
    /// Page images found in the input directory.
    pub total_pages: usize,
    pub processed_pages: usize,
    pub failed_pages: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// Everything a transcription run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionOutput {
    /// Concatenated document, ready to be written to disk.
    pub text: String,
    /// Per-page results in page order.
    pub pages: Vec<PageResult>,
    pub stats: TranscriptionStats,
}

impl TranscriptionOutput {
    /// Turn any page failure into an error.
    pub fn into_result(self) -> Result<Self, Pdf2TexError> {
        match self.pages.iter().find_map(|p| p.error.clone()) {
            Some(e) => Err(Pdf2TexError::PageFailed(e)),
            None => Ok(self),
        }
    }
}
