//! # edgequake-pdf2tex
//!
//! Turn PDF documents into LaTeX with Vision Language Models (VLMs), and keep
//! the local model-hub cache under control.
//!
//! ## Flows
//!
//! ```text
//! PDF ── rasterize ──▶ images/1.png, 2.png, … ── transcribe ──▶ output.txt
//!
//! ~/.cache/huggingface/hub ── purge_all / purge_model ──▶ PurgeReport
//! ```
//!
//! 1. **Rasterise** — [`rasterize_to_dir`] renders every page through pdfium
//!    and saves it as `<page>.png`. All-or-nothing: a render failure writes
//!    no files.
//! 2. **Transcribe** — [`transcribe_dir`] sends each page image, in numeric
//!    page order, to a vision model with a LaTeX instruction and joins the
//!    replies with blank lines.
//! 3. **Cache** — [`cache::purge_all`] and [`cache::purge_model`] delete
//!    downloaded model weights, best-effort.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2tex::{rasterize_to_dir, transcribe_to_file, PdfiumRasterizer,
//!     RasterConfig, TranscriptionConfig};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     rasterize_to_dir(
//!         Path::new("paper.pdf"),
//!         Path::new("images"),
//!         &RasterConfig::default(),
//!         Arc::new(PdfiumRasterizer),
//!     )
//!     .await?;
//!
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let stats = transcribe_to_file("images", "output.txt", &TranscriptionConfig::default()).await?;
//!     eprintln!("{} pages transcribed", stats.processed_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2tex` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cache;
pub mod config;
pub mod error;
pub mod hub;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod transcribe;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cache::{
    purge_all, purge_model, resolve_cache_root, MatchMode, ModelId, PurgeOptions, PurgeReport,
};
pub use config::{ErrorPolicy, RasterConfig, RasterConfigBuilder, TranscriptionConfig, TranscriptionConfigBuilder};
pub use error::{PageError, Pdf2TexError};
pub use output::{PageResult, TranscriptionOutput, TranscriptionStats};
pub use pipeline::llm::{LlmVisionModel, ModelReply, PageRequest, VisionModel};
pub use pipeline::pages::PageImage;
pub use pipeline::render::{rasterize_to_dir, PageRasterizer, PdfiumRasterizer};
pub use progress::{NoopProgressCallback, ProgressCallback, TranscriptionProgressCallback};
pub use transcribe::{transcribe_dir, transcribe_dir_with, transcribe_to_file};
