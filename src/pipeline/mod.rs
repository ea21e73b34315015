//! Pipeline stages for PDF-to-LaTeX transcription.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the rasterisation backend or the model can be swapped without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ images/N.png ──▶ pages ──▶ encode ──▶ llm ──▶ postprocess
//! (PDF)     (pdfium)                    (order)   (base64)   (VLM)   (cleanup)
//! ```
//!
//! 1. [`input`]  — validate the user-supplied PDF path
//! 2. [`render`] — rasterise every page and save `1.png`, `2.png`, …
//! 3. [`pages`]  — discover page images and order them numerically
//! 4. [`encode`] — base64-wrap each image for the multimodal request body
//! 5. [`llm`]    — drive the vision-model call; the only stage with network I/O
//! 6. [`postprocess`] — strip fences and stray characters from the reply

pub mod encode;
pub mod input;
pub mod llm;
pub mod pages;
pub mod postprocess;
pub mod render;
