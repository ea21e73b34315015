//! PDF rasterisation: render every page and save it as `<n>.png`.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking pool.
//!
//! ## All-or-nothing
//!
//! Every page is rendered into memory before the output directory is touched.
//! A failure on page 7 therefore leaves no `1.png`…`6.png` behind for the
//! transcription step to pick up as if they were the whole document.

use crate::config::RasterConfig;
use crate::error::Pdf2TexError;
use crate::pipeline::input::resolve_pdf;
use crate::pipeline::pages::{page_file_name, PageImage};
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable pointing at an existing pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Turns a PDF into one image per page, in page order.
///
/// Implementations are called from a blocking thread.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf_path: &Path, config: &RasterConfig)
        -> Result<Vec<DynamicImage>, Pdf2TexError>;
}

/// [`PageRasterizer`] backed by pdfium.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumRasterizer;

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        pdf_path: &Path,
        config: &RasterConfig,
    ) -> Result<Vec<DynamicImage>, Pdf2TexError> {
        let pdfium = bind_pdfium()?;
        render_all_pages(&pdfium, pdf_path, config)
    }
}

/// Validate `pdf_path`, render every page, and save them into `out_dir` as
/// `1.png`, `2.png`, ….
///
/// Nothing is written unless every page rendered. `out_dir` is created if
/// absent; existing files with other names are left alone.
pub async fn rasterize_to_dir(
    pdf_path: &Path,
    out_dir: &Path,
    config: &RasterConfig,
    rasterizer: Arc<dyn PageRasterizer>,
) -> Result<Vec<PageImage>, Pdf2TexError> {
    let path = resolve_pdf(pdf_path)?;
    let cfg = config.clone();

    let images = tokio::task::spawn_blocking(move || rasterizer.rasterize(&path, &cfg))
        .await
        .map_err(|e| Pdf2TexError::Internal(format!("Render task panicked: {}", e)))??;
    info!("Rendered {} pages from {}", images.len(), pdf_path.display());

    let out = out_dir.to_path_buf();
    tokio::task::spawn_blocking(move || write_page_images(images, &out))
        .await
        .map_err(|e| Pdf2TexError::Internal(format!("Write task panicked: {}", e)))?
}

/// Save rendered pages as PNG files named by their 1-based index.
pub fn write_page_images(
    images: Vec<DynamicImage>,
    out_dir: &Path,
) -> Result<Vec<PageImage>, Pdf2TexError> {
    std::fs::create_dir_all(out_dir).map_err(|e| Pdf2TexError::OutputWriteFailed {
        path: out_dir.to_path_buf(),
        source: e,
    })?;

    let mut written = Vec::with_capacity(images.len());
    for (idx, image) in images.into_iter().enumerate() {
        let page_num = idx + 1;
        let path: PathBuf = out_dir.join(page_file_name(page_num));
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| Pdf2TexError::OutputWriteFailed {
                path: path.clone(),
                source: std::io::Error::other(e),
            })?;
        debug!("Saved page {} as {}", page_num, path.display());
        written.push(PageImage { page_num, path });
    }

    Ok(written)
}

/// Bind pdfium from `PDFIUM_LIB_PATH`, the working directory, or the system.
fn bind_pdfium() -> Result<Pdfium, Pdf2TexError> {
    let bindings = match std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        Some(path) => Pdfium::bind_to_library(PathBuf::from(path)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2TexError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn render_all_pages(
    pdfium: &Pdfium,
    pdf_path: &Path,
    config: &RasterConfig,
) -> Result<Vec<DynamicImage>, Pdf2TexError> {
    let password = config.password.as_deref();
    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2TexError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Pdf2TexError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Pdf2TexError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let scale = config.dpi as f32 / 72.0;
    let max_px = config.max_rendered_pixels as i32;
    let mut results = Vec::with_capacity(total_pages);

    for idx in 0..total_pages {
        let page = pages
            .get(idx as u16)
            .map_err(|e| Pdf2TexError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let width = ((page.width().value * scale) as i32).clamp(1, max_px);
        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_maximum_height(max_px);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Pdf2TexError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        results.push(image);
    }

    Ok(results)
}
