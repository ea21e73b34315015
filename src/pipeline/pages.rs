//! Page-image discovery: find `1.png`, `2.jpg`, … and order them by page.
//!
//! Ordering is numeric on the filename stem. A lexical sort would put
//! `10.png` before `2.png` and scramble every document past page nine.

use crate::error::Pdf2TexError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions accepted as page images (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One numbered page image on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageImage {
    /// 1-indexed page number parsed from the filename stem.
    pub page_num: usize,
    pub path: PathBuf,
}

/// File name for a page written by the rasteriser.
pub fn page_file_name(page_num: usize) -> String {
    format!("{}.png", page_num)
}

/// List the page images in `dir`, sorted by page number.
///
/// Files without a supported extension are ignored silently. Files with a
/// supported extension but a non-numeric stem are skipped with a warning.
pub fn discover_pages(dir: &Path) -> Result<Vec<PageImage>, Pdf2TexError> {
    if !dir.is_dir() {
        return Err(Pdf2TexError::ImagesDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| Pdf2TexError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Pdf2TexError::ReadFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        // Symlinked page images count; `DirEntry::file_type` would not follow them.
        let path = entry.path();
        if path.is_file() {
            paths.push(path);
        }
    }

    let pages = order_pages(paths);
    debug!("Found {} page images in {}", pages.len(), dir.display());
    Ok(pages)
}

/// Keep supported images with a numeric stem and sort them numerically.
pub fn order_pages(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PageImage> {
    let mut pages: Vec<PageImage> = paths
        .into_iter()
        .filter(|p| {
            extension_lower(p)
                .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false)
        })
        .filter_map(|path| {
            let stem = path.file_stem()?.to_string_lossy().to_string();
            match stem.parse::<usize>() {
                Ok(page_num) => Some(PageImage { page_num, path }),
                Err(_) => {
                    warn!("Skipping {}: filename is not a page number", path.display());
                    None
                }
            }
        })
        .collect();

    // Tie-break on path so `3.png` and `3.jpg` order deterministically.
    pages.sort_by(|a, b| a.page_num.cmp(&b.page_num).then_with(|| a.path.cmp(&b.path)));
    pages
}

fn extension_lower(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase())
}
