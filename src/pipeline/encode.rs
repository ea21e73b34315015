//! Image encoding: page image file → base64 `ImageData`.
//!
//! The bytes are sent as-is (PNG stays PNG, JPEG stays JPEG); re-encoding a
//! JPEG to PNG would only inflate the request. The MIME type comes from the
//! bytes, not the file extension, so a JPEG saved as `1.png` is still
//! declared `image/jpeg`. `detail: "high"` asks GPT-4-class models for the
//! full tile budget so small formula glyphs survive.

use crate::pipeline::pages::PageImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::ImageFormat;
use tracing::debug;

/// Read and base64-encode a page image for the vision API.
///
/// Fails when the file cannot be read or its contents are not a recognisable
/// image format.
pub fn encode_page_file(page: &PageImage) -> Result<ImageData, String> {
    let bytes = std::fs::read(&page.path).map_err(|e| e.to_string())?;
    encode_page_bytes(&bytes)
}

/// Encode raw image bytes, declaring the MIME type of the detected format.
pub fn encode_page_bytes(bytes: &[u8]) -> Result<ImageData, String> {
    let format = image::guess_format(bytes).map_err(|e| format!("not an image: {e}"))?;
    let mime_type = match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP => {
            format.to_mime_type()
        }
        other => return Err(format!("unsupported image format: {other:?}")),
    };

    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime_type, b64.len());

    Ok(ImageData::new(b64, mime_type).with_detail("high"))
}
