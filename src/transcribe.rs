//! Transcription entry points: a directory of page images in, one LaTeX
//! document out.
//!
//! Pages are sent one at a time in numeric page order. What a failed page
//! means is decided by [`ErrorPolicy`]: skip it and keep going, or abort the
//! whole run before anything is written.

use crate::config::{page_marker, ErrorPolicy, TranscriptionConfig};
use crate::error::Pdf2TexError;
use crate::output::{PageResult, TranscriptionOutput, TranscriptionStats};
use crate::pipeline::llm::{self, LlmVisionModel, VisionModel};
use crate::pipeline::pages::discover_pages;
use crate::pipeline::postprocess;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Transcribe every numbered page image in `images_dir`.
///
/// The provider is resolved from `config` (see [`resolve_provider`]).
///
/// # Errors
/// - the directory is missing or holds no page images
/// - no provider can be configured
/// - a page failed under [`ErrorPolicy::Abort`]
/// - every page failed
pub async fn transcribe_dir(
    images_dir: impl AsRef<Path>,
    config: &TranscriptionConfig,
) -> Result<TranscriptionOutput, Pdf2TexError> {
    let provider = resolve_provider(config)?;
    let model = LlmVisionModel::new(provider, config);
    transcribe_dir_with(images_dir, &model, config).await
}

/// Same as [`transcribe_dir`] with an explicit [`VisionModel`].
pub async fn transcribe_dir_with(
    images_dir: impl AsRef<Path>,
    model: &dyn VisionModel,
    config: &TranscriptionConfig,
) -> Result<TranscriptionOutput, Pdf2TexError> {
    let total_start = Instant::now();
    let images_dir = images_dir.as_ref();
    info!("Starting transcription: {}", images_dir.display());

    let page_images = discover_pages(images_dir)?;
    if page_images.is_empty() {
        return Err(Pdf2TexError::NoPageImages {
            path: images_dir.to_path_buf(),
        });
    }
    let total = page_images.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_transcription_start(total);
    }

    let mut pages: Vec<PageResult> = Vec::with_capacity(total);
    for page in &page_images {
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page.page_num, total);
        }

        let mut result = llm::transcribe_page(model, page, config).await;

        match result.error {
            None => {
                if config.clean_output {
                    result.text = postprocess::clean_latex(&result.text);
                }
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_complete(page.page_num, total, result.text.len());
                }
            }
            Some(ref e) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_error(page.page_num, total, &e.to_string());
                }
                match config.error_policy {
                    ErrorPolicy::Abort => {
                        warn!("Aborting at page {}: {}", page.page_num, e);
                        return Err(Pdf2TexError::PageFailed(e.clone()));
                    }
                    ErrorPolicy::Skip => warn!("Skipping page {}: {}", page.page_num, e),
                }
            }
        }

        pages.push(result);
    }

    let processed = pages.iter().filter(|p| p.is_ok()).count();
    let failed = total - processed;

    if processed == 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Pdf2TexError::AllPagesFailed { total, first_error });
    }

    let text = assemble_document(&pages, config);
    let stats = TranscriptionStats {
        total_pages: total,
        processed_pages: processed,
        failed_pages: failed,
        total_input_tokens: pages.iter().map(|p| p.input_tokens as u64).sum(),
        total_output_tokens: pages.iter().map(|p| p.output_tokens as u64).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Transcription complete: {}/{} pages, {}ms total",
        processed, total, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_transcription_complete(total, processed);
    }

    Ok(TranscriptionOutput { text, pages, stats })
}

/// Transcribe `images_dir` and write the document to `output_path`.
pub async fn transcribe_to_file(
    images_dir: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &TranscriptionConfig,
) -> Result<TranscriptionStats, Pdf2TexError> {
    let output = transcribe_dir(images_dir, config).await?;
    write_output(output_path.as_ref(), &output.text)?;
    Ok(output.stats)
}

/// Write `text` to `path` atomically: a temp file in the same directory is
/// renamed over the target, so readers never see a half-written file.
pub fn write_output(path: &Path, text: &str) -> Result<(), Pdf2TexError> {
    let write_err = |e: std::io::Error| Pdf2TexError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(text.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Concatenate successful pages in page order. Every transcription is
/// followed by a blank line; with page markers enabled each one is preceded
/// by `--- Output from page N ---`.
pub fn assemble_document(pages: &[PageResult], config: &TranscriptionConfig) -> String {
    let mut out = String::new();
    for page in pages.iter().filter(|p| p.is_ok()) {
        if config.page_markers {
            out.push_str(&page_marker(page.page_num));
            out.push('\n');
        }
        out.push_str(&page.text);
        out.push_str("\n\n");
    }
    out
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Pdf2TexError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2TexError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the provider, from most-specific to least-specific:
///
/// 1. pre-built `config.provider`
/// 2. `config.provider_name` + `config.model` (default [`DEFAULT_MODEL`])
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set
/// 4. `OPENAI_API_KEY` present → OpenAI
/// 5. `ProviderFactory::from_env()` auto-detection
pub fn resolve_provider(config: &TranscriptionConfig) -> Result<Arc<dyn LLMProvider>, Pdf2TexError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2TexError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
