//! Vision-model interaction: send one page image plus the instruction and
//! get LaTeX back.
//!
//! The loop talks to a [`VisionModel`] rather than to an `LLMProvider`
//! directly. [`LlmVisionModel`] adapts any `edgequake-llm` provider; tests
//! plug in scripted models without a network.
//!
//! ## Retry Strategy
//!
//! Retries are off by default (`max_retries = 0`). When enabled the delay is
//! `retry_backoff_ms * 2^attempt`: 500 ms → 1 s → 2 s.

use crate::config::TranscriptionConfig;
use crate::error::PageError;
use crate::output::PageResult;
use crate::pipeline::encode::encode_page_file;
use crate::pipeline::pages::PageImage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// One request: a page image and the words that go with it.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page_num: usize,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub image: ImageData,
}

/// The decoded answer for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Anything that can read a page image and answer with text.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Run a single request. The error string is surfaced in [`PageError`].
    async fn complete(&self, request: &PageRequest) -> Result<ModelReply, String>;
}

/// [`VisionModel`] backed by an `edgequake-llm` provider.
pub struct LlmVisionModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmVisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &TranscriptionConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }
}

#[async_trait]
impl VisionModel for LlmVisionModel {
    async fn complete(&self, request: &PageRequest) -> Result<ModelReply, String> {
        let messages = build_messages(request);
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| e.to_string())?;

        Ok(ModelReply {
            text: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// Message layout: optional system message, then one user turn carrying the
/// instruction text and the page image.
fn build_messages(request: &PageRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = request.system_prompt.as_deref() {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user_with_images(
        request.prompt.as_str(),
        vec![request.image.clone()],
    ));
    messages
}

/// Build `CompletionOptions` from the transcription config.
fn build_options(config: &TranscriptionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Transcribe a single page image.
///
/// Always returns a `PageResult`; the caller's [`crate::config::ErrorPolicy`]
/// decides what a failed page means for the run.
pub async fn transcribe_page(
    model: &dyn VisionModel,
    page: &PageImage,
    config: &TranscriptionConfig,
) -> PageResult {
    let start = Instant::now();
    let page_num = page.page_num;

    let image = match encode_page_file(page) {
        Ok(image) => image,
        Err(detail) => {
            warn!("Page {}: cannot load {} — {}", page_num, page.path.display(), detail);
            return failed(page_num, start, 0, PageError::ImageLoadFailed { page: page_num, detail });
        }
    };

    let request = PageRequest {
        page_num,
        prompt: config.prompt.clone(),
        system_prompt: config.system_prompt.clone(),
        image,
    };

    let max_retries = u8::try_from(config.max_retries).unwrap_or(u8::MAX);
    let mut last_err: Option<PageError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Page {}: retry {}/{} after {}ms",
                page_num, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let outcome = if config.api_timeout_secs > 0 {
            match timeout(
                Duration::from_secs(config.api_timeout_secs),
                model.complete(&request),
            )
            .await
            {
                Ok(result) => result.map_err(|detail| (false, detail)),
                Err(_) => Err((true, String::new())),
            }
        } else {
            model.complete(&request).await.map_err(|detail| (false, detail))
        };

        match outcome {
            Ok(reply) => {
                let duration = start.elapsed();
                debug!(
                    "Page {}: {} input tokens, {} output tokens, {:?}",
                    page_num, reply.input_tokens, reply.output_tokens, duration
                );
                return PageResult {
                    page_num,
                    text: reply.text,
                    input_tokens: reply.input_tokens,
                    output_tokens: reply.output_tokens,
                    duration_ms: duration.as_millis() as u64,
                    retries: u8::try_from(attempt).unwrap_or(u8::MAX),
                    error: None,
                };
            }
            Err((true, _)) => {
                warn!("Page {}: attempt {} timed out", page_num, attempt + 1);
                last_err = Some(PageError::Timeout {
                    page: page_num,
                    secs: config.api_timeout_secs,
                });
            }
            Err((false, detail)) => {
                warn!("Page {}: attempt {} failed — {}", page_num, attempt + 1, detail);
                last_err = Some(PageError::LlmFailed {
                    page: page_num,
                    retries: max_retries,
                    detail,
                });
            }
        }
    }

    let err = last_err.unwrap_or_else(|| PageError::LlmFailed {
        page: page_num,
        retries: max_retries,
        detail: "Unknown error".to_string(),
    });
    failed(page_num, start, max_retries, err)
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt - 1)`, saturating.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

fn failed(page_num: usize, start: Instant, retries: u8, error: PageError) -> PageResult {
    PageResult {
        page_num,
        text: String::new(),
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: start.elapsed().as_millis() as u64,
        retries,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PNG_1X1: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8,
        0xCF, 0xC0, 0xF0, 0x1F, 0x00, 0x05, 0x00, 0x01, 0xFF, 0x89, 0x99, 0x3D, 0x1D, 0x00, 0x00,
        0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    /// Fails the first `failures` calls, then answers with a section heading.
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VisionModel for Flaky {
        async fn complete(&self, request: &PageRequest) -> Result<ModelReply, String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err("503 overloaded".into())
            } else {
                Ok(ModelReply {
                    text: format!("\\section{{{}}}", request.page_num),
                    input_tokens: 10,
                    output_tokens: 5,
                })
            }
        }
    }

    struct Slow;

    #[async_trait]
    impl VisionModel for Slow {
        async fn complete(&self, _request: &PageRequest) -> Result<ModelReply, String> {
            sleep(Duration::from_secs(5)).await;
            Ok(ModelReply::default())
        }
    }

    fn page_on_disk(dir: &std::path::Path) -> PageImage {
        let path = dir.join("3.png");
        std::fs::write(&path, PNG_1X1).unwrap();
        PageImage { page_num: 3, path }
    }

    #[test]
    fn backoff_doubles_then_saturates() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 3), 2000);
        assert_eq!(backoff_ms(500, 70), u64::MAX);
    }

    #[test]
    fn build_options_defaults() {
        let config = TranscriptionConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[test]
    fn messages_carry_system_prompt_only_when_set() {
        let image = ImageData::new("AAAA".to_string(), "image/png");
        let mut req = PageRequest {
            page_num: 1,
            prompt: "to latex".into(),
            system_prompt: None,
            image,
        };
        assert_eq!(build_messages(&req).len(), 1);
        req.system_prompt = Some("be strict".into());
        assert_eq!(build_messages(&req).len(), 2);
    }

    #[tokio::test]
    async fn success_on_first_try() {
        let dir = tempfile::tempdir().unwrap();
        let model = Flaky { failures: 0, calls: AtomicUsize::new(0) };
        let result = transcribe_page(&model, &page_on_disk(dir.path()), &TranscriptionConfig::default()).await;
        assert!(result.is_ok());
        assert_eq!(result.text, "\\section{3}");
        assert_eq!(result.retries, 0);
    }

    #[tokio::test]
    async fn no_retry_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let model = Flaky { failures: 1, calls: AtomicUsize::new(0) };
        let result = transcribe_page(&model, &page_on_disk(dir.path()), &TranscriptionConfig::default()).await;
        assert!(matches!(result.error, Some(PageError::LlmFailed { page: 3, .. })));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_recover_from_transient_failures() {
        let dir = tempfile::tempdir().unwrap();
        let model = Flaky { failures: 2, calls: AtomicUsize::new(0) };
        let config = TranscriptionConfig::builder()
            .max_retries(2)
            .retry_backoff_ms(1)
            .build()
            .unwrap();
        let result = transcribe_page(&model, &page_on_disk(dir.path()), &config).await;
        assert!(result.is_ok());
        assert_eq!(result.retries, 2);
    }

    #[tokio::test]
    async fn timeout_becomes_page_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = TranscriptionConfig::builder().api_timeout_secs(1).build().unwrap();
        let result = transcribe_page(&Slow, &page_on_disk(dir.path()), &config).await;
        assert!(matches!(result.error, Some(PageError::Timeout { page: 3, secs: 1 })));
    }

    #[tokio::test]
    async fn unreadable_image_never_reaches_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.png");
        std::fs::write(&path, b"not a png").unwrap();
        let model = Flaky { failures: 0, calls: AtomicUsize::new(0) };
        let result = transcribe_page(
            &model,
            &PageImage { page_num: 1, path },
            &TranscriptionConfig::default(),
        )
        .await;
        assert!(matches!(result.error, Some(PageError::ImageLoadFailed { page: 1, .. })));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }
}
