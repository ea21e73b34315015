//! Configuration types for rasterisation and transcription.
//!
//! Each flow has one config struct built through a builder:
//!
//! * [`RasterConfig`] — how PDF pages are rendered into page images.
//! * [`TranscriptionConfig`] — which model reads the page images, with which
//!   prompt, and what happens when a page fails.
//!
//! Cache purges take [`crate::cache::PurgeOptions`] instead; they have no
//! knobs worth a builder.

use crate::error::Pdf2TexError;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_PROMPT;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ── Rasterisation ────────────────────────────────────────────────────────

/// Configuration for turning a PDF into numbered page images.
///
/// # Example
/// ```rust
/// use edgequake_pdf2tex::RasterConfig;
///
/// let config = RasterConfig::builder().dpi(200).build().unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Debug, Clone)]
pub struct RasterConfig {
    /// Rendering DPI. Range: 72–400. Default: 200.
    ///
    /// Formulae carry sub- and superscripts; 200 DPI keeps them legible for
    /// the vision model where 150 starts to blur exponents.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2480.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 2480,
            password: None,
        }
    }
}

impl RasterConfig {
    /// Create a new builder for `RasterConfig`.
    pub fn builder() -> RasterConfigBuilder {
        RasterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RasterConfig`].
#[derive(Debug)]
pub struct RasterConfigBuilder {
    config: RasterConfig,
}

impl RasterConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RasterConfig, Pdf2TexError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(Pdf2TexError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        Ok(self.config)
    }
}

// ── Transcription ────────────────────────────────────────────────────────

/// What the transcription loop does when a single page fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Log the failure, leave the page out of the output, keep going. (default)
    #[default]
    Skip,
    /// Stop at the first failed page and return
    /// [`Pdf2TexError::PageFailed`]. Nothing is written.
    Abort,
}

/// Configuration for transcribing a directory of page images.
///
/// Built via [`TranscriptionConfig::builder()`] or using
/// [`TranscriptionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2tex::{ErrorPolicy, TranscriptionConfig};
///
/// let config = TranscriptionConfig::builder()
///     .model("gpt-4.1-mini")
///     .error_policy(ErrorPolicy::Abort)
///     .page_markers(true)
///     .build()
///     .unwrap();
/// assert!(config.page_markers);
/// ```
#[derive(Clone)]
pub struct TranscriptionConfig {
    /// Instruction sent next to every page image.
    /// Default: [`DEFAULT_PROMPT`].
    pub prompt: String,

    /// Optional system message sent before the page. Default: None.
    pub system_prompt: Option<String>,

    /// Model identifier, e.g. "gpt-4.1-nano" or a served hub model such as
    /// "prithivMLmods/LatexMind-2B-Codec". If None, uses provider default.
    pub model: Option<String>,

    /// Provider name (e.g. "openai", "ollama"). If None along with
    /// `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.0 (greedy decoding).
    pub temperature: f32,

    /// Maximum new tokens per page. Default: 1024.
    pub max_tokens: usize,

    /// Retry attempts on a failed model call. Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds; 0 disables it. Default: 0.
    pub api_timeout_secs: u64,

    /// Failure policy for individual pages. Default: [`ErrorPolicy::Skip`].
    pub error_policy: ErrorPolicy,

    /// Prefix each page with `--- Output from page N ---`. Default: false.
    pub page_markers: bool,

    /// Run [`crate::pipeline::postprocess::clean_latex`] on each reply. Default: true.
    pub clean_output: bool,

    /// Receives per-page events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            system_prompt: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 1024,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: 0,
            error_policy: ErrorPolicy::default(),
            page_markers: false,
            clean_output: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TranscriptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptionConfig")
            .field("prompt", &self.prompt)
            .field("system_prompt", &self.system_prompt)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("error_policy", &self.error_policy)
            .field("page_markers", &self.page_markers)
            .field("clean_output", &self.clean_output)
            .finish()
    }
}

impl TranscriptionConfig {
    /// Create a new builder for `TranscriptionConfig`.
    pub fn builder() -> TranscriptionConfigBuilder {
        TranscriptionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TranscriptionConfig`].
pub struct TranscriptionConfigBuilder {
    config: TranscriptionConfig,
}

impl fmt::Debug for TranscriptionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl TranscriptionConfigBuilder {
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = prompt.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.config.error_policy = policy;
        self
    }

    pub fn page_markers(mut self, v: bool) -> Self {
        self.config.page_markers = v;
        self
    }

    pub fn clean_output(mut self, v: bool) -> Self {
        self.config.clean_output = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranscriptionConfig, Pdf2TexError> {
        let c = &self.config;
        if c.prompt.trim().is_empty() {
            return Err(Pdf2TexError::InvalidConfig(
                "Prompt must not be empty".into(),
            ));
        }
        if c.max_retries > u32::from(u8::MAX) {
            return Err(Pdf2TexError::InvalidConfig(format!(
                "max_retries must be ≤ {}, got {}",
                u8::MAX,
                c.max_retries
            )));
        }
        if c.max_tokens == 0 {
            return Err(Pdf2TexError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Marker line written before a page when
/// [`TranscriptionConfig::page_markers`] is enabled.
pub fn page_marker(page_num: usize) -> String {
    format!("--- Output from page {} ---", page_num)
}
