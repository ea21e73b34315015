//! Instruction prompts sent to the vision model.
//!
//! Callers can override the default via
//! [`crate::config::TranscriptionConfig::prompt`]; the constants here are
//! used only when no override is provided.

/// Default instruction paired with every page image.
pub const DEFAULT_PROMPT: &str = "Please convert this document screenshot to LaTeX code.";

/// Stricter system prompt for general-purpose chat models, which tend to
/// wrap their answer in prose. Opt in with
/// [`crate::config::TranscriptionConfigBuilder::system_prompt`].
pub const STRICT_SYSTEM_PROMPT: &str = r#"You transcribe document page images into LaTeX.

Rules:
1. Output ONLY LaTeX source for the visible content, in reading order.
2. Use inline math $...$ and display math \[...\] or equation environments as they appear.
3. Reproduce tables with tabular, lists with itemize/enumerate, headings with \section/\subsection.
4. Do NOT add a preamble, \documentclass or \begin{document}.
5. Do NOT wrap the answer in ``` fences and do NOT add commentary.
6. Skip page numbers and running headers/footers."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_asks_for_latex() {
        assert!(DEFAULT_PROMPT.contains("LaTeX"));
    }

    #[test]
    fn strict_prompt_forbids_fences() {
        assert!(STRICT_SYSTEM_PROMPT.contains("```"));
        assert!(STRICT_SYSTEM_PROMPT.contains("documentclass"));
    }
}
