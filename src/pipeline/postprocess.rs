//! Post-processing: deterministic cleanup of model-generated LaTeX.
//!
//! Vision models asked for LaTeX still slip into chat habits: the answer
//! arrives wrapped in ```` ```latex ```` fences, with CRLF line endings or
//! stray zero-width characters copied from the training data. These rules
//! fix the wrapping without touching the LaTeX itself.
//!
//! Rules (applied in order):
//! 1. Strip outer code fences (```` ```latex ````, ```` ```tex ````, bare ```` ``` ````)
//! 2. Normalise line endings (CRLF → LF)
//! 3. Trim trailing whitespace per line
//! 4. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 5. Trim leading and trailing blank lines

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw model reply.
pub fn clean_latex(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = remove_invisible_chars(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Strip outer code fences ─────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:latex|tex|LaTeX)?[ \t]*\r?\n(.*?)\r?\n```\s*$").unwrap()
});

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_latex_fences() {
        let input = "```latex\n\\section{Intro}\n$x^2$\n```";
        assert_eq!(strip_code_fences(input), "\\section{Intro}\n$x^2$");
    }

    #[test]
    fn test_strip_bare_fences() {
        let input = "```\n\\[ a + b \\]\n```\n";
        assert_eq!(strip_code_fences(input), "\\[ a + b \\]");
    }

    #[test]
    fn test_inner_fences_survive() {
        let input = "Text before\n```latex\nx\n```";
        assert_eq!(strip_code_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  \\item a   \n\\item b  "),
            "  \\item a\n\\item b"
        );
    }

    #[test]
    fn test_remove_invisible() {
        let input = "\\alpha\u{200B}\\beta\u{FEFF}";
        assert_eq!(remove_invisible_chars(input), "\\alpha\\beta");
    }

    #[test]
    fn test_clean_latex_full_pipeline() {
        let input = "```latex\r\n\\begin{equation}\r\n  E = mc^2   \r\n\\end{equation}\r\n```";
        assert_eq!(
            clean_latex(input),
            "\\begin{equation}\n  E = mc^2\n\\end{equation}"
        );
    }

    #[test]
    fn test_clean_latex_keeps_plain_output() {
        assert_eq!(clean_latex("\n\n$a$\n\n"), "$a$");
    }
}
