//! Local model-hub cache management.
//!
//! The hub stores every downloaded repository under one cache root, one
//! directory per repository, with `/` in the repository id replaced by `--`:
//!
//! ```text
//! ~/.cache/huggingface/hub/
//!  ├─ models--Norm--nougat-latex-base/
//!  │   ├─ blobs/  refs/  snapshots/
//!  ├─ models--prithivMLmods--LatexMind-2B-Codec/
//!  └─ .locks/
//!      └─ models--Norm--nougat-latex-base/
//! ```
//!
//! Two sweeps are offered:
//!
//! 1. [`purge_all`] — delete every direct child of the root.
//! 2. [`purge_model`] — walk the root bottom-up and delete every file or
//!    directory whose name matches one model's [`ModelPattern`].
//!
//! Both are best-effort: a failed deletion is recorded in the
//! [`PurgeReport`] and the sweep carries on.

mod pattern;
mod purge;

pub use pattern::{MatchMode, ModelId, ModelPattern};
pub use purge::{purge_all, purge_model, EntryKind, PurgeFailure, PurgeOptions, PurgeReport, RemovedEntry};

use crate::error::Pdf2TexError;
use std::path::{Path, PathBuf};

/// Environment variable naming the hub cache directory itself.
pub const HUB_CACHE_ENV: &str = "HF_HUB_CACHE";

/// Environment variable naming the hub home; the cache lives in `<HF_HOME>/hub`.
pub const HF_HOME_ENV: &str = "HF_HOME";

/// Resolve the cache root.
///
/// Precedence: `explicit` → `$HF_HUB_CACHE` → `$HF_HOME/hub` →
/// `<home>/.cache/huggingface/hub`.
pub fn resolve_cache_root(explicit: Option<&Path>) -> Result<PathBuf, Pdf2TexError> {
    resolve_cache_root_from(
        explicit,
        std::env::var_os(HUB_CACHE_ENV).map(PathBuf::from),
        std::env::var_os(HF_HOME_ENV).map(PathBuf::from),
        dirs::home_dir(),
    )
}

fn resolve_cache_root_from(
    explicit: Option<&Path>,
    hub_cache: Option<PathBuf>,
    hf_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<PathBuf, Pdf2TexError> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if let Some(p) = hub_cache.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(p);
    }
    if let Some(p) = hf_home.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(p.join("hub"));
    }
    home.map(default_cache_root).ok_or_else(|| {
        Pdf2TexError::InvalidConfig(format!(
            "Cannot determine the home directory; pass --cache-dir or set {HUB_CACHE_ENV}"
        ))
    })
}

/// `<home>/.cache/huggingface/hub`.
pub fn default_cache_root(home: PathBuf) -> PathBuf {
    home.join(".cache").join("huggingface").join("hub")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_root_wins() {
        let root = resolve_cache_root_from(
            Some(Path::new("/explicit")),
            Some("/env-hub".into()),
            Some("/hf-home".into()),
            Some("/home/u".into()),
        )
        .unwrap();
        assert_eq!(root, PathBuf::from("/explicit"));
    }

    #[test]
    fn hub_cache_env_beats_hf_home() {
        let root = resolve_cache_root_from(
            None,
            Some("/env-hub".into()),
            Some("/hf-home".into()),
            Some("/home/u".into()),
        )
        .unwrap();
        assert_eq!(root, PathBuf::from("/env-hub"));
    }

    #[test]
    fn hf_home_gets_hub_suffix() {
        let root =
            resolve_cache_root_from(None, None, Some("/hf-home".into()), Some("/home/u".into()))
                .unwrap();
        assert_eq!(root, PathBuf::from("/hf-home/hub"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let root =
            resolve_cache_root_from(None, Some("".into()), Some("".into()), Some("/home/u".into()))
                .unwrap();
        assert_eq!(root, PathBuf::from("/home/u/.cache/huggingface/hub"));
    }

    #[test]
    fn no_home_is_a_config_error() {
        let err = resolve_cache_root_from(None, None, None, None).unwrap_err();
        assert!(matches!(err, Pdf2TexError::InvalidConfig(_)));
    }
}
