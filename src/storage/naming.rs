//! Artifact identifiers and collision-resistant naming
//!
//! An [`ArtifactId`] is the only key into storage. It never carries the `.pptx`
//! extension; backends append it when turning the id into a file or object name.

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Extension attached to every stored presentation
pub const PPTX_EXTENSION: &str = ".pptx";

/// Base name used when the caller suggests nothing usable
pub const DEFAULT_BASE_NAME: &str = "presentation";

const MAX_ID_LEN: usize = 128;
const MAX_BASE_LEN: usize = 48;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactIdError {
    #[error("Artifact id is empty")]
    Empty,

    #[error("Artifact id exceeds 128 characters")]
    TooLong,

    #[error("Artifact id contains forbidden character {0:?}")]
    ForbiddenChar(char),
}

/// Filesystem-safe and URL-safe key of a stored presentation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Validate an externally supplied id
    pub fn parse(raw: &str) -> Result<Self, ArtifactIdError> {
        if raw.is_empty() {
            return Err(ArtifactIdError::Empty);
        }
        if raw.len() > MAX_ID_LEN {
            return Err(ArtifactIdError::TooLong);
        }
        if let Some(bad) = raw.chars().find(|c| !is_id_char(*c)) {
            return Err(ArtifactIdError::ForbiddenChar(bad));
        }
        Ok(Self(raw.to_string()))
    }

    /// Accept either `<id>` or `<id>.pptx`, as used in download paths
    pub fn from_request_path(segment: &str) -> Result<Self, ArtifactIdError> {
        Self::parse(strip_pptx_extension(segment))
    }

    /// Recover an id from a stored file or object name; `None` for anything else
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(PPTX_EXTENSION)?;
        Self::parse(stem).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<id>.pptx`
    pub fn file_name(&self) -> String {
        format!("{}{}", self.0, PPTX_EXTENSION)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn strip_pptx_extension(name: &str) -> &str {
    let split = name.len().saturating_sub(PPTX_EXTENSION.len());
    match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(PPTX_EXTENSION) => stem,
        _ => name,
    }
}

/// Reduce a caller-suggested name to a safe base name.
///
/// Keeps the final path component, drops a `.pptx` suffix, lowercases ASCII
/// alphanumerics and folds separators (whitespace, `.`, `-`, `_`) into single dashes.
/// Everything else is discarded. May return an empty string.
pub fn sanitize_base_name(suggested: &str) -> String {
    let last = suggested
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let stem = strip_pptx_extension(last);

    let mut out = String::with_capacity(stem.len().min(MAX_BASE_LEN));
    let mut pending_dash = false;

    for c in stem.chars() {
        if out.len() >= MAX_BASE_LEN {
            break;
        }
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() && out.len() + 1 < MAX_BASE_LEN {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || matches!(c, '.' | '-' | '_') {
            pending_dash = true;
        }
    }

    out
}

/// Generates unique artifact ids of the form `<base>-<timestamp>-<random><seq>`
#[derive(Debug, Default)]
pub struct ArtifactNamer {
    sequence: AtomicU64,
}

impl ArtifactNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a fresh id from an optional suggested name
    pub fn next_id(&self, suggested: Option<&str>) -> ArtifactId {
        let base = suggested
            .map(sanitize_base_name)
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_NAME.to_string());

        // The sequence alone separates up to 65536 ids minted within one second.
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) & 0xffff;
        let random: u32 = rand::random();

        ArtifactId(format!(
            "{}-{}-{:08x}{:04x}",
            base,
            Utc::now().format("%Y%m%d%H%M%S"),
            random,
            seq
        ))
    }
}
