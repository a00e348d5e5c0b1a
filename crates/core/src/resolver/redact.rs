//! Redaction of worker diagnostics before they reach a caller.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::{Path, PathBuf};

/// Absolute unix or windows paths preceded by a boundary character.
static ABSOLUTE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)(^|[\s'"=(\[:,])(/[^\s'"\]),;]+|[A-Za-z]:\\[^\s'"\]),;]*)"#).unwrap()
});

/// `key=value` / `key: value` pairs whose value looks secret.
static SECRET_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(api[_-]?key|access[_-]?key|key|token|secret|password|passwd|credentials?)",
        r"(\s*[=:]\s*)([^\s,;]+)",
    ))
    .unwrap()
});

/// Produces user-safe excerpts of worker stderr.
#[derive(Debug, Clone)]
pub struct Redactor {
    /// Known sensitive paths and their placeholders, longest path first.
    known_paths: Vec<(String, &'static str)>,
    max_excerpt: usize,
}

impl Redactor {
    pub fn new(max_excerpt: usize) -> Self {
        Self {
            known_paths: Vec::new(),
            max_excerpt,
        }
    }

    /// Registers a path that must be replaced by `placeholder`.
    pub fn with_path(mut self, path: impl AsRef<Path>, placeholder: &'static str) -> Self {
        self.push_path(path.as_ref(), placeholder);
        self
    }

    fn push_path(&mut self, path: &Path, placeholder: &'static str) {
        let mut variants = vec![path.to_path_buf()];
        if let Ok(canonical) = std::fs::canonicalize(path) {
            variants.push(canonical);
        }
        for variant in variants {
            let s = variant.to_string_lossy().to_string();
            if !s.is_empty() && !self.known_paths.iter().any(|(p, _)| *p == s) {
                self.known_paths.push((s, placeholder));
            }
        }
        self.known_paths.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Redacts `text` and keeps at most `max_excerpt` characters of its tail.
    ///
    /// `extra` holds per-job strings (input path, job and output ids) that
    /// are masked as `<redacted>`.
    pub fn excerpt(&self, text: &str, extra: &[&str]) -> String {
        let redacted = self.redact(text, extra);
        let trimmed = redacted.trim();
        tail_chars(trimmed, self.max_excerpt)
    }

    pub fn redact(&self, text: &str, extra: &[&str]) -> String {
        let mut out = text.to_string();

        let mut extra: Vec<&str> = extra.iter().copied().filter(|s| !s.is_empty()).collect();
        extra.sort_by_key(|s| std::cmp::Reverse(s.len()));
        for (path, placeholder) in &self.known_paths {
            // Per-job values nested under a known path are handled first.
            for value in extra.iter().filter(|v| v.starts_with(path.as_str())) {
                out = out.replace(value, "<redacted>");
            }
            out = out.replace(path.as_str(), placeholder);
        }
        for value in &extra {
            out = out.replace(value, "<redacted>");
        }

        let out = ABSOLUTE_PATH.replace_all(&out, "${1}<path>");
        let out = SECRET_ASSIGNMENT.replace_all(&out, "${1}${2}<redacted>");
        out.into_owned()
    }
}

fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    if max <= 3 {
        return ".".repeat(max);
    }
    let keep = max - 3;
    let tail: String = text.chars().skip(count - keep).collect();
    format!("...{}", tail)
}

/// Convenience for building a redactor over several placeholder paths.
pub(crate) fn redactor_for(
    max_excerpt: usize,
    paths: impl IntoIterator<Item = (PathBuf, &'static str)>,
) -> Redactor {
    paths
        .into_iter()
        .fold(Redactor::new(max_excerpt), |r, (path, placeholder)| {
            r.with_path(path, placeholder)
        })
}
