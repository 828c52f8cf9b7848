// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config errors as miette diagnostics.
//!
//! Unknown keys get a "did you mean" hint (Jaro-Winkler similarity), and
//! errors that can be traced back to a file carry a labelled span.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::path::PathBuf;

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Label used for configuration that did not come from a file.
pub const INLINE_SOURCE: &str = "<inline>";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(code(cadenza::config::unknown_key), help("{hint}"))]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        hint: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(cadenza::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(cadenza::config::missing_key),
        help("add `{key} = <value>` to cadenza.toml")
    )]
    MissingKey { key: String },

    #[error("validation error: {message}")]
    #[diagnostic(code(cadenza::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(cadenza::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// The TOML text behind a figment, kept so errors can point into it.
#[derive(Debug, Default, Clone)]
pub struct SourceFiles {
    files: Vec<(String, String)>,
}

impl SourceFiles {
    /// Read whichever of `paths` exist. Paths are made absolute to match
    /// the names figment records.
    pub fn read(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let files = paths
            .into_iter()
            .filter_map(|path| {
                let content = std::fs::read_to_string(&path).ok()?;
                let name = std::path::absolute(&path).unwrap_or(path);
                Some((name.display().to_string(), content))
            })
            .collect();
        Self { files }
    }

    pub fn inline(content: &str) -> Self {
        Self {
            files: vec![(INLINE_SOURCE.to_string(), content.to_string())],
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, content)| content.as_str())
    }

    /// Span of `key` inside `table`, in the file the error came from.
    fn span_for(
        &self,
        error: &figment::Error,
        table: &[String],
        key: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        let name = match error.metadata.as_ref().and_then(|m| m.source.as_ref()) {
            Some(figment::Source::File(path)) => path.display().to_string(),
            Some(_) => INLINE_SOURCE.to_string(),
            None => return (None, None),
        };
        let Some(content) = self.get(&name) else {
            return (None, None);
        };
        match key_offset(content, table, key) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(name, content.to_string())),
            ),
            None => (None, None),
        }
    }
}

/// Flatten a figment error into one diagnostic per underlying problem.
pub fn from_figment(err: figment::Error, sources: &SourceFiles) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(key, accepted) => {
                let suggestion = suggest_key(key, accepted);
                let hint = match &suggestion {
                    Some(s) => format!("did you mean `{s}`? Accepted keys: {}", accepted.join(", ")),
                    None => format!("accepted keys: {}", accepted.join(", ")),
                };
                // The error path stops at the enclosing table.
                let (span, src) = sources.span_for(&error, &error.path, key);
                ConfigError::UnknownKey {
                    key: key.clone(),
                    suggestion,
                    hint,
                    span,
                    src,
                }
            }
            Kind::MissingField(key) => ConfigError::MissingKey {
                key: key.to_string(),
            },
            Kind::InvalidType(found, expected) => {
                let (table, key) = match error.path.split_last() {
                    Some((key, table)) => (table.to_vec(), key.clone()),
                    None => (Vec::new(), String::new()),
                };
                let (span, src) = sources.span_for(&error, &table, &key);
                ConfigError::InvalidType {
                    key: error.path.join("."),
                    found: found.to_string(),
                    expected: expected.to_string(),
                    span,
                    src,
                }
            }
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Byte offset of `key = ...` inside `[table]` of a TOML document.
///
/// An empty `table` means the top level, before the first header. Nested
/// tables are matched by their dotted header, e.g. `[plugins.settings.lastfm]`.
pub fn key_offset(content: &str, table: &[String], key: &str) -> Option<usize> {
    let wanted = table.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim();

        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            current = header.trim().to_string();
        } else if current == wanted
            && let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// The accepted key closest to `unknown`, if any is close enough.
pub fn suggest_key(unknown: &str, accepted: &[&str]) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for &candidate in accepted {
        let score = strsim::jaro_winkler(unknown, candidate);
        if score > SUGGESTION_THRESHOLD && best.is_none_or(|(top, _)| score > top) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, key)| key.to_string())
}

/// Print every error to stderr with miette's graphical report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}
