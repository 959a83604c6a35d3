pub mod markup;
pub mod sentences;

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::{info, warn};

use crate::error::InputError;

/// Appended to normalized text cut at the character cap.
pub const TEXT_TRUNCATION_MARKER: &str = "... [truncated for performance]";
/// Final unit emitted when the unit cap is hit.
pub const UNITS_TRUNCATION_MARKER: &str = "[Additional content truncated for performance]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Xml,
    Html,
    Txt,
}

impl DocumentFormat {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "xml" => Some(Self::Xml),
            "html" | "htm" => Some(Self::Html),
            "txt" | "text" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Infer the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_tag)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Html => "html",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| InputError::UnsupportedFormat(s.to_string()))
    }
}

/// One normalized sentence-like span, tagged with its position in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_chars: usize,
    pub max_units: usize,
}

/// Size caps per format. XML prose is mostly boilerplate and gets the tight one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadPolicy {
    pub xml: Limits,
    pub text: Limits,
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self {
            xml: Limits {
                max_chars: 50_000,
                max_units: 200,
            },
            text: Limits {
                max_chars: 2_000_000,
                max_units: 20_000,
            },
        }
    }
}

impl LoadPolicy {
    pub fn limits(&self, format: DocumentFormat) -> Limits {
        match format {
            DocumentFormat::Xml => self.xml,
            DocumentFormat::Html | DocumentFormat::Txt => self.text,
        }
    }
}

/// Read a document from disk and turn it into text units.
pub fn load_document(
    path: &Path,
    declared: Option<DocumentFormat>,
    policy: &LoadPolicy,
) -> Result<Vec<TextUnit>, InputError> {
    if !path.is_file() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }

    let format = match declared.or_else(|| DocumentFormat::from_path(path)) {
        Some(f) => f,
        None => {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Err(InputError::UnsupportedFormat(ext));
        }
    };

    let bytes = std::fs::read(path).map_err(|source| InputError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let content = String::from_utf8_lossy(&bytes);
    if let Cow::Owned(_) = content {
        warn!(path = %path.display(), "Invalid UTF-8 replaced while reading document");
    }

    let units = extract_units(&content, format, policy);
    if units.is_empty() {
        return Err(InputError::NoContent(path.to_path_buf()));
    }

    info!(
        path = %path.display(),
        format = %format,
        units = units.len(),
        "Loaded document"
    );
    Ok(units)
}

/// Normalize, cap, and segment document content. Pure.
pub fn extract_units(content: &str, format: DocumentFormat, policy: &LoadPolicy) -> Vec<TextUnit> {
    let limits = policy.limits(format);

    let mut text = match format {
        DocumentFormat::Xml => markup::xml_to_text(content),
        DocumentFormat::Html => markup::html_to_text(content),
        DocumentFormat::Txt => content.to_string(),
    };

    if let Some(kept) = sentences::truncate_chars(&text, limits.max_chars) {
        warn!(format = %format, max_chars = limits.max_chars, "Document text truncated");
        text = format!("{}{}", kept, TEXT_TRUNCATION_MARKER);
    }

    let mut found = sentences::split_sentences(&text);
    let truncated = found.len() > limits.max_units;
    if truncated {
        warn!(
            format = %format,
            found = found.len(),
            max_units = limits.max_units,
            "Sentence count truncated"
        );
        found.truncate(limits.max_units);
        found.push(UNITS_TRUNCATION_MARKER.to_string());
    }

    found
        .into_iter()
        .enumerate()
        .map(|(index, sentence)| TextUnit {
            index,
            text: label(format, index, sentence),
        })
        .collect()
}

/// XML units carry a 1-based phrase label so chunk text keeps its position.
fn label(format: DocumentFormat, index: usize, sentence: String) -> String {
    match format {
        DocumentFormat::Xml => format!("XML Phrase {}: {}", index + 1, sentence),
        DocumentFormat::Html | DocumentFormat::Txt => sentence,
    }
}

// ── Tests ──
