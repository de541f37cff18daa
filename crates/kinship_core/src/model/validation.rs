//! Field-level validation shared by model constructors and repositories.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid color regex"));

/// Rejected field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty after trim.
    BlankField(&'static str),
    /// A required field was not supplied.
    MissingField(&'static str),
    /// Color is not a `#rgb` / `#rrggbb` hex literal.
    InvalidColor(String),
    /// A relationship edge points from a person to the same person.
    SelfRelationship,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::InvalidColor(value) => write!(f, "invalid color `{value}`; expected #rgb or #rrggbb"),
            Self::SelfRelationship => write!(f, "a person cannot be related to themselves"),
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and rejects it when nothing is left.
pub fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

/// Trims optional text; blank values collapse to `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

/// Normalizes an optional hex color to lowercase.
pub fn normalize_color(value: Option<&str>) -> Result<Option<String>, ValidationError> {
    match optional_text(value) {
        None => Ok(None),
        Some(color) if HEX_COLOR_RE.is_match(&color) => Ok(Some(color.to_ascii_lowercase())),
        Some(color) => Err(ValidationError::InvalidColor(color)),
    }
}
