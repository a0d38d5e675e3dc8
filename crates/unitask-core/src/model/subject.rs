use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const NAME_MAX_CHARS: usize = 30;
pub const TEACHER_MAX_CHARS: usize = 40;

/// A course or module that tasks belong to.
///
/// Names are unique among subjects under case-insensitive comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    /// Always `#RRGGBB`, uppercase.
    pub color_hex: String,
    #[serde(default)]
    pub teacher: Option<String>,
}

impl Subject {
    pub fn new(name: String, color_hex: String, teacher: Option<String>) -> Self {
        Self {
            id: super::new_id(),
            name,
            color_hex,
            teacher,
        }
    }

    /// Case-insensitive name comparison used for uniqueness checks.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Validated subject fields, ready to be merged into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectFields {
    pub name: String,
    pub color_hex: String,
    pub teacher: Option<String>,
}

impl SubjectFields {
    pub fn parse(
        name: &str,
        color_hex: &str,
        teacher: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: super::required_text("name", name, NAME_MAX_CHARS)?,
            color_hex: normalize_color(color_hex)?,
            teacher: super::optional_text("teacher", teacher, TEACHER_MAX_CHARS)?,
        })
    }
}

/// Normalize a color to `#RRGGBB` uppercase.
///
/// Accepts the hex body with or without a leading `#`; the body must be
/// exactly six hex digits.
pub fn normalize_color(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if body.len() != 6 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidColor(input.to_string()));
    }
    Ok(format!("#{}", body.to_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn color_normalization() {
        assert_eq!(normalize_color("#a1b2c3").unwrap(), "#A1B2C3");
        assert_eq!(normalize_color("a1b2c3").unwrap(), "#A1B2C3");
        assert_eq!(normalize_color(" ff00AA ").unwrap(), "#FF00AA");
    }

    #[test]
    fn color_rejects_bad_bodies() {
        for bad in ["", "#", "#fff", "#12345", "#1234567", "#GG0000", "##123456", "12 456"] {
            assert!(normalize_color(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn has_name_ignores_case() {
        let s = Subject::new("Physics".into(), "#000000".into(), None);
        assert!(s.has_name("PHYSICS"));
        assert!(!s.has_name("Physics II"));
    }

    #[test]
    fn fields_parse_trims_everything() {
        let f = SubjectFields::parse("  Calculus ", "00ff00", Some("  ")).unwrap();
        assert_eq!(f.name, "Calculus");
        assert_eq!(f.color_hex, "#00FF00");
        assert_eq!(f.teacher, None);
    }

    proptest! {
        #[test]
        fn accepted_colors_store_uppercased_body(body in "[0-9a-fA-F]{6}", hash in any::<bool>()) {
            let input = if hash { format!("#{body}") } else { body.clone() };
            let stored = normalize_color(&input).unwrap();
            prop_assert_eq!(stored, format!("#{}", body.to_uppercase()));
        }
    }
}
