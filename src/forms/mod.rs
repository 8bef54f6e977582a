//! Input normalisation shared by the entity forms.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// A list field accepted either as comma separated text or as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ListInput {
    Text(String),
    Items(Vec<String>),
}

impl ListInput {
    /// Normalised items; array entries get the same trimming as comma text.
    pub fn into_list(self) -> Vec<String> {
        match self {
            ListInput::Text(text) => comma_list(&text),
            ListInput::Items(items) => items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        }
    }
}

impl Default for ListInput {
    fn default() -> Self {
        ListInput::Items(Vec::new())
    }
}

/// Splits comma separated text into trimmed, non-empty items.
pub fn comma_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Blank optional strings are stored as `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Why a value was refused by a [`TagListEditor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRejection {
    Empty,
    Duplicate,
}

impl fmt::Display for TagRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagRejection::Empty => write!(f, "value is empty"),
            TagRejection::Duplicate => write!(f, "value already present"),
        }
    }
}

impl std::error::Error for TagRejection {}

/// Ordered set of short tags (allergies, chronic conditions).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagListEditor {
    tags: Vec<String>,
}

impl TagListEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the editor, silently skipping values `add` would refuse.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut editor = Self::new();
        for value in values {
            let _ = editor.add(value.as_ref());
        }
        editor
    }

    pub fn add(&mut self, value: &str) -> Result<(), TagRejection> {
        let value = value.trim();
        if value.is_empty() {
            return Err(TagRejection::Empty);
        }
        if self.contains(value) {
            return Err(TagRejection::Duplicate);
        }
        self.tags.push(value.to_string());
        Ok(())
    }

    /// Removing an absent value is a no-op. Returns whether anything was removed.
    pub fn remove(&mut self, value: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != value.trim());
        before != self.tags.len()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.tags.iter().any(|t| t == value)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }

    pub fn into_vec(self) -> Vec<String> {
        self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn comma_list_drops_blank_items() {
        assert_eq!(
            comma_list(" fever, cough ,, ,headache "),
            vec!["fever", "cough", "headache"]
        );
        assert!(comma_list("").is_empty());
        assert!(comma_list(" , ,").is_empty());
    }

    #[test]
    fn list_input_accepts_text_or_array() {
        let text: ListInput = serde_json::from_str(r#""Cardiology, Trauma""#).unwrap();
        assert_eq!(text.into_list(), vec!["Cardiology", "Trauma"]);
        let items: ListInput = serde_json::from_str(r#"[" ICU ", ""]"#).unwrap();
        assert_eq!(items.into_list(), vec!["ICU"]);
    }

    #[test]
    fn non_blank_normalises_whitespace() {
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" O+ ".into())), Some("O+".into()));
    }

    #[test]
    fn editor_rejects_empty_and_duplicates() {
        let mut editor = TagListEditor::new();
        assert_matches!(editor.add("  "), Err(TagRejection::Empty));
        assert!(editor.add("Penicillin").is_ok());
        assert_matches!(editor.add(" Penicillin "), Err(TagRejection::Duplicate));
        assert!(editor.add("Latex").is_ok());
        assert_eq!(editor.into_vec(), vec!["Penicillin", "Latex"]);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut editor = TagListEditor::from_values(["Asthma", "Diabetes"]);
        assert!(editor.remove("Asthma"));
        assert!(!editor.remove("Asthma"));
        assert!(!editor.remove("Unknown"));
        assert_eq!(editor.as_slice(), ["Diabetes".to_string()]);
    }

    proptest! {
        #[test]
        fn editor_never_holds_duplicates_or_blanks(values in proptest::collection::vec("[ a-c]{0,3}", 0..20)) {
            let editor = TagListEditor::from_values(&values);
            let tags = editor.as_slice();
            for (i, tag) in tags.iter().enumerate() {
                prop_assert!(!tag.trim().is_empty());
                prop_assert!(!tags[i + 1..].contains(tag));
            }
        }

        #[test]
        fn comma_list_items_are_trimmed(text in "[a-z ,]{0,40}") {
            for item in comma_list(&text) {
                prop_assert_eq!(item.trim(), item.as_str());
                prop_assert!(!item.is_empty());
            }
        }
    }
}
