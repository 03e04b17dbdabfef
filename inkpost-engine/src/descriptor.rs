//! Candidate-based element descriptors.

use serde::{Deserialize, Serialize};

/// An ordered list of candidate selection expressions for one logical UI
/// element, plus a human-readable label used in diagnostics.
///
/// Order encodes preference, not optionality: the first candidate that
/// resolves to a *visible* element wins. Construction guarantees at least one
/// candidate, including when deserialized from configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawDescriptor")]
pub struct ElementDescriptor {
    label: String,
    candidates: Vec<String>,
}

impl ElementDescriptor {
    /// Create a descriptor with a primary candidate.
    pub fn new(label: impl Into<String>, primary: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            candidates: vec![primary.into()],
        }
    }

    /// Append a fallback candidate, tried only after the ones before it.
    pub fn or(mut self, candidate: impl Into<String>) -> Self {
        self.candidates.push(candidate.into());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

impl std::fmt::Display for ElementDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

#[derive(Deserialize)]
struct RawDescriptor {
    label: String,
    candidates: Vec<String>,
}

impl TryFrom<RawDescriptor> for ElementDescriptor {
    type Error = String;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        if raw.candidates.is_empty() {
            return Err(format!(
                "descriptor '{}' needs at least one candidate selector",
                raw.label
            ));
        }
        Ok(Self {
            label: raw.label,
            candidates: raw.candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_candidate_order() {
        let d = ElementDescriptor::new("publish button", "button.primary")
            .or("button[type=submit]")
            .or("div.toolbar button");
        assert_eq!(d.label(), "publish button");
        assert_eq!(
            d.candidates(),
            ["button.primary", "button[type=submit]", "div.toolbar button"]
        );
    }

    #[test]
    fn deserialize_rejects_empty_candidates() {
        let err = serde_json::from_str::<ElementDescriptor>(
            r#"{"label": "title", "candidates": []}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("at least one candidate"));
    }

    #[test]
    fn deserialize_round_trip() {
        let d = ElementDescriptor::new("title input", "input#title").or("input[name=title]");
        let json = serde_json::to_string(&d).unwrap();
        let back: ElementDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
