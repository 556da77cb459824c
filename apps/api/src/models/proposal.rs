use serde::Serialize;

/// A user-supplied project idea. Always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Idea(String);

impl Idea {
    /// Returns `None` when the input is empty or whitespace-only.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// HTML produced by the model. Opaque: rendered by the front-end, never parsed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Proposal(String);

impl Proposal {
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_html(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idea_is_trimmed() {
        let idea = Idea::parse("  a dog adoption app \n").unwrap();
        assert_eq!(idea.as_str(), "a dog adoption app");
    }

    #[test]
    fn test_blank_ideas_are_rejected() {
        for raw in ["", " ", "\t\n", "\u{3000}"] {
            assert!(Idea::parse(raw).is_none(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_proposal_serializes_as_plain_string() {
        let proposal = Proposal::new("<h3>Executive Summary</h3>");
        assert_eq!(
            serde_json::to_value(&proposal).unwrap(),
            serde_json::json!("<h3>Executive Summary</h3>")
        );
    }
}
