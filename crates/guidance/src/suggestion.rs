use serde::{Deserialize, Serialize};

/// One guidance record shown to a student.
///
/// This is *not* a domain event. It is advisory content that higher layers
/// can display without touching the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Short hint or concept.
    pub title: String,

    /// Detailed explanation.
    pub description: String,

    /// Optional resource link.
    #[serde(default)]
    pub url: String,
}

impl Suggestion {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            url: String::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// The best-effort record returned when the model is unavailable.
    pub fn fallback() -> Self {
        Suggestion::new(
            "Academic Guidance",
            "The guidance service is temporarily unavailable. Please contact the registrar's office for official information.",
        )
        .with_url("https://registry.example.edu")
    }
}
