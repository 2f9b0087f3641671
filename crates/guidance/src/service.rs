//! Guidance service: prompt the model, reshape its reply into suggestions.

use thiserror::Error;

use crate::suggestion::Suggestion;

#[derive(Debug, Error)]
pub enum GuidanceError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("unparseable model response: {0}")]
    InvalidResponse(String),
}

/// Seam over the external generative-text API.
///
/// Implementations perform the actual network exchange; the service stays
/// synchronous and best-effort (a failing model never fails the caller).
pub trait GuidanceModel: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GuidanceError>;
}

/// Reshapes free-text model output into `Suggestion` records.
#[derive(Debug)]
pub struct GuidanceService<M> {
    model: M,
}

impl<M> GuidanceService<M>
where
    M: GuidanceModel,
{
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Ask the model for guidance on a student question.
    ///
    /// Always returns at least one record: a fallback when the model is
    /// unavailable, or the raw text wrapped in a single record when the
    /// reply is not the expected JSON array.
    pub fn provide_guidance(&self, question: &str) -> Vec<Suggestion> {
        let prompt = Self::build_prompt(question);

        let text = match self.model.generate(&prompt) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "guidance model call failed; using fallback");
                return vec![Suggestion::fallback()];
            }
        };

        let cleaned = Self::strip_code_fences(&text);

        match serde_json::from_str::<Vec<Suggestion>>(cleaned) {
            Ok(suggestions) if !suggestions.is_empty() => suggestions,
            Ok(_) => vec![Suggestion::fallback()],
            Err(err) => {
                tracing::warn!(error = %err, "guidance reply was not a suggestion array");
                vec![Suggestion::new("Academic Guidance", cleaned.trim())]
            }
        }
    }

    fn build_prompt(question: &str) -> String {
        let mut prompt = String::from(
            "You are an academic advisor for the university. Provide accurate, \
             clear answers about programs, courses, enrollment, and fees.\n",
        );

        if !question.trim().is_empty() {
            prompt.push_str("Student question: ");
            prompt.push_str(question.trim());
            prompt.push('\n');
        }

        prompt.push_str(
            "Return a JSON array of objects with fields: \
             title (short hint), description (detailed explanation), \
             url (optional resource link).",
        );

        prompt
    }

    /// Remove a surrounding markdown code fence, if the model added one.
    fn strip_code_fences(text: &str) -> &str {
        let trimmed = text.trim();

        let without_open = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed);

        without_open
            .strip_suffix("```")
            .unwrap_or(without_open)
            .trim()
    }
}
