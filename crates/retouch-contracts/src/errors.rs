use thiserror::Error;

/// Maximum number of characters of model text kept in an
/// [`RestoreError::UnexpectedText`] preview.
pub const TEXT_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestoreError {
    #[error("Invalid restoration request: {0}")]
    Validation(String),
    #[error("API key missing; supply a Gemini API key before restoring.")]
    MissingCredentials,
    #[error("Gemini API error: API key not valid ({0})")]
    Authentication(String),
    #[error("Gemini API error: quota or rate limit exhausted; retry later ({0})")]
    RateLimit(String),
    #[error("Request blocked by the safety filter.{}", blocked_suffix(.reason))]
    Blocked { reason: Option<String> },
    #[error("Model returned text instead of an image: \"{preview}\"")]
    UnexpectedText { preview: String },
    #[error("Model returned a response without an image. Try adjusting the options or the photo.")]
    EmptyResult,
    #[error("Gemini API error: {0}")]
    Service(String),
}

impl RestoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::MissingCredentials => "missing_credentials",
            Self::Authentication(_) => "authentication",
            Self::RateLimit(_) => "rate_limit",
            Self::Blocked { .. } => "blocked",
            Self::UnexpectedText { .. } => "unexpected_text",
            Self::EmptyResult => "empty_result",
            Self::Service(_) => "service",
        }
    }

    /// True for failures raised before any network attempt.
    pub fn is_pre_submission(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::MissingCredentials)
    }

    pub fn unexpected_text(text: &str) -> Self {
        Self::UnexpectedText {
            preview: truncate_text(text.trim(), TEXT_PREVIEW_CHARS),
        }
    }
}

fn blocked_suffix(reason: &Option<String>) -> String {
    match reason.as_deref().map(str::trim) {
        Some(reason) if !reason.is_empty() => format!(" Reason: {reason}"),
        _ => String::new(),
    }
}

pub fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
