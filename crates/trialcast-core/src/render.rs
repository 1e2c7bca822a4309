//! # Render Module
//!
//! The Result Renderer: a pure mapping from a label to a styled message.
//!
//! The core does not know about pages or terminals; it produces a
//! [`StyledMessage`] that can be emitted as an HTML block or as plain text.

use crate::Label;
use serde::{Deserialize, Serialize};

/// Which block to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Predicted success.
    Affirmative,
    /// Predicted failure.
    Negative,
    /// A recoverable error during prediction.
    Error,
}

impl Tone {
    /// Background color.
    #[must_use]
    pub fn background(self) -> &'static str {
        match self {
            Self::Affirmative => "#d4edda",
            Self::Negative => "#f8d7da",
            Self::Error => "#fde2e1",
        }
    }

    /// Text color.
    #[must_use]
    pub fn foreground(self) -> &'static str {
        match self {
            Self::Affirmative => "#155724",
            Self::Negative => "#721c24",
            Self::Error => "#7d1a15",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Affirmative => "✅",
            Self::Negative => "❌",
            Self::Error => "🚨",
        }
    }
}

/// A rendered verdict or error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledMessage {
    pub tone: Tone,
    pub text: String,
}

impl StyledMessage {
    /// Inline CSS for the block.
    #[must_use]
    pub fn style(&self) -> String {
        format!(
            "background-color: {}; padding: 15px; border-radius: 10px; color: {}; font-weight: bold;",
            self.tone.background(),
            self.tone.foreground()
        )
    }

    /// Icon and text on one line.
    #[must_use]
    pub fn to_text(&self) -> String {
        format!("{} {}", self.tone.icon(), self.text)
    }

    /// A styled `div`; the text is escaped.
    #[must_use]
    pub fn to_html(&self) -> String {
        format!(
            "<div class=\"verdict verdict-{}\" style=\"{}\">{} {}</div>",
            match self.tone {
                Tone::Affirmative => "affirmative",
                Tone::Negative => "negative",
                Tone::Error => "error",
            },
            self.style(),
            self.tone.icon(),
            escape_html(&self.text)
        )
    }
}

/// Map a label to its message. Exactly two outcomes exist.
#[must_use]
pub fn render(label: Label) -> StyledMessage {
    let tone = match label {
        Label::Success => Tone::Affirmative,
        Label::Failure => Tone::Negative,
    };
    StyledMessage {
        tone,
        text: format!("Predicted Clinical Trial Outcome: {}", label.outcome()),
    }
}

/// Message shown when a recoverable error stopped the prediction.
#[must_use]
pub fn render_error(error: &impl std::fmt::Display) -> StyledMessage {
    StyledMessage {
        tone: Tone::Error,
        text: format!("Error during prediction: {error}"),
    }
}

/// Escape text for an HTML element or a quoted attribute.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
