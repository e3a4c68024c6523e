//! Error types for the regex engine

use thiserror::Error;

/// Result type for regex operations
pub type Result<T> = std::result::Result<T, RegexError>;

/// Errors that can occur during regex compilation or execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegexError {
    /// Malformed pattern text. `position` is a UTF-16 code unit offset into the pattern.
    #[error("Invalid regular expression: {message} (at position {position})")]
    Syntax { message: String, position: usize },
    /// The pattern is valid but cannot be compiled to a DFA (unsupported feature or a
    /// resource limit). Caught inside the compiler and answered with the fallback engine.
    #[error("Unsupported regular expression: {0}")]
    Unsupported(String),
    /// The fallback engine rejected the pattern or failed while matching
    #[error("Fallback engine error: {0}")]
    Fallback(String),
}

impl RegexError {
    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        RegexError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        RegexError::Unsupported(reason.into())
    }

    /// True for errors that mean "use another engine" rather than "bad pattern"
    pub fn is_bailout(&self) -> bool {
        matches!(self, RegexError::Unsupported(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = RegexError::syntax("Unterminated group", 3);
        assert_eq!(
            err.to_string(),
            "Invalid regular expression: Unterminated group (at position 3)"
        );
        assert!(!err.is_bailout());
        assert!(RegexError::unsupported("back-references").is_bailout());
    }
}
