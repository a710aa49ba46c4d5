//! Transform failures and recoverable warnings.

use bindpath_diagnostics::DiagnosticCode;
use serde::Serialize;
use thiserror::Error;

/// A transform that produced no output.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The input is not a valid script.
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        message: String,
        line: u32,
        column: u32,
        /// Byte offset of the error in the input.
        offset: u32,
    },

    /// The input nests too deeply to be parsed within the stack reserved
    /// for `max_depth`.
    #[error("nesting deeper than {limit} levels at {line}:{column}")]
    TooDeep {
        limit: usize,
        line: u32,
        column: u32,
        /// Byte offset where the limit is first passed.
        offset: u32,
    },

    /// A configured helper name, marker or receiver is unusable.
    #[error("invalid option `{option}`: {reason}")]
    InvalidOption { option: &'static str, reason: String },

    #[error("failed to print output: {0}")]
    Print(#[from] std::io::Error),
}

impl TransformError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            TransformError::Syntax { .. } => DiagnosticCode::ParseError,
            TransformError::TooDeep { .. } => DiagnosticCode::DepthLimit,
            TransformError::InvalidOption { .. } => DiagnosticCode::InvalidOption,
            TransformError::Print(_) => DiagnosticCode::IoError,
        }
    }

    pub(crate) fn invalid_option(option: &'static str, reason: impl Into<String>) -> Self {
        TransformError::InvalidOption {
            option,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A construct whose bindings cannot be classified.
    UnsupportedConstruct,
    /// Nesting deeper than `max_depth`.
    DepthLimit,
}

impl WarningKind {
    pub fn code(self) -> DiagnosticCode {
        match self {
            WarningKind::UnsupportedConstruct => DiagnosticCode::UnsupportedConstruct,
            WarningKind::DepthLimit => DiagnosticCode::DepthLimit,
        }
    }
}

/// A sub-tree that was copied to the output unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    /// 1-based position of the sub-tree in the input.
    pub line: u32,
    pub column: u32,
    /// Byte range of the sub-tree in the input.
    pub offset: u32,
    pub len: u32,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TransformError::Syntax {
            message: "Expected ';'".to_string(),
            line: 2,
            column: 5,
            offset: 9,
        };
        assert_eq!(err.to_string(), "syntax error at 2:5: Expected ';'");
        assert_eq!(err.code(), DiagnosticCode::ParseError);

        let err = TransformError::TooDeep {
            limit: 1024,
            line: 3,
            column: 7,
            offset: 40,
        };
        assert_eq!(err.to_string(), "nesting deeper than 1024 levels at 3:7");
        assert_eq!(err.code(), DiagnosticCode::DepthLimit);

        let err = TransformError::invalid_option("helper_name", "must be an identifier");
        assert_eq!(
            err.to_string(),
            "invalid option `helper_name`: must be an identifier"
        );
    }

    #[test]
    fn test_warning_serializes_kind_in_snake_case() {
        let warning = Warning {
            kind: WarningKind::UnsupportedConstruct,
            message: "`with` body left unmodified".to_string(),
            line: 1,
            column: 10,
            offset: 9,
            len: 5,
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "unsupported_construct");
        assert_eq!(warning.to_string(), "1:10: `with` body left unmodified");
    }
}
