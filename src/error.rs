// Shell error model
// Every failure crossing a bridge boundary is one of these kinds; adapters
// surface them as native script errors without losing the kind tag.

use thiserror::Error;

/// Common result alias used across the crate.
pub type ShellResult<T> = Result<T, ShellError>;

/// Errors raised by the shell core.
#[derive(Debug, Clone, Error)]
pub enum ShellError {
    #[error("{0}")]
    TypeMismatch(String),

    #[error("{0}")]
    UnknownMember(String),

    #[error("{0}")]
    ArgumentError(String),

    #[error("{0}")]
    InvalidCallOrder(String),

    #[error("{0}")]
    UnboundParameter(String),

    #[error("{0}")]
    UriParseError(String),

    #[error("MySQL Error ({code}) [{sqlstate}]: {message}")]
    SqlError {
        code: u32,
        sqlstate: String,
        message: String,
    },

    #[error("{0}")]
    SessionClosed(String),

    #[error("{0}")]
    ResultShapeError(String),

    #[error("{0}")]
    ResultLeak(String),

    #[error("{0}")]
    Interrupted(String),

    #[error("{0}")]
    ProtocolError(String),

    #[error("{0}")]
    Internal(String),
}

impl ShellError {
    /// Stable kind tag, preserved by the runtime adapters.
    pub fn kind(&self) -> &'static str {
        match self {
            ShellError::TypeMismatch(_) => "TypeMismatch",
            ShellError::UnknownMember(_) => "UnknownMember",
            ShellError::ArgumentError(_) => "ArgumentError",
            ShellError::InvalidCallOrder(_) => "InvalidCallOrder",
            ShellError::UnboundParameter(_) => "UnboundParameter",
            ShellError::UriParseError(_) => "UriParseError",
            ShellError::SqlError { .. } => "SqlError",
            ShellError::SessionClosed(_) => "SessionClosed",
            ShellError::ResultShapeError(_) => "ResultShapeError",
            ShellError::ResultLeak(_) => "ResultLeak",
            ShellError::Interrupted(_) => "Interrupted",
            ShellError::ProtocolError(_) => "ProtocolError",
            ShellError::Internal(_) => "Internal",
        }
    }

    /// `"<API>: <message>"` argument error.
    pub fn argument(api: &str, message: impl AsRef<str>) -> Self {
        ShellError::ArgumentError(format!("{}: {}", api, message.as_ref()))
    }

    /// `"<API>: Argument #N is expected to be a <kind>"`.
    pub fn argument_kind(api: &str, position: usize, kind: &str) -> Self {
        ShellError::ArgumentError(format!(
            "{}: Argument #{} is expected to be a {}",
            api, position, kind
        ))
    }

    /// `"Invalid number of arguments in <API>, expected M but got K"`.
    pub fn argument_count(api: &str, expected: usize, got: usize) -> Self {
        ShellError::ArgumentError(format!(
            "Invalid number of arguments in {}, expected {} but got {}",
            api, expected, got
        ))
    }

    /// `"Invalid number of arguments in <API>, expected M to N but got K"`.
    pub fn argument_count_range(api: &str, min: usize, max: usize, got: usize) -> Self {
        ShellError::ArgumentError(format!(
            "Invalid number of arguments in {}, expected {} to {} but got {}",
            api, min, max, got
        ))
    }

    /// Typecast failure for the typed `Value` accessors.
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        ShellError::TypeMismatch(format!(
            "Invalid typecast: {} expected, but value is {}",
            expected, actual
        ))
    }

    /// Read or call of a member the object does not expose.
    pub fn unknown_member(class_name: &str, member: &str) -> Self {
        ShellError::UnknownMember(format!(
            "Invalid member {} on object of class {}",
            member, class_name
        ))
    }

    pub fn session_closed(api: &str) -> Self {
        ShellError::SessionClosed(format!("{}: The session is closed", api))
    }

    pub fn sql(code: u32, sqlstate: impl Into<String>, message: impl Into<String>) -> Self {
        ShellError::SqlError {
            code,
            sqlstate: sqlstate.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_message_formats() {
        let err = ShellError::argument_kind("mysqlx.expr", 1, "string");
        assert_eq!(
            err.to_string(),
            "mysqlx.expr: Argument #1 is expected to be a string"
        );

        let err = ShellError::argument_count("mysqlx.expr", 1, 0);
        assert_eq!(
            err.to_string(),
            "Invalid number of arguments in mysqlx.expr, expected 1 but got 0"
        );

        let err = ShellError::argument_count_range("ClassicSession.sql", 1, 2, 4);
        assert_eq!(
            err.to_string(),
            "Invalid number of arguments in ClassicSession.sql, expected 1 to 2 but got 4"
        );
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(ShellError::argument("x", "y").kind(), "ArgumentError");
        assert_eq!(ShellError::sql(1049, "42000", "Unknown database").kind(), "SqlError");
        assert_eq!(ShellError::session_closed("Session.sql").kind(), "SessionClosed");
    }
}
