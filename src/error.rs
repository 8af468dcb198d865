use std::fmt;

/// All errors produced by getdates.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecurrenceError {
    /// The configuration handed to a generator is malformed.
    Config { message: String },

    /// A textual input (date or weekday name) could not be understood.
    Parse { message: String, input: String },

    /// Date arithmetic left the supported calendar range.
    Range { message: String },
}

impl fmt::Display for RecurrenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message } => write!(f, "{message}"),
            Self::Parse { message, .. } => write!(f, "{message}"),
            Self::Range { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for RecurrenceError {}

impl RecurrenceError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>, input: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            input: input.into(),
        }
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::Range {
            message: message.into(),
        }
    }

    /// Format the error for terminal output, quoting the offending input if any.
    pub fn display_rich(&self) -> String {
        match self {
            Self::Parse { message, input } => format!("error: {message}\n  input: \"{input}\""),
            Self::Config { message } => format!("error: {message}"),
            Self::Range { message } => format!("error: {message}"),
        }
    }
}

impl From<jiff::Error> for RecurrenceError {
    fn from(e: jiff::Error) -> Self {
        Self::range(format!("date out of range: {e}"))
    }
}
