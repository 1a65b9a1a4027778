use colored::Colorize;
use std::{error, fmt, io};

use crate::scan::ParseError;
use crate::tag::TagParseError;

/// Boxed error returned by user supplied conversion functions
pub type BoxError = Box<dyn error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while looking up, decoding or encoding values
#[derive(Debug)]
pub enum Error {
    /// A lookup found no value for the key
    NotFound { key: String },
    /// A tag contained unsupported options
    Tag(TagParseError),
    /// Variable replacement resolved a key back to itself
    CircularDependency { key: String, chain: Vec<String> },
    /// The value handed to a decoder or encoder is not a struct
    StructExpected { type_name: &'static str },
    /// No conversion is registered for the field's type
    UnsupportedType { key: String, type_name: &'static str },
    /// A raw value could not be converted into the field's type
    Unmarshal {
        key: String,
        value: String,
        source: BoxError,
    },
    /// A field value could not be converted into text
    Marshal { key: String, source: BoxError },
    /// A line of env formatted text is malformed
    Parse(ParseError),
    Io(io::Error),
}

impl Error {
    pub(crate) fn not_found(key: impl Into<String>) -> Self {
        Error::NotFound { key: key.into() }
    }

    /// Reports whether the error only means a key has no value
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Reports whether the error is a circular dependency between variables
    pub fn is_circular_dependency(&self) -> bool {
        matches!(self, Error::CircularDependency { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound { key } => write!(f, "{}: not found", key.magenta().bold()),
            Error::Tag(err) => write!(f, "{}", err),
            Error::CircularDependency { key, chain } => write!(
                f,
                "{}: circular dependency ({})",
                key.magenta().bold(),
                chain.join(" -> ")
            ),
            Error::StructExpected { type_name } => {
                write!(f, "expected a struct, got `{}`", type_name)
            }
            Error::UnsupportedType { key, type_name } => write!(
                f,
                "{}: type `{}` is unsupported",
                key.magenta().bold(),
                type_name
            ),
            Error::Unmarshal { key, value, source } => write!(
                f,
                "{}: Invalid value {}: {}",
                key.magenta().bold(),
                format!("'{}'", value).red(),
                source
            ),
            Error::Marshal { key, source } => {
                write!(f, "{}: cannot encode value: {}", key.magenta().bold(), source)
            }
            Error::Parse(err) => write!(f, "{}", err),
            Error::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Tag(err) => Some(err),
            Error::Unmarshal { source, .. } | Error::Marshal { source, .. } => Some(source.as_ref()),
            Error::Parse(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}

impl From<TagParseError> for Error {
    fn from(err: TagParseError) -> Self {
        Error::Tag(err)
    }
}

/// Helper to format a loading error into a panic message
pub fn format_error(err: &Error) -> String {
    format!(
        "Configuration failed to load:\n  - {}",
        err.to_string().yellow().bold()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_predicate() {
        let err = Error::not_found("FOO");
        assert!(err.is_not_found());
        assert!(!err.is_circular_dependency());
    }

    #[test]
    fn test_circular_dependency_display() {
        colored::control::set_override(false);

        let err = Error::CircularDependency {
            key: "foo".to_string(),
            chain: vec!["foo".to_string(), "bar".to_string(), "foo".to_string()],
        };

        assert!(err.is_circular_dependency());
        assert_eq!(err.to_string(), "foo: circular dependency (foo -> bar -> foo)");
    }

    #[test]
    fn test_unmarshal_display_and_source() {
        colored::control::set_override(false);

        let source = "abc".parse::<u16>().unwrap_err();
        let err = Error::Unmarshal {
            key: "PORT".to_string(),
            value: "abc".to_string(),
            source: Box::new(source),
        };

        let output = err.to_string();
        assert!(output.contains("PORT"));
        assert!(output.contains("Invalid value 'abc'"));
        assert!(error::Error::source(&err).is_some());
    }

    #[test]
    fn test_unsupported_type_display() {
        colored::control::set_override(false);

        let err = Error::UnsupportedType {
            key: "HOOK".to_string(),
            type_name: "Vec<u8>",
        };
        assert_eq!(err.to_string(), "HOOK: type `Vec<u8>` is unsupported");
    }

    #[test]
    fn test_format_error() {
        colored::control::set_override(false);

        let formatted = format_error(&Error::not_found("DATABASE_URL"));
        assert!(formatted.contains("Configuration failed to load"));
        assert!(formatted.contains("DATABASE_URL: not found"));
    }

    #[test]
    fn test_debug_format() {
        let err = Error::StructExpected { type_name: "u16" };

        let debug_output = format!("{:?}", err);
        assert!(debug_output.contains("StructExpected"));
        assert!(debug_output.contains("u16"));
    }
}
