//! Describes configuration parsing errors

use std::{borrow::Cow, fmt};
use crate::error::Error;

/// A single validation failure within a configuration document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The field holds a value of an unsupported type
    InvalidType {
        /// Field name
        field: &'static str,
        /// Expected type name
        expected: &'static str,
    },
    /// The field holds a negative or non-integral number
    Negative {
        /// Field name
        field: &'static str,
    },
    /// The document as a whole could not be read
    Malformed(Cow<'static, str>),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::InvalidType { field, expected } => write!(f, "field:{field} error:should be of type {expected}"),
            FieldError::Negative { field } => write!(f, "field:{field} error:should be non-negative"),
            FieldError::Malformed(msg) => write!(f, "error:{msg}"),
        }
    }
}

/// All validation failures a parser found in one configuration document.
///
/// A document with any failure is rejected as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    context: &'static str,
    errors: Vec<FieldError>,
}

impl ConfigError {
    /// Creates an aggregate error for the parser named by `context`
    #[inline]
    pub fn new(context: &'static str, errors: Vec<FieldError>) -> Self {
        Self { context, errors }
    }

    /// Returns the name of the parser that produced the errors
    #[inline]
    pub fn context(&self) -> &'static str {
        self.context
    }

    /// Returns the individual field errors
    #[inline]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns `true` if any field error renders as `message`
    pub fn contains(&self, message: &str) -> bool {
        self.errors
            .iter()
            .any(|err| err.to_string().contains(message))
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [", self.context)?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        f.write_str("]")
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        let children = err.errors
            .iter()
            .map(|field| Error::new(field.to_string()))
            .collect();
        Error::from_vec(err.context, children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_formats_field_errors() {
        let wrong_type = FieldError::InvalidType { field: "maxRequestMessageBytes", expected: "number" };
        let negative = FieldError::Negative { field: "maxResponseMessageBytes" };

        assert_eq!(wrong_type.to_string(), "field:maxRequestMessageBytes error:should be of type number");
        assert_eq!(negative.to_string(), "field:maxResponseMessageBytes error:should be non-negative");
    }

    #[test]
    fn it_formats_aggregate() {
        let err = ConfigError::new("Message size parser", vec![
            FieldError::Negative { field: "a" },
            FieldError::Negative { field: "b" },
        ]);

        assert_eq!(
            err.to_string(),
            "Message size parser: [field:a error:should be non-negative; field:b error:should be non-negative]");
    }

    #[test]
    fn it_converts_into_error_with_children() {
        let err = ConfigError::new("Message size parser", vec![
            FieldError::Negative { field: "a" },
        ]);

        let err = Error::from(err);

        assert_eq!(err.message(), "Message size parser");
        assert_eq!(err.children().len(), 1);
        assert!(err.contains_message("field:a error:should be non-negative"));
    }
}
