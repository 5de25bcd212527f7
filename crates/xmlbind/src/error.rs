// crates/xmlbind/src/error.rs

use crate::validate::ValidationError;
use std::fmt;

/// Structural failures found while decoding a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    /// The document root does not carry the model's tag and namespace.
    RootNotFound { actual: String, expected: String },

    /// A field without default is absent from the document.
    MissingField { path: String },

    /// Under strict search mode, a node appeared where another was expected,
    /// or was left over once every field had been matched (`expected: None`).
    UnexpectedElement {
        path: String,
        actual: String,
        expected: Option<String>,
    },

    /// The underlying XML reader rejected the input.
    MalformedDocument { reason: String },

    /// A namespace prefix is not declared in any enclosing namespace map.
    UnknownPrefix { prefix: String },
}

impl ParsingError {
    pub(crate) fn malformed(reason: impl fmt::Display) -> Self {
        ParsingError::MalformedDocument {
            reason: reason.to_string(),
        }
    }
}

impl From<quick_xml::Error> for ParsingError {
    fn from(e: quick_xml::Error) -> Self {
        ParsingError::malformed(e)
    }
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsingError::RootNotFound { actual, expected } => write!(
                f,
                "root element not found (actual: {}, expected: {})",
                actual, expected
            ),
            ParsingError::MissingField { path } => {
                write!(f, "missing required field `{}`", path)
            }
            ParsingError::UnexpectedElement {
                path,
                actual,
                expected,
            } => write!(
                f,
                "unexpected element at `{}` (actual: {}, expected: {})",
                path,
                actual,
                expected.as_deref().unwrap_or("end of element")
            ),
            ParsingError::MalformedDocument { reason } => {
                write!(f, "malformed document: {}", reason)
            }
            ParsingError::UnknownPrefix { prefix } => {
                write!(f, "namespace prefix `{}` is not declared", prefix)
            }
        }
    }
}

impl std::error::Error for ParsingError {}

/// Failures while turning a model instance into a document.
#[derive(Debug)]
pub enum EncodeError {
    /// A field without default has no value and elision is off.
    MissingValue { path: String },

    /// The instance's raw value does not have the shape the binding requires.
    UnexpectedShape {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A default-factory failed while filling in a missing value.
    DefaultFailed { path: String, reason: String },

    /// A namespace prefix is not declared in any enclosing namespace map.
    UnknownPrefix { prefix: String },

    /// Only UTF-8 output is produced.
    UnsupportedEncoding { encoding: String },

    /// An error from the underlying `quick-xml` writer.
    XmlWriting(quick_xml::Error),

    /// An I/O error while writing the document.
    Io(std::io::Error),
}

impl From<quick_xml::Error> for EncodeError {
    fn from(e: quick_xml::Error) -> Self {
        EncodeError::XmlWriting(e)
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> Self {
        EncodeError::Io(e)
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::MissingValue { path } => {
                write!(f, "field `{}` has no value and no default", path)
            }
            EncodeError::UnexpectedShape {
                path,
                expected,
                actual,
            } => write!(
                f,
                "field `{}` expected a {} value, got {}",
                path, expected, actual
            ),
            EncodeError::DefaultFailed { path, reason } => {
                write!(f, "default for field `{}` failed: {}", path, reason)
            }
            EncodeError::UnknownPrefix { prefix } => {
                write!(f, "namespace prefix `{}` is not declared", prefix)
            }
            EncodeError::UnsupportedEncoding { encoding } => {
                write!(f, "unsupported output encoding: {}", encoding)
            }
            EncodeError::XmlWriting(e) => write!(f, "XML writing error: {}", e),
            EncodeError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::XmlWriting(e) => Some(e),
            EncodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Mistakes in a model declaration, reported when the binding is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// More than one `text` field was declared.
    DuplicateText {
        model: String,
        first: String,
        second: String,
    },

    /// A nested model was attached to a field kind that cannot carry one.
    ModelOnNonElement { field: String },

    /// A collection adapter was applied to a kind that does not support it.
    UnsupportedAdapter {
        field: String,
        adapter: &'static str,
        kind: &'static str,
    },

    /// A wrapped or computed field has an inner binding of the wrong kind.
    UnsupportedInner { field: String, kind: &'static str },

    /// A fixed tuple must hold at least one item.
    EmptyTuple { field: String },

    /// A wrapper path must name at least one non-empty tag.
    EmptyWrapperPath { field: String },

    /// A literal default could not be converted into a raw value.
    InvalidDefault { field: String, reason: String },

    /// A validator was registered for a field the model does not declare.
    UnknownField { model: String, field: String },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::DuplicateText {
                model,
                first,
                second,
            } => write!(
                f,
                "model `{}` declares more than one text field (`{}` and `{}`)",
                model, first, second
            ),
            BindingError::ModelOnNonElement { field } => write!(
                f,
                "field `{}` carries a nested model but is not an element",
                field
            ),
            BindingError::UnsupportedAdapter {
                field,
                adapter,
                kind,
            } => write!(
                f,
                "field `{}`: {} adapter is not supported on {} fields",
                field, adapter, kind
            ),
            BindingError::UnsupportedInner { field, kind } => write!(
                f,
                "field `{}`: {} is not a valid inner binding",
                field, kind
            ),
            BindingError::EmptyTuple { field } => {
                write!(f, "field `{}`: a tuple needs at least one item", field)
            }
            BindingError::EmptyWrapperPath { field } => {
                write!(f, "field `{}`: wrapper path is empty", field)
            }
            BindingError::InvalidDefault { field, reason } => {
                write!(f, "field `{}`: invalid default: {}", field, reason)
            }
            BindingError::UnknownField { model, field } => write!(
                f,
                "model `{}` has a validator for unknown field `{}`",
                model, field
            ),
        }
    }
}

impl std::error::Error for BindingError {}

/// Errors returned by the document-level entry points.
#[derive(Debug)]
pub enum Error {
    /// The document does not structurally match the model.
    Parsing(ParsingError),

    /// A validator or the type-coercion layer rejected a value. Passed
    /// through exactly as raised.
    Validation(ValidationError),

    /// The instance could not be written as a document.
    Encode(EncodeError),
}

impl From<ParsingError> for Error {
    fn from(e: ParsingError) -> Self {
        Error::Parsing(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Error::Encode(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parsing(e) => write!(f, "{}", e),
            Error::Validation(e) => write!(f, "{}", e),
            Error::Encode(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parsing(e) => Some(e),
            Error::Validation(e) => Some(e),
            Error::Encode(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_not_found_message() {
        let err = ParsingError::RootNotFound {
            actual: "model1".to_string(),
            expected: "model".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "root element not found (actual: model1, expected: model)"
        );
    }

    #[test]
    fn test_leftover_message() {
        let err = ParsingError::UnexpectedElement {
            path: "model".to_string(),
            actual: "extra".to_string(),
            expected: None,
        };
        assert_eq!(
            err.to_string(),
            "unexpected element at `model` (actual: extra, expected: end of element)"
        );
    }

    #[test]
    fn test_from_xml_error() {
        let xml_err = quick_xml::Error::from(std::io::Error::other("boom"));
        let err: ParsingError = xml_err.into();
        assert!(matches!(err, ParsingError::MalformedDocument { .. }));
    }

    #[test]
    fn test_validation_error_passes_through() {
        let err: Error = ValidationError::for_field("attr1", "bad").into();
        match err {
            Error::Validation(inner) => assert_eq!(inner.field(), Some("attr1")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_encode_error_source() {
        use std::error::Error as _;
        let err = EncodeError::from(std::io::Error::other("disk"));
        assert!(err.source().is_some());
        assert!(EncodeError::MissingValue { path: "a".into() }.source().is_none());
    }
}
