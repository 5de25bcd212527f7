// crates/xmlbind/src/validate.rs

//! The seam towards the validation layer.
//!
//! Decoding ends with a name→raw-value `Record`. Before the record is coerced
//! into a typed model it passes through the model's field validators, which
//! receive the caller's opaque context exactly as it was handed to
//! [`from_xml`](crate::from_xml).

use crate::value::{Record, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque, caller-supplied validation context.
pub type Context<'a> = Option<&'a dyn Any>;

/// A user validator for one field: receives the raw value, returns the
/// (possibly rewritten) raw value or a validation error.
pub type FieldValidator =
    Arc<dyn Fn(Value, &ValidationInfo<'_>) -> Result<Value, ValidationError> + Send + Sync>;

/// What a validator gets to see besides the value itself.
#[derive(Clone, Copy)]
pub struct ValidationInfo<'a> {
    /// Root tag of the model being validated.
    pub model: &'a str,
    /// Name of the field being validated.
    pub field: &'a str,
    /// The context passed to the document-level decode call.
    pub context: Context<'a>,
}

impl<'a> ValidationInfo<'a> {
    /// Downcasts the context to a concrete type.
    pub fn context_as<T: Any>(&self) -> Option<&'a T> {
        self.context.and_then(|ctx| ctx.downcast_ref::<T>())
    }
}

impl fmt::Debug for ValidationInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationInfo")
            .field("model", &self.model)
            .field("field", &self.field)
            .field(
                "context",
                &if self.context.is_some() {
                    "Some(<Context>)"
                } else {
                    "None"
                },
            )
            .finish()
    }
}

/// A type-coercion or validator failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    field: Option<String>,
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// The field the error was raised for, when known.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn or_field(mut self, field: &str) -> Self {
        if self.field.is_none() {
            self.field = Some(field.to_string());
        }
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "validation error for field `{}`: {}", field, self.message),
            None => write!(f, "validation error: {}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

impl serde::de::Error for ValidationError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ValidationError::new(msg.to_string())
    }
}

impl serde::ser::Error for ValidationError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ValidationError::new(msg.to_string())
    }
}

/// Runs `validators` in declaration order over the fields present in `record`.
///
/// Fields missing from the record (computed fields, for instance) are not
/// validated here.
pub(crate) fn run_validators(
    model: &str,
    validators: &[(String, FieldValidator)],
    record: &mut Record,
    context: Context<'_>,
) -> Result<(), ValidationError> {
    for (field, validator) in validators {
        let Some(value) = record.remove(field) else {
            continue;
        };
        let info = ValidationInfo {
            model,
            field,
            context,
        };
        let validated = validator(value, &info).map_err(|e| e.or_field(field))?;
        record.insert(field.clone(), validated);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper() -> FieldValidator {
        Arc::new(|value: Value, _info: &ValidationInfo<'_>| match value {
            Value::Text(s) => Ok(Value::Text(s.to_uppercase())),
            other => Ok(other),
        })
    }

    #[test]
    fn test_validators_rewrite_present_fields_only() {
        let validators = vec![("name".to_string(), upper()), ("missing".to_string(), upper())];
        let mut record = Record::new();
        record.insert("name".to_string(), Value::from("abc"));

        run_validators("model", &validators, &mut record, None).unwrap();

        assert_eq!(record.get("name"), Some(&Value::from("ABC")));
        assert!(!record.contains_key("missing"));
    }

    #[test]
    fn test_validator_error_is_tagged_with_field() {
        let failing: FieldValidator = Arc::new(|_: Value, _: &ValidationInfo<'_>| {
            Err(ValidationError::new("too small"))
        });
        let validators = vec![("count".to_string(), failing)];
        let mut record = Record::new();
        record.insert("count".to_string(), Value::from("0"));

        let err = run_validators("model", &validators, &mut record, None).unwrap_err();
        assert_eq!(err.field(), Some("count"));
        assert_eq!(err.to_string(), "validation error for field `count`: too small");
    }

    #[test]
    fn test_context_downcast() {
        let ctx: u32 = 7;
        let info = ValidationInfo {
            model: "m",
            field: "f",
            context: Some(&ctx),
        };
        assert_eq!(info.context_as::<u32>(), Some(&7));
        assert_eq!(info.context_as::<String>(), None);
    }
}
