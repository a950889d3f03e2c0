//! Core error types for form-designer.
//!
//! [`FormDesignerError`] covers request errors, storage errors, validation
//! errors, configuration errors, template errors and mail transport errors.
//! Every variant maps onto an HTTP status code so the server layer can turn
//! any failure into a response.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Represents a validation error with optional field-level errors.
///
/// Validation errors can be either simple (a single message) or compound
/// (containing per-field error lists). The admin layer uses the compound form
/// to report which field definition is misconfigured.
///
/// # Examples
///
/// ```
/// use form_designer_core::error::ValidationError;
///
/// let err = ValidationError::new("This field is required.", "required");
/// assert_eq!(err.to_string(), "This field is required.");
///
/// let mut field_errors = std::collections::BTreeMap::new();
/// field_errors.insert(
///     "regex".to_string(),
///     vec![ValidationError::new("This field class requires a regular expression.", "required")],
/// );
/// let err = ValidationError::with_field_errors(field_errors);
/// assert!(err.to_string().starts_with("regex:"));
/// ```
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The primary error message.
    pub message: String,
    /// A short code identifying the type of validation failure (e.g. "required", "invalid").
    pub code: String,
    /// Per-field validation errors, keyed by field name.
    pub field_errors: BTreeMap<String, Vec<Self>>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            field_errors: BTreeMap::new(),
        }
    }

    /// Creates a `ValidationError` containing per-field errors.
    pub fn with_field_errors(field_errors: BTreeMap<String, Vec<Self>>) -> Self {
        Self {
            message: String::new(),
            code: String::new(),
            field_errors,
        }
    }

    /// Flattens the per-field errors into plain messages, keyed by field name.
    pub fn messages_by_field(&self) -> BTreeMap<String, Vec<String>> {
        self.field_errors
            .iter()
            .map(|(field, errors)| {
                (
                    field.clone(),
                    errors.iter().map(ToString::to_string).collect(),
                )
            })
            .collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.message.is_empty() {
            write!(f, "{}", self.message)?;
        } else if !self.field_errors.is_empty() {
            let mut first = true;
            for (field, errors) in &self.field_errors {
                for error in errors {
                    if !first {
                        write!(f, "; ")?;
                    }
                    write!(f, "{field}: {error}")?;
                    first = false;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for form-designer.
///
/// Each variant maps to an HTTP status code via [`FormDesignerError::status_code`].
#[derive(Error, Debug)]
pub enum FormDesignerError {
    // ── HTTP errors ──────────────────────────────────────────────────

    /// HTTP 400 Bad Request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 405 Method Not Allowed.
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// HTTP 500 Internal Server Error.
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    // ── Storage errors ───────────────────────────────────────────────

    /// Raised when a lookup expected exactly one record but found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// A generic database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A database integrity constraint was violated (e.g. duplicate form name).
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// An operational database error (connection failure, etc.).
    #[error("Operational error: {0}")]
    OperationalError(String),

    // ── Validation ───────────────────────────────────────────────────

    /// One or more fields failed validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A stored definition cannot be turned into a working form.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Templates ────────────────────────────────────────────────────

    /// A template contains invalid syntax.
    #[error("Template syntax error: {0}")]
    TemplateSyntaxError(String),

    /// The requested template was not found.
    #[error("Template does not exist: {0}")]
    TemplateDoesNotExist(String),

    // ── Mail ─────────────────────────────────────────────────────────

    /// The mail transport rejected or failed to deliver a message.
    #[error("Mail error: {0}")]
    MailError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FormDesignerError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `BadRequest`, `ValidationError` -> 400
    /// - `NotFound`, `DoesNotExist` -> 404
    /// - `MethodNotAllowed` -> 405
    /// - `IntegrityError` -> 409
    /// - `MailError` -> 502
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::ValidationError(_) => 400,
            Self::NotFound(_) | Self::DoesNotExist(_) => 404,
            Self::MethodNotAllowed(_) => 405,
            Self::IntegrityError(_) => 409,
            Self::MailError(_) => 502,
            Self::InternalServerError(_)
            | Self::DatabaseError(_)
            | Self::OperationalError(_)
            | Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::TemplateSyntaxError(_)
            | Self::TemplateDoesNotExist(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => 500,
        }
    }
}

impl From<serde_json::Error> for FormDesignerError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<ValidationError> for FormDesignerError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

/// A convenience type alias for `Result<T, FormDesignerError>`.
pub type FormDesignerResult<T> = Result<T, FormDesignerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_simple() {
        let err = ValidationError::new("This field is required.", "required");
        assert_eq!(err.to_string(), "This field is required.");
    }

    #[test]
    fn test_validation_error_display_field_errors() {
        let mut field_errors = BTreeMap::new();
        field_errors.insert(
            "choice_model".to_string(),
            vec![ValidationError::new("This field class requires a model.", "required")],
        );
        let err = ValidationError::with_field_errors(field_errors);
        assert_eq!(
            err.to_string(),
            "choice_model: This field class requires a model."
        );
    }

    #[test]
    fn test_messages_by_field() {
        let mut field_errors = BTreeMap::new();
        field_errors.insert(
            "regex".to_string(),
            vec![ValidationError::new("missing", "required")],
        );
        let err = ValidationError::with_field_errors(field_errors);
        let messages = err.messages_by_field();
        assert_eq!(messages["regex"], vec!["missing".to_string()]);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(FormDesignerError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(FormDesignerError::NotFound("x".into()).status_code(), 404);
        assert_eq!(FormDesignerError::DoesNotExist("x".into()).status_code(), 404);
        assert_eq!(
            FormDesignerError::MethodNotAllowed("x".into()).status_code(),
            405
        );
        assert_eq!(FormDesignerError::IntegrityError("x".into()).status_code(), 409);
        assert_eq!(FormDesignerError::MailError("x".into()).status_code(), 502);
        assert_eq!(
            FormDesignerError::ValidationError(ValidationError::new("x", "y")).status_code(),
            400
        );
        assert_eq!(
            FormDesignerError::TemplateSyntaxError("x".into()).status_code(),
            500
        );
        assert_eq!(
            FormDesignerError::ImproperlyConfigured("x".into()).status_code(),
            500
        );
    }

    #[test]
    fn test_error_display() {
        let err = FormDesignerError::NotFound("contact".into());
        assert_eq!(err.to_string(), "Not found: contact");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: FormDesignerError = io_err.into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: FormDesignerError = json_err.into();
        assert!(matches!(err, FormDesignerError::SerializationError(_)));
    }
}
