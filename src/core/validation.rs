//! Request payload validation
//!
//! Payloads are validated field by field before any business logic runs. The
//! first failing rule wins and its message is what the client sees, worded in
//! the `"field" is required` style the SPA already displays.

use serde_json::{Map, Value};

/// Maximum length for account identifiers (national ID numbers fit easily)
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Bcrypt only looks at the first 72 bytes of a password
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Maximum length for the display name
pub const MAX_NAME_LENGTH: usize = 255;

/// Name of the cookie carrying the refresh token
pub const REFRESH_TOKEN_FIELD: &str = "refreshToken";

/// Validation error types
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Payload is not a JSON object
    NotAnObject,
    /// Payload could not be parsed at all
    Malformed(String),
    /// Required field missing
    Required { field: &'static str },
    /// Field present but not a string
    NotAString { field: &'static str },
    /// Field present but empty
    Empty { field: &'static str },
    /// Field longer than allowed
    TooLong { field: &'static str, max: usize },
    /// Field contains characters outside the allowed set
    InvalidCharacters { field: &'static str },
    /// Field is not shaped like a JWT
    InvalidToken { field: &'static str },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NotAnObject => write!(f, "\"value\" must be of type object"),
            ValidationError::Malformed(msg) => write!(f, "{}", msg),
            ValidationError::Required { field } => write!(f, "\"{}\" is required", field),
            ValidationError::NotAString { field } => write!(f, "\"{}\" must be a string", field),
            ValidationError::Empty { field } => {
                write!(f, "\"{}\" is not allowed to be empty", field)
            }
            ValidationError::TooLong { field, max } => write!(
                f,
                "\"{}\" length must be less than or equal to {} characters long",
                field, max
            ),
            ValidationError::InvalidCharacters { field } => write!(
                f,
                "\"{}\" must only contain alpha-numeric characters, dots, dashes and underscores",
                field
            ),
            ValidationError::InvalidToken { field } => {
                write!(f, "\"{}\" must be a valid JWT", field)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// Validated Payloads
// ============================================================================

/// Validated registration payload
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub identifier: String,
    pub password: String,
    pub name: Option<String>,
}

/// Validated login payload
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

/// Validated logout payload
#[derive(Debug, Clone, PartialEq)]
pub struct LogoutTarget {
    pub identifier: String,
}

/// Validate `POST /auth/register`
pub fn validate_registration(payload: &Value) -> Result<Registration, ValidationError> {
    let fields = as_object(payload)?;
    Ok(Registration {
        identifier: identifier_field(fields)?,
        password: password_field(fields)?,
        name: optional_string(fields, "name", MAX_NAME_LENGTH)?,
    })
}

/// Validate `POST /auth/login`
pub fn validate_login(payload: &Value) -> Result<Credentials, ValidationError> {
    let fields = as_object(payload)?;
    Ok(Credentials {
        identifier: identifier_field(fields)?,
        password: password_field(fields)?,
    })
}

/// Validate `POST /auth/logout`
pub fn validate_logout(payload: &Value) -> Result<LogoutTarget, ValidationError> {
    let fields = as_object(payload)?;
    Ok(LogoutTarget {
        identifier: identifier_field(fields)?,
    })
}

/// Validate the refresh cookie value.
///
/// An absent or empty cookie is not a validation failure (`Ok(None)`): the
/// caller answers that with 401. A present value that cannot be a JWT is.
pub fn validate_refresh_cookie(value: Option<&str>) -> Result<Option<&str>, ValidationError> {
    let Some(token) = value.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    if !looks_like_jwt(token) {
        return Err(ValidationError::InvalidToken {
            field: REFRESH_TOKEN_FIELD,
        });
    }

    Ok(Some(token))
}

/// Three non-empty base64url segments separated by dots
pub fn looks_like_jwt(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

// ============================================================================
// Field Rules
// ============================================================================

fn as_object(payload: &Value) -> Result<&Map<String, Value>, ValidationError> {
    payload.as_object().ok_or(ValidationError::NotAnObject)
}

/// `identifier` (legacy key `nik` accepted)
fn identifier_field(fields: &Map<String, Value>) -> Result<String, ValidationError> {
    let raw = fields.get("identifier").or_else(|| fields.get("nik"));
    let identifier = required_string(raw, "identifier")?.trim().to_string();

    if identifier.is_empty() {
        return Err(ValidationError::Empty {
            field: "identifier",
        });
    }
    if identifier.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            field: "identifier",
            max: MAX_IDENTIFIER_LENGTH,
        });
    }
    if !identifier
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidCharacters {
            field: "identifier",
        });
    }

    Ok(identifier)
}

fn password_field(fields: &Map<String, Value>) -> Result<String, ValidationError> {
    let password = required_string(fields.get("password"), "password")?;

    if password.is_empty() {
        return Err(ValidationError::Empty { field: "password" });
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::TooLong {
            field: "password",
            max: MAX_PASSWORD_BYTES,
        });
    }

    Ok(password.to_string())
}

fn required_string<'a>(
    value: Option<&'a Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::Required { field }),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ValidationError::NotAString { field }),
    }
}

fn optional_string(
    fields: &Map<String, Value>,
    field: &'static str,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.chars().count() > max {
                return Err(ValidationError::TooLong { field, max });
            }
            Ok(Some(trimmed.to_string()).filter(|s| !s.is_empty()))
        }
        Some(_) => Err(ValidationError::NotAString { field }),
    }
}
