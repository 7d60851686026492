//! Turns an untrusted JSON object into a [`ProvisioningRequest`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::name::check_syntax;
use super::NameCheck;
use crate::cloud::{ProvisioningRequest, Secret};
use crate::config::KnownLocations;

pub const REQUIRED_FIELDS: [&str; 6] = [
    "name",
    "size",
    "image",
    "adminUsername",
    "adminPassword",
    "location",
];

/// Machine-readable reason a request was turned away before reaching the
/// provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionCode {
    MissingField,
    InvalidType,
    InvalidName,
    UnknownLocation,
    UnknownSize,
    UnknownImage,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    code: RejectionCode,
    field: &'static str,
    message: String,
}

impl Rejection {
    pub fn new(code: RejectionCode, field: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            field,
            message: message.into(),
        }
    }

    pub fn code(&self) -> RejectionCode {
        self.code
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn unknown_location(location: &str) -> Self {
        Self::new(
            RejectionCode::UnknownLocation,
            "location",
            format!("location '{location}' is not recognized"),
        )
    }
}

/// Checks run in order and stop at the first failure: every required field
/// present, every field a string, the name grammar, then the location.
///
/// `null` and `""` count as missing. Values are copied verbatim, nothing is
/// trimmed or case-folded.
pub fn normalize(
    payload: &Map<String, Value>,
    locations: &KnownLocations,
) -> Result<ProvisioningRequest, Rejection> {
    if let Some(&missing) = REQUIRED_FIELDS.iter().find(|f| is_missing(payload.get(**f))) {
        return Err(Rejection::new(
            RejectionCode::MissingField,
            missing,
            format!("field '{missing}' is required"),
        ));
    }

    let request = ProvisioningRequest {
        name: string_field(payload, "name")?,
        size: string_field(payload, "size")?,
        image: string_field(payload, "image")?,
        admin_username: string_field(payload, "adminUsername")?,
        admin_password: Secret::new(string_field(payload, "adminPassword")?),
        location: string_field(payload, "location")?,
    };

    if let NameCheck::Invalid(violation) = check_syntax(&request.name) {
        return Err(Rejection::new(
            RejectionCode::InvalidName,
            "name",
            violation.to_string(),
        ));
    }

    if !locations.contains(&request.location) {
        return Err(Rejection::unknown_location(&request.location));
    }

    Ok(request)
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn string_field(payload: &Map<String, Value>, field: &'static str) -> Result<String, Rejection> {
    match payload.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(Rejection::new(
            RejectionCode::InvalidType,
            field,
            format!("field '{field}' must be a string, got {}", json_kind(other)),
        )),
        None => Err(Rejection::new(
            RejectionCode::MissingField,
            field,
            format!("field '{field}' is required"),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
