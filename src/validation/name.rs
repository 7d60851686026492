//! Virtual machine name rules and availability.
//!
//! Every entry point answers with a [`NameCheck`]; callers never see a bare
//! boolean for one question and a structured result for another.

use serde::Serialize;

use crate::provider::{GatewayError, ProvisioningGateway};

pub const MAX_NAME_LEN: usize = 64;

/// Why a name fails the platform grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameViolation {
    #[error("name must not be empty")]
    Empty,
    #[error("name is {0} characters long (max {MAX_NAME_LEN})")]
    TooLong(usize),
    #[error("name must not start with a hyphen")]
    LeadingHyphen,
    #[error("name must not end with a hyphen")]
    TrailingHyphen,
    #[error("name contains invalid character {0:?} (allowed: ASCII letters, digits, hyphen)")]
    InvalidCharacter(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameCheck {
    Valid,
    Invalid(NameViolation),
    /// Well-formed, but a VM by that name already exists.
    Taken,
}

impl NameCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, NameCheck::Valid)
    }

    /// Human readable explanation, empty when valid.
    pub fn message(&self) -> String {
        match self {
            NameCheck::Valid => String::new(),
            NameCheck::Invalid(violation) => violation.to_string(),
            NameCheck::Taken => "name is already in use".to_string(),
        }
    }
}

/// Wire shape of a name check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    #[serde(rename = "valid")]
    pub is_valid: bool,
    pub message: String,
}

impl From<&NameCheck> for ValidationResult {
    fn from(check: &NameCheck) -> Self {
        Self {
            is_valid: check.is_valid(),
            message: check.message(),
        }
    }
}

/// Grammar check: 1..=64 chars of `[A-Za-z0-9-]`, no hyphen at either end.
/// Pure, never touches the network.
pub fn check_syntax(name: &str) -> NameCheck {
    match grammar_violation(name) {
        Some(violation) => NameCheck::Invalid(violation),
        None => NameCheck::Valid,
    }
}

pub fn is_syntactically_valid(name: &str) -> bool {
    check_syntax(name).is_valid()
}

fn grammar_violation(name: &str) -> Option<NameViolation> {
    if name.is_empty() {
        return Some(NameViolation::Empty);
    }

    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Some(NameViolation::TooLong(len));
    }

    if let Some(c) = name.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
        return Some(NameViolation::InvalidCharacter(c));
    }

    if name.starts_with('-') {
        return Some(NameViolation::LeadingHyphen);
    }
    if name.ends_with('-') {
        return Some(NameViolation::TrailingHyphen);
    }

    None
}

/// Syntax first, then a live lookup in `resource_group`.
///
/// A lookup failure is returned as an error and never folded into
/// [`NameCheck::Taken`] or [`NameCheck::Valid`].
pub async fn check_availability(
    gateway: &dyn ProvisioningGateway,
    resource_group: &str,
    name: &str,
) -> Result<NameCheck, GatewayError> {
    let syntax = check_syntax(name);
    if !syntax.is_valid() {
        return Ok(syntax);
    }

    match gateway.lookup_vm(resource_group, name).await? {
        Some(existing) => {
            tracing::debug!(%resource_group, name, id = %existing.id, "name already taken");
            Ok(NameCheck::Taken)
        }
        None => Ok(NameCheck::Valid),
    }
}
