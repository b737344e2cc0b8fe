use crate::outcome::{IssueType, Outcome};
use thiserror::Error;

/// Domain error types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HimsError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock for {medicine}: requested {requested}, available {available}")]
    InsufficientStock {
        medicine: String,
        requested: i32,
        available: i32,
    },

    #[error("Invalid status transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
}

impl HimsError {
    /// Shorthand for `HimsError::Invalid`
    pub fn invalid(msg: impl Into<String>) -> Self {
        HimsError::Invalid(msg.into())
    }

    /// Issue type reported to clients for this error
    pub fn issue_type(&self) -> IssueType {
        match self {
            HimsError::NotFound(_) => IssueType::NotFound,
            HimsError::Invalid(_) => IssueType::Invalid,
            HimsError::Conflict(_) => IssueType::Conflict,
            HimsError::InsufficientStock { .. } => IssueType::BusinessRule,
            HimsError::InvalidTransition { .. } => IssueType::BusinessRule,
        }
    }

    /// Convert into an error `Outcome` document
    pub fn to_outcome(&self) -> Outcome {
        Outcome::error(self.issue_type(), &self.to_string())
    }
}

/// Collects field-level problems and reports them as one `Invalid` error.
#[derive(Debug, Default)]
pub(crate) struct Violations(Vec<String>);

impl Violations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn check(&mut self, ok: bool, msg: impl Into<String>) {
        if !ok {
            self.0.push(msg.into());
        }
    }

    pub(crate) fn push(&mut self, msg: impl Into<String>) {
        self.0.push(msg.into());
    }

    pub(crate) fn finish(self) -> Result<(), HimsError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(HimsError::Invalid(self.0.join("; ")))
        }
    }
}

/// Trim a required text field and reject it when empty.
pub(crate) fn required(v: &mut Violations, field: &str, value: &str) -> String {
    let trimmed = value.trim();
    v.check(!trimmed.is_empty(), format!("{field} is required"));
    trimmed.to_string()
}

/// Trim an optional text field, mapping blank strings to `None`.
pub(crate) fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
