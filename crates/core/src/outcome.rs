use serde::{Deserialize, Serialize};

/// Severity of the issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
}

/// Type of issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    Invalid,
    Required,
    Security,
    Login,
    Forbidden,
    Processing,
    NotSupported,
    Duplicate,
    NotFound,
    BusinessRule,
    Conflict,
    Transient,
    Exception,
    Throttled,
}

/// A single issue inside an `Outcome`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeIssue {
    pub severity: IssueSeverity,
    pub code: IssueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

/// Outcome document returned for errors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub resource_type: String,
    pub issue: Vec<OutcomeIssue>,
}

impl Outcome {
    fn single(severity: IssueSeverity, code: IssueType, msg: &str) -> Self {
        Self {
            resource_type: "Outcome".to_string(),
            issue: vec![OutcomeIssue {
                severity,
                code,
                diagnostics: Some(msg.to_string()),
            }],
        }
    }

    /// Error outcome with an explicit issue type
    pub fn error(code: IssueType, msg: &str) -> Self {
        Self::single(IssueSeverity::Error, code, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::error(IssueType::NotFound, msg)
    }

    pub fn invalid(msg: &str) -> Self {
        Self::error(IssueType::Invalid, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::error(IssueType::Conflict, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kebab_case_codes() {
        let outcome = Outcome::error(IssueType::BusinessRule, "stock exhausted");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["resourceType"], "Outcome");
        assert_eq!(json["issue"][0]["severity"], "error");
        assert_eq!(json["issue"][0]["code"], "business-rule");
        assert_eq!(json["issue"][0]["diagnostics"], "stock exhausted");
    }
}
