use serde::{Deserialize, Serialize};

/// Service description served at `/metadata`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetadata {
    pub name: String,
    pub version: String,
    pub status: String,
    pub format: Vec<String>,
    pub modules: Vec<ModuleInfo>,
}

impl ServiceMetadata {
    /// Describe this build of the service
    pub fn new() -> Self {
        Self {
            name: "hims".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "active".to_string(),
            format: vec!["json".to_string()],
            modules: vec![
                ModuleInfo::new("patients", "/api/patients", &["register", "read", "update", "search"]),
                ModuleInfo::new("appointments", "/api/appointments", &["create", "read", "search", "status"]),
                ModuleInfo::new("prescriptions", "/api/prescriptions", &["create", "read"]),
                ModuleInfo::new(
                    "admissions",
                    "/api/admissions",
                    &["admit", "read", "search", "charge", "note", "surgery", "discharge", "invoice"],
                ),
                ModuleInfo::new("medicines", "/api/medicines", &["create", "read", "search", "restock"]),
                ModuleInfo::new("pharmacy", "/api/pharmacy/invoices", &["checkout", "read"]),
                ModuleInfo::new("lab", "/api/lab/requests", &["create", "read", "worklist", "status"]),
                ModuleInfo::new("ledger", "/api/ledger", &["append", "search", "summary"]),
            ],
        }
    }
}

impl Default for ServiceMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// One functional module exposed by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub path: String,
    pub operations: Vec<String>,
}

impl ModuleInfo {
    fn new(name: &str, path: &str, operations: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            operations: operations.iter().map(|op| op.to_string()).collect(),
        }
    }
}
