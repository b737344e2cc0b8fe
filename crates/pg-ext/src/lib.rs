//! hims-pg-ext: PostgreSQL extension for HIMS storage
//!
//! A PGRX-based PostgreSQL extension that installs the HIMS schema and
//! hands out per-tenant sequence numbers for UHIDs and printed documents.

use pgrx::prelude::*;

mod counters;

// Register this crate as a PostgreSQL extension
pgrx::pg_module_magic!();

// Load schema definitions (tables, indexes, ledger trigger) when extension is created
extension_sql_file!("schema.sql", name = "schema", bootstrap);

/// Simple health check function to verify the extension is loaded
#[pg_extern]
fn hims_ext_version() -> &'static str {
    "hims-pg-ext 0.1.0"
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use super::*;

    #[pg_test]
    fn test_version() {
        assert_eq!(hims_ext_version(), "hims-pg-ext 0.1.0");
    }
}
