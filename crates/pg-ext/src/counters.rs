//! Per-tenant numbering (UHIDs, invoice/lab/prescription numbers)
//!
//! Counters restart every calendar year. The upsert takes a row lock that is
//! held until the calling transaction ends, so two sessions never receive
//! the same number.

use hims_core::{DocumentKind, DocumentNumber, Uhid};
use pgrx::prelude::*;

/// Advance the counter for `(tenant_id, scope, current year)`.
///
/// Returns the year and the freshly assigned value.
fn advance(tenant_id: &str, scope: &str) -> (i32, i64) {
    let year: i32 = Spi::get_one("SELECT EXTRACT(YEAR FROM now())::int")
        .ok()
        .flatten()
        .expect("current year should not be null");

    Spi::run_with_args(
        "INSERT INTO hims_counters (tenant_id, scope, year, value) VALUES ($1, $2, $3, 1)
           ON CONFLICT (tenant_id, scope, year)
           DO UPDATE SET value = hims_counters.value + 1",
        &[tenant_id.into(), scope.into(), year.into()],
    )
    .expect("Failed to advance counter");

    let value: i64 = Spi::get_one_with_args(
        "SELECT value FROM hims_counters WHERE tenant_id = $1 AND scope = $2 AND year = $3",
        &[tenant_id.into(), scope.into(), year.into()],
    )
    .ok()
    .flatten()
    .expect("counter row should exist after upsert");

    (year, value)
}

/// Assign the next UHID for a tenant, e.g. `UH-2026-000042`
#[pg_extern]
fn hims_next_uhid(tenant_id: &str, prefix: &str) -> String {
    if let Err(e) = Uhid::check_prefix(prefix) {
        error!("{}", e);
    }
    let (year, seq) = advance(tenant_id, &format!("uhid:{prefix}"));
    match Uhid::new(prefix, year, seq) {
        Ok(uhid) => uhid.to_string(),
        Err(e) => error!("{}", e),
    }
}

/// Assign the next document number of `kind` (`IPD`, `PHR`, `LAB`, `RX`)
#[pg_extern]
fn hims_next_document_number(tenant_id: &str, kind: &str) -> String {
    let Some(kind) = DocumentKind::from_code(kind) else {
        error!("unknown document kind '{}'", kind);
    };
    let (year, seq) = advance(tenant_id, kind.code());
    match DocumentNumber::new(kind, year, seq) {
        Ok(number) => number.to_string(),
        Err(e) => error!("{}", e),
    }
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use super::*;

    #[pg_test]
    fn test_uhid_sequence_per_tenant() {
        let first = hims_next_uhid("city", "UH");
        let second = hims_next_uhid("city", "UH");
        let other = hims_next_uhid("rural", "UH");

        assert!(first.ends_with("-000001"));
        assert!(second.ends_with("-000002"));
        assert!(other.ends_with("-000001"));
        assert!(Uhid::parse(&second).is_ok());
    }

    #[pg_test]
    fn test_document_numbers_are_independent() {
        let invoice = hims_next_document_number("city", "PHR");
        let lab = hims_next_document_number("city", "LAB");

        assert!(invoice.starts_with("PHR-"));
        assert!(invoice.ends_with("-000001"));
        assert!(lab.starts_with("LAB-"));
        assert!(lab.ends_with("-000001"));
    }

    #[pg_test(error = "unknown document kind 'XYZ'")]
    fn test_unknown_kind_is_rejected() {
        hims_next_document_number("city", "XYZ");
    }

    #[pg_test(error = "ledger entries are append-only")]
    fn test_ledger_is_append_only() {
        Spi::run(
            "INSERT INTO ledger_entries (id, tenant_id, kind, category, amount)
               VALUES (gen_random_uuid(), 'city', 'income', 'lab', 10)",
        )
        .expect("insert should succeed");
        Spi::run("DELETE FROM ledger_entries").expect("delete is rejected by trigger");
    }
}
