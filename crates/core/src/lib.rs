//! hims-core: Shared hospital domain types and billing rules
//!
//! This crate holds everything the HIMS server needs that does not touch
//! the network or the database: tenant ids, UHID and document numbering,
//! money arithmetic, the clinical/billing records, their validation rules
//! and the status machines for appointments and lab requests.

/// Declare a fieldless enum stored as text in the database.
///
/// Generates `as_str`, `Display`, `FromStr` and serde impls that all agree
/// on the given spelling.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::HimsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err($crate::HimsError::Invalid(format!(
                        "Unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

pub mod admission;
pub mod appointment;
pub mod error;
pub mod lab;
pub mod ledger;
pub mod metadata;
pub mod money;
pub mod numbering;
pub mod outcome;
pub mod page;
pub mod patient;
pub mod pharmacy;
pub mod prescription;
pub mod tenant;

pub use admission::{
    Admission, AdmissionStatus, Bill, CategoryAmount, Charge, ChargeCategory, ClinicalNote,
    DischargeInvoice, DischargeRequest, NewAdmission, NewCharge, NewNote, NewSurgery, Surgery,
};
pub use appointment::{Appointment, AppointmentStatus, NewAppointment, StatusChange};
pub use error::HimsError;
pub use lab::{LabPriority, LabRequest, LabStatus, LabStatusChange, NewLabRequest};
pub use ledger::{CategoryTotal, EntryKind, LedgerEntry, LedgerSummary, NewLedgerEntry};
pub use metadata::{ModuleInfo, ServiceMetadata};
pub use money::Discount;
pub use numbering::{DocumentKind, DocumentNumber, Uhid};
pub use outcome::{IssueSeverity, IssueType, Outcome, OutcomeIssue};
pub use page::{Page, PageLink, PageParams};
pub use patient::{BloodGroup, Gender, NewPatient, Patient};
pub use pharmacy::{
    Medicine, NewMedicine, PaymentMethod, PharmacyInvoice, PharmacyInvoiceLine, Restock, SaleItem,
    SalePlan, SaleRequest, StockSnapshot,
};
pub use prescription::{NewPrescription, Prescription, PrescriptionItem};
pub use tenant::TenantId;

/// Result alias used throughout the domain layer
pub type HimsResult<T> = Result<T, HimsError>;
