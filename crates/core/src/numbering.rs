//! Human-facing identifiers: patient UHIDs and document numbers.
//!
//! Both share the `{PREFIX}-{YYYY}-{SEQ:06}` layout. Sequences are handed out
//! by the database extension per tenant and per year; this module owns the
//! textual format so the extension and the server agree on it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::HimsError;

/// Highest sequence that still fits the six-digit field
pub const MAX_SEQUENCE: i64 = 999_999;

fn check_parts(year: i32, seq: i64) -> Result<(), HimsError> {
    if !(1900..=9999).contains(&year) {
        return Err(HimsError::invalid(format!("Year {year} out of range")));
    }
    if !(1..=MAX_SEQUENCE).contains(&seq) {
        return Err(HimsError::invalid(format!("Sequence {seq} out of range")));
    }
    Ok(())
}

/// Split `PREFIX-YYYY-NNNNNN` into its three parts.
fn split(raw: &str) -> Option<(&str, i32, i64)> {
    let mut parts = raw.split('-');
    let prefix = parts.next()?;
    let year = parts.next()?;
    let seq = parts.next()?;
    if parts.next().is_some() || year.len() != 4 || seq.len() != 6 {
        return None;
    }
    if !year.bytes().all(|b| b.is_ascii_digit()) || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((prefix, year.parse().ok()?, seq.parse().ok()?))
}

/// Unique Health Identifier assigned to a patient at registration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uhid {
    prefix: String,
    year: i32,
    seq: i64,
}

impl Uhid {
    pub fn new(prefix: &str, year: i32, seq: i64) -> Result<Self, HimsError> {
        Self::check_prefix(prefix)?;
        check_parts(year, seq)?;
        Ok(Self {
            prefix: prefix.to_string(),
            year,
            seq,
        })
    }

    /// A prefix is one to six uppercase ASCII letters
    pub fn check_prefix(prefix: &str) -> Result<(), HimsError> {
        if (1..=6).contains(&prefix.len()) && prefix.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(())
        } else {
            Err(HimsError::invalid(format!("Malformed UHID prefix '{prefix}'")))
        }
    }

    pub fn parse(raw: &str) -> Result<Self, HimsError> {
        let (prefix, year, seq) =
            split(raw.trim()).ok_or_else(|| HimsError::invalid(format!("Malformed UHID '{raw}'")))?;
        Self::new(prefix, year, seq)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> i64 {
        self.seq
    }
}

impl fmt::Display for Uhid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}-{:06}", self.prefix, self.year, self.seq)
    }
}

impl FromStr for Uhid {
    type Err = HimsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Uhid {
    type Error = HimsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Uhid> for String {
    fn from(value: Uhid) -> Self {
        value.to_string()
    }
}

/// Kinds of numbered documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Discharge invoice of an admission
    IpdInvoice,
    /// Pharmacy sale invoice
    PharmacyInvoice,
    LabRequest,
    Prescription,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::IpdInvoice,
        DocumentKind::PharmacyInvoice,
        DocumentKind::LabRequest,
        DocumentKind::Prescription,
    ];

    /// Prefix printed on the document
    pub fn code(self) -> &'static str {
        match self {
            DocumentKind::IpdInvoice => "IPD",
            DocumentKind::PharmacyInvoice => "PHR",
            DocumentKind::LabRequest => "LAB",
            DocumentKind::Prescription => "RX",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }
}

/// Number printed on invoices, lab requests and prescriptions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentNumber {
    kind: DocumentKind,
    year: i32,
    seq: i64,
}

impl DocumentNumber {
    pub fn new(kind: DocumentKind, year: i32, seq: i64) -> Result<Self, HimsError> {
        check_parts(year, seq)?;
        Ok(Self { kind, year, seq })
    }

    pub fn parse(raw: &str) -> Result<Self, HimsError> {
        let malformed = || HimsError::invalid(format!("Malformed document number '{raw}'"));
        let (code, year, seq) = split(raw.trim()).ok_or_else(malformed)?;
        let kind = DocumentKind::from_code(code).ok_or_else(malformed)?;
        Self::new(kind, year, seq)
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}-{:06}", self.kind.code(), self.year, self.seq)
    }
}
