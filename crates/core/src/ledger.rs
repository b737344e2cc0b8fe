//! Append-only income/expense ledger

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::HimsError;
use crate::error::{Violations, optional};
use crate::money;

text_enum! {
    pub enum EntryKind {
        Income => "income",
        Expense => "expense",
    }
}

/// Categories written by the workflows themselves
pub mod category {
    pub const CONSULTATION: &str = "consultation";
    pub const IPD: &str = "ipd";
    pub const LAB: &str = "lab";
    pub const PHARMACY: &str = "pharmacy";
    pub const PHARMACY_PURCHASE: &str = "pharmacy_purchase";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub kind: EntryKind,
    pub category: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub kind: EntryKind,
    pub category: String,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reference_type: Option<String>,
    #[serde(default)]
    pub reference_id: Option<Uuid>,
}

fn is_slug(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 40
        && s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

impl NewLedgerEntry {
    /// Entry produced by one of the billing workflows
    pub fn income(
        category: &str,
        amount: Decimal,
        reference_type: &str,
        reference_id: Uuid,
        description: String,
    ) -> Self {
        Self {
            kind: EntryKind::Income,
            category: category.to_string(),
            amount,
            description: Some(description),
            reference_type: Some(reference_type.to_string()),
            reference_id: Some(reference_id),
        }
    }

    pub fn expense(
        category: &str,
        amount: Decimal,
        reference_type: &str,
        reference_id: Uuid,
        description: String,
    ) -> Self {
        Self {
            kind: EntryKind::Expense,
            ..Self::income(category, amount, reference_type, reference_id, description)
        }
    }

    pub fn normalize(self) -> Result<Self, HimsError> {
        let mut v = Violations::new();
        let category = self.category.trim().to_lowercase();
        v.check(
            is_slug(&category),
            format!("Malformed category '{}'", self.category),
        );
        if let Err(e) = money::check_positive("amount", self.amount) {
            v.push(e.to_string());
        }
        let reference_type = optional(self.reference_type.as_deref());
        v.check(
            reference_type.is_some() || self.reference_id.is_none(),
            "reference_id requires reference_type",
        );
        v.finish()?;
        Ok(Self {
            kind: self.kind,
            category,
            amount: money::round(self.amount),
            description: optional(self.description.as_deref()),
            reference_type,
            reference_id: self.reference_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryTotal {
    pub kind: EntryKind,
    pub category: String,
    pub total: Decimal,
}

/// Totals over a period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSummary {
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
    pub by_category: Vec<CategoryTotal>,
}

impl LedgerSummary {
    /// Fold per-category totals into a summary.
    pub fn from_totals(totals: impl IntoIterator<Item = CategoryTotal>) -> Self {
        let mut merged: BTreeMap<(&'static str, String), (EntryKind, Decimal)> = BTreeMap::new();
        for t in totals {
            let slot = merged
                .entry((t.kind.as_str(), t.category))
                .or_insert((t.kind, Decimal::ZERO));
            slot.1 += t.total;
        }

        let mut income = Decimal::ZERO;
        let mut expense = Decimal::ZERO;
        let mut by_category = Vec::with_capacity(merged.len());
        for ((_, category), (kind, total)) in merged {
            match kind {
                EntryKind::Income => income += total,
                EntryKind::Expense => expense += total,
            }
            by_category.push(CategoryTotal {
                kind,
                category,
                total: money::round(total),
            });
        }

        Self {
            income: money::round(income),
            expense: money::round(expense),
            net: money::round(income - expense),
            by_category,
        }
    }
}
