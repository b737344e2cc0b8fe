//! Pharmacy inventory and point-of-sale checkout

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::HimsError;
use crate::error::{Violations, optional, required};
use crate::money::{self, Discount};

text_enum! {
    pub enum PaymentMethod {
        Cash => "cash",
        Card => "card",
        Upi => "upi",
        Insurance => "insurance",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: Uuid,
    pub name: String,
    pub generic_name: Option<String>,
    pub batch: String,
    pub expiry_date: NaiveDate,
    pub unit_price: Decimal,
    pub stock: i32,
    pub reorder_level: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMedicine {
    pub name: String,
    #[serde(default)]
    pub generic_name: Option<String>,
    pub batch: String,
    pub expiry_date: NaiveDate,
    pub unit_price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub reorder_level: i32,
}

impl NewMedicine {
    pub fn normalize(self) -> Result<Self, HimsError> {
        let mut v = Violations::new();
        let name = required(&mut v, "name", &self.name);
        let batch = required(&mut v, "batch", &self.batch);
        if let Err(e) = money::check_non_negative("unit_price", self.unit_price) {
            v.push(e.to_string());
        }
        v.check(self.stock >= 0, "stock must not be negative");
        v.check(self.reorder_level >= 0, "reorder_level must not be negative");
        v.finish()?;
        Ok(Self {
            name,
            generic_name: optional(self.generic_name.as_deref()),
            batch,
            expiry_date: self.expiry_date,
            unit_price: money::round(self.unit_price),
            stock: self.stock,
            reorder_level: self.reorder_level,
        })
    }
}

/// Stock received from a supplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restock {
    pub quantity: i32,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
}

impl Restock {
    /// Validate and return the purchase cost to book as an expense, if any.
    pub fn purchase_cost(&self) -> Result<Option<Decimal>, HimsError> {
        if self.quantity < 1 {
            return Err(HimsError::invalid("quantity must be at least 1"));
        }
        match self.unit_cost {
            Some(cost) => {
                money::check_non_negative("unit_cost", cost)?;
                let total = money::line_total(self.quantity, cost)?;
                Ok((total > Decimal::ZERO).then_some(total))
            }
            None => Ok(None),
        }
    }
}

/// One requested line of a sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    pub medicine_id: Uuid,
    pub quantity: i32,
}

/// Checkout payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRequest {
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub prescription_id: Option<Uuid>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub items: Vec<SaleItem>,
    #[serde(default)]
    pub discount: Option<Discount>,
    pub payment_method: PaymentMethod,
}

impl SaleRequest {
    /// Requested quantities per medicine, duplicates merged, ordered by id.
    ///
    /// The ordering doubles as the row-lock order during checkout.
    pub fn merged_items(&self) -> Result<Vec<(Uuid, i32)>, HimsError> {
        if self.items.is_empty() {
            return Err(HimsError::invalid("at least one item is required"));
        }
        let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
        for item in &self.items {
            if item.quantity < 1 {
                return Err(HimsError::invalid(format!(
                    "quantity for medicine {} must be at least 1",
                    item.medicine_id
                )));
            }
            let qty = merged.entry(item.medicine_id).or_default();
            *qty = qty
                .checked_add(item.quantity)
                .ok_or_else(|| HimsError::invalid("quantity too large"))?;
        }
        Ok(merged.into_iter().collect())
    }
}

/// Current state of a medicine row, read under lock during checkout
#[derive(Debug, Clone)]
pub struct StockSnapshot {
    pub id: Uuid,
    pub name: String,
    pub batch: String,
    pub expiry_date: NaiveDate,
    pub unit_price: Decimal,
    pub stock: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PharmacyInvoiceLine {
    pub medicine_id: Uuid,
    pub medicine_name: String,
    pub batch: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

/// Priced and stock-checked sale, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalePlan {
    pub lines: Vec<PharmacyInvoiceLine>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl SalePlan {
    /// Price the sale against locked stock.
    ///
    /// Fails with `NotFound` for unknown medicines, `Invalid` for expired
    /// batches and `InsufficientStock` when a line cannot be filled.
    pub fn build(
        request: &SaleRequest,
        stock: &[StockSnapshot],
        today: NaiveDate,
    ) -> Result<Self, HimsError> {
        let mut lines = Vec::new();
        for (medicine_id, quantity) in request.merged_items()? {
            let snapshot = stock
                .iter()
                .find(|s| s.id == medicine_id)
                .ok_or_else(|| HimsError::NotFound(format!("Medicine/{medicine_id} not found")))?;

            if snapshot.expiry_date <= today {
                return Err(HimsError::invalid(format!(
                    "{} batch {} expired on {}",
                    snapshot.name, snapshot.batch, snapshot.expiry_date
                )));
            }
            if snapshot.stock < quantity {
                return Err(HimsError::InsufficientStock {
                    medicine: snapshot.name.clone(),
                    requested: quantity,
                    available: snapshot.stock,
                });
            }

            lines.push(PharmacyInvoiceLine {
                medicine_id,
                medicine_name: snapshot.name.clone(),
                batch: snapshot.batch.clone(),
                quantity,
                unit_price: money::round(snapshot.unit_price),
                amount: money::line_total(quantity, snapshot.unit_price)?,
            });
        }

        let subtotal = money::round(lines.iter().map(|l| l.amount).sum());
        money::check_amount("Subtotal", subtotal)?;
        let discount = money::discount_amount(request.discount.as_ref(), subtotal)?;
        Ok(Self {
            lines,
            subtotal,
            discount,
            total: money::round(subtotal - discount),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PharmacyInvoice {
    pub id: Uuid,
    pub number: String,
    pub patient_id: Option<Uuid>,
    pub prescription_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub lines: Vec<PharmacyInvoiceLine>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub issued_at: DateTime<Utc>,
}
