//! In-patient admissions and discharge billing

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::HimsError;
use crate::error::{Violations, optional, required};
use crate::money::{self, Discount};

text_enum! {
    pub enum AdmissionStatus {
        Admitted => "admitted",
        Discharged => "discharged",
    }
}

text_enum! {
    /// Bill heading a charge is printed under
    pub enum ChargeCategory {
        Bed => "bed",
        Consultation => "consultation",
        Procedure => "procedure",
        Medicine => "medicine",
        Lab => "lab",
        Surgery => "surgery",
        Nursing => "nursing",
        Other => "other",
    }
}

// Ordering follows ALL, which is the order headings appear on the bill.
impl PartialOrd for ChargeCategory {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChargeCategory {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let pos = |c: &ChargeCategory| ChargeCategory::ALL.iter().position(|x| x == c);
        pos(self).cmp(&pos(other))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admission {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub ward: String,
    pub bed: String,
    pub doctor: String,
    pub diagnosis: Option<String>,
    pub admitted_at: DateTime<Utc>,
    pub deposit: Decimal,
    pub status: AdmissionStatus,
    pub discharged_at: Option<DateTime<Utc>>,
    pub discharge_summary: Option<String>,
    pub invoice_id: Option<Uuid>,
}

impl Admission {
    /// Fail with `Conflict` unless the admission is still open
    pub fn ensure_open(&self) -> Result<(), HimsError> {
        match self.status {
            AdmissionStatus::Admitted => Ok(()),
            AdmissionStatus::Discharged => Err(HimsError::Conflict(format!(
                "Admission {} is already discharged",
                self.id
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdmission {
    pub patient_id: Uuid,
    pub ward: String,
    pub bed: String,
    pub doctor: String,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub deposit: Option<Decimal>,
}

impl NewAdmission {
    pub fn normalize(self) -> Result<Self, HimsError> {
        let mut v = Violations::new();
        let ward = required(&mut v, "ward", &self.ward);
        let bed = required(&mut v, "bed", &self.bed);
        let doctor = required(&mut v, "doctor", &self.doctor);
        let deposit = self.deposit.unwrap_or(Decimal::ZERO);
        if let Err(e) = money::check_non_negative("deposit", deposit) {
            v.push(e.to_string());
        }
        v.finish()?;
        Ok(Self {
            patient_id: self.patient_id,
            ward,
            bed,
            doctor,
            diagnosis: optional(self.diagnosis.as_deref()),
            deposit: Some(money::round(deposit)),
        })
    }
}

/// A billable item recorded against an admission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub id: Uuid,
    pub admission_id: Uuid,
    pub category: ChargeCategory,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCharge {
    pub category: ChargeCategory,
    pub description: String,
    #[serde(default = "one")]
    pub quantity: i32,
    pub unit_price: Decimal,
}

fn one() -> i32 {
    1
}

impl NewCharge {
    pub fn normalize(self) -> Result<Self, HimsError> {
        let mut v = Violations::new();
        let description = required(&mut v, "description", &self.description);
        v.check(self.quantity >= 1, "quantity must be at least 1");
        if let Err(e) = money::check_non_negative("unit_price", self.unit_price) {
            v.push(e.to_string());
        }
        v.finish()?;
        let charge = Self {
            category: self.category,
            description,
            quantity: self.quantity,
            unit_price: money::round(self.unit_price),
        };
        charge.amount()?;
        Ok(charge)
    }

    pub fn amount(&self) -> Result<Decimal, HimsError> {
        money::line_total(self.quantity, self.unit_price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalNote {
    pub id: Uuid,
    pub admission_id: Uuid,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNote {
    pub author: String,
    pub body: String,
}

impl NewNote {
    pub fn normalize(self) -> Result<Self, HimsError> {
        let mut v = Violations::new();
        let author = required(&mut v, "author", &self.author);
        let body = required(&mut v, "body", &self.body);
        v.finish()?;
        Ok(Self { author, body })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Surgery {
    pub id: Uuid,
    pub admission_id: Uuid,
    pub procedure: String,
    pub surgeon: String,
    pub performed_at: DateTime<Utc>,
    pub fee: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSurgery {
    pub procedure: String,
    pub surgeon: String,
    pub performed_at: DateTime<Utc>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewSurgery {
    pub fn normalize(self) -> Result<Self, HimsError> {
        let mut v = Violations::new();
        let procedure = required(&mut v, "procedure", &self.procedure);
        let surgeon = required(&mut v, "surgeon", &self.surgeon);
        let fee = self.fee.unwrap_or(Decimal::ZERO);
        if let Err(e) = money::check_non_negative("fee", fee) {
            v.push(e.to_string());
        }
        v.finish()?;
        Ok(Self {
            procedure,
            surgeon,
            performed_at: self.performed_at,
            fee: Some(money::round(fee)),
            notes: optional(self.notes.as_deref()),
        })
    }

    /// Charge to post for this surgery, if it carries a fee
    pub fn charge(&self) -> Option<NewCharge> {
        let fee = self.fee.unwrap_or(Decimal::ZERO);
        (fee > Decimal::ZERO).then(|| NewCharge {
            category: ChargeCategory::Surgery,
            description: format!("{} ({})", self.procedure, self.surgeon),
            quantity: 1,
            unit_price: fee,
        })
    }
}

/// Subtotal of one bill heading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryAmount {
    pub category: ChargeCategory,
    pub amount: Decimal,
}

/// Computed bill of an admission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bill {
    pub by_category: Vec<CategoryAmount>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub deposit: Decimal,
    /// Negative when the deposit exceeds the total (refund due)
    pub balance_due: Decimal,
}

impl Bill {
    pub fn compute(
        charges: &[Charge],
        deposit: Decimal,
        discount: Option<&Discount>,
    ) -> Result<Self, HimsError> {
        let mut per_category: BTreeMap<ChargeCategory, Decimal> = BTreeMap::new();
        for charge in charges {
            *per_category.entry(charge.category).or_default() += charge.amount;
        }
        let by_category: Vec<CategoryAmount> = per_category
            .into_iter()
            .map(|(category, amount)| CategoryAmount {
                category,
                amount: money::round(amount),
            })
            .collect();

        let subtotal = money::round(by_category.iter().map(|c| c.amount).sum());
        money::check_amount("Subtotal", subtotal)?;
        let discount = money::discount_amount(discount, subtotal)?;
        let total = money::round(subtotal - discount);
        let deposit = money::round(deposit);

        Ok(Self {
            by_category,
            subtotal,
            discount,
            total,
            deposit,
            balance_due: money::round(total - deposit),
        })
    }
}

/// Discharge request payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DischargeRequest {
    #[serde(default)]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Invoice written when an admission is discharged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DischargeInvoice {
    pub id: Uuid,
    pub number: String,
    pub admission_id: Uuid,
    pub patient_id: Uuid,
    pub bill: Bill,
    pub issued_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charge(category: ChargeCategory, quantity: i32, unit_price: Decimal) -> Charge {
        Charge {
            id: Uuid::new_v4(),
            admission_id: Uuid::nil(),
            category,
            description: category.to_string(),
            quantity,
            unit_price,
            amount: money::line_total(quantity, unit_price).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn bill_groups_by_category_in_print_order() {
        let charges = vec![
            charge(ChargeCategory::Lab, 1, Decimal::from(450)),
            charge(ChargeCategory::Bed, 3, Decimal::from(1500)),
            charge(ChargeCategory::Lab, 2, Decimal::from(200)),
        ];
        let bill = Bill::compute(&charges, Decimal::from(2000), None).unwrap();
        assert_eq!(
            bill.by_category,
            vec![
                CategoryAmount {
                    category: ChargeCategory::Bed,
                    amount: Decimal::from(4500),
                },
                CategoryAmount {
                    category: ChargeCategory::Lab,
                    amount: Decimal::from(850),
                },
            ]
        );
        assert_eq!(bill.subtotal, Decimal::from(5350));
        assert_eq!(bill.total, Decimal::from(5350));
        assert_eq!(bill.balance_due, Decimal::from(3350));
    }

    #[test]
    fn discount_then_deposit() {
        let charges = vec![charge(ChargeCategory::Surgery, 1, Decimal::from(10000))];
        let bill = Bill::compute(
            &charges,
            Decimal::from(12000),
            Some(&Discount::Percent(Decimal::from(15))),
        )
        .unwrap();
        assert_eq!(bill.discount, Decimal::from(1500));
        assert_eq!(bill.total, Decimal::from(8500));
        assert_eq!(bill.balance_due, Decimal::from(-3500));
        assert_eq!(bill.total.to_string(), "8500.00");
    }

    #[test]
    fn empty_bill_is_zero() {
        let bill = Bill::compute(&[], Decimal::ZERO, None).unwrap();
        assert!(bill.by_category.is_empty());
        assert!(bill.total.is_zero());
    }

    #[test]
    fn oversized_flat_discount_fails() {
        let charges = vec![charge(ChargeCategory::Bed, 1, Decimal::from(100))];
        let err = Bill::compute(&charges, Decimal::ZERO, Some(&Discount::Flat(Decimal::from(101))));
        assert!(matches!(err, Err(HimsError::Invalid(_))));
    }

    #[test]
    fn oversized_amounts_are_invalid() {
        let charge = NewCharge {
            category: ChargeCategory::Procedure,
            description: "Dressing".to_string(),
            quantity: 1000,
            unit_price: Decimal::MAX,
        };
        assert!(matches!(charge.normalize(), Err(HimsError::Invalid(_))));

        let admission = NewAdmission {
            patient_id: Uuid::new_v4(),
            ward: "General".to_string(),
            bed: "G-1".to_string(),
            doctor: "Dr. Rao".to_string(),
            diagnosis: None,
            deposit: Some(Decimal::from(100_000_000_000i64)),
        };
        assert!(matches!(admission.normalize(), Err(HimsError::Invalid(_))));
    }

    #[test]
    fn surgery_fee_becomes_charge() {
        let surgery = NewSurgery {
            procedure: "Appendectomy".to_string(),
            surgeon: "Dr. Khan".to_string(),
            performed_at: Utc::now(),
            fee: Some(Decimal::from(25000)),
            notes: None,
        }
        .normalize()
        .unwrap();
        let charge = surgery.charge().unwrap();
        assert_eq!(charge.category, ChargeCategory::Surgery);
        assert_eq!(charge.amount().unwrap(), Decimal::from(25000));

        let free = NewSurgery {
            fee: None,
            ..surgery
        }
        .normalize()
        .unwrap();
        assert!(free.charge().is_none());
    }

    #[test]
    fn discharged_admission_is_closed() {
        let admission = Admission {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            ward: "General".to_string(),
            bed: "G-12".to_string(),
            doctor: "Dr. Rao".to_string(),
            diagnosis: None,
            admitted_at: Utc::now(),
            deposit: Decimal::ZERO,
            status: AdmissionStatus::Discharged,
            discharged_at: Some(Utc::now()),
            discharge_summary: None,
            invoice_id: None,
        };
        assert!(matches!(admission.ensure_open(), Err(HimsError::Conflict(_))));
    }
}
