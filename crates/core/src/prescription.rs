use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::HimsError;
use crate::error::{Violations, optional, required};

/// One medicine line of a prescription
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrescriptionItem {
    pub medicine: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i32,
    pub quantity: i32,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub number: String,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub doctor: String,
    pub diagnosis: Option<String>,
    pub items: Vec<PrescriptionItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrescription {
    pub patient_id: Uuid,
    #[serde(default)]
    pub appointment_id: Option<Uuid>,
    pub doctor: String,
    #[serde(default)]
    pub diagnosis: Option<String>,
    pub items: Vec<PrescriptionItem>,
}

impl NewPrescription {
    pub fn normalize(self) -> Result<Self, HimsError> {
        let mut v = Violations::new();
        let doctor = required(&mut v, "doctor", &self.doctor);
        v.check(!self.items.is_empty(), "at least one item is required");

        let items = self
            .items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let field = |name: &str| format!("items[{i}].{name}");
                let medicine = required(&mut v, &field("medicine"), &item.medicine);
                let dosage = required(&mut v, &field("dosage"), &item.dosage);
                let frequency = required(&mut v, &field("frequency"), &item.frequency);
                v.check(
                    (1..=365).contains(&item.duration_days),
                    format!("{} must be between 1 and 365", field("duration_days")),
                );
                v.check(
                    item.quantity >= 1,
                    format!("{} must be at least 1", field("quantity")),
                );
                PrescriptionItem {
                    medicine,
                    dosage,
                    frequency,
                    duration_days: item.duration_days,
                    quantity: item.quantity,
                    instructions: optional(item.instructions.as_deref()),
                }
            })
            .collect();

        v.finish()?;
        Ok(Self {
            patient_id: self.patient_id,
            appointment_id: self.appointment_id,
            doctor,
            diagnosis: optional(self.diagnosis.as_deref()),
            items,
        })
    }
}
