use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::HimsError;
use crate::error::{Violations, optional, required};
use crate::money;

/// How far in the past an appointment may still be booked (walk-ins)
pub const BOOKING_GRACE_MINUTES: i64 = 5;

text_enum! {
    /// Appointment lifecycle
    pub enum AppointmentStatus {
        Scheduled => "scheduled",
        CheckedIn => "checked_in",
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no_show",
    }
}

impl AppointmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Scheduled, CheckedIn)
                | (CheckedIn, Completed)
                | (Scheduled, Cancelled)
                | (CheckedIn, Cancelled)
                | (Scheduled, NoShow)
        )
    }

    pub fn transition(self, next: AppointmentStatus) -> Result<AppointmentStatus, HimsError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(HimsError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

/// An outpatient consultation slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor: String,
    pub department: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub fee: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Booking payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor: String,
    #[serde(default)]
    pub department: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl NewAppointment {
    pub fn normalize(self, now: DateTime<Utc>) -> Result<Self, HimsError> {
        let mut v = Violations::new();
        let doctor = required(&mut v, "doctor", &self.doctor);
        v.check(
            self.scheduled_at >= now - Duration::minutes(BOOKING_GRACE_MINUTES),
            "scheduled_at must not be in the past",
        );
        v.finish()?;
        Ok(Self {
            patient_id: self.patient_id,
            doctor,
            department: optional(self.department.as_deref()),
            scheduled_at: self.scheduled_at,
            reason: optional(self.reason.as_deref()),
        })
    }
}

/// Status update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: AppointmentStatus,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl StatusChange {
    /// Validate against the current status; returns the rounded fee to bill.
    pub fn apply_to(&self, current: AppointmentStatus) -> Result<Option<Decimal>, HimsError> {
        current.transition(self.status)?;
        match self.fee {
            Some(_) if self.status != AppointmentStatus::Completed => Err(HimsError::invalid(
                "A fee can only be recorded when completing an appointment",
            )),
            Some(fee) => {
                money::check_non_negative("fee", fee)?;
                Ok(Some(money::round(fee)))
            }
            None => Ok(None),
        }
    }
}
