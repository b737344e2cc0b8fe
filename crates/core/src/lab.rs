//! Laboratory requests and the worklist status machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::HimsError;
use crate::error::{Violations, optional, required};
use crate::money;

text_enum! {
    pub enum LabStatus {
        Requested => "requested",
        SampleCollected => "sample_collected",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl LabStatus {
    pub fn can_transition_to(self, next: LabStatus) -> bool {
        use LabStatus::*;
        matches!(
            (self, next),
            (Requested, SampleCollected)
                | (SampleCollected, InProgress)
                | (InProgress, Completed)
                | (Requested, Cancelled)
                | (SampleCollected, Cancelled)
        )
    }
}

text_enum! {
    /// Worklist priority, most urgent first
    pub enum LabPriority {
        Stat => "stat",
        Urgent => "urgent",
        Routine => "routine",
    }
}

impl LabPriority {
    /// Sort key used by the worklist (lower is more urgent)
    pub fn rank(self) -> i16 {
        match self {
            LabPriority::Stat => 0,
            LabPriority::Urgent => 1,
            LabPriority::Routine => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabRequest {
    pub id: Uuid,
    pub number: String,
    pub patient_id: Uuid,
    pub admission_id: Option<Uuid>,
    pub test_name: String,
    pub price: Decimal,
    pub priority: LabPriority,
    pub status: LabStatus,
    pub result: Option<String>,
    pub requested_by: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LabRequest {
    /// Validate a status change, returning the result text to store
    pub fn apply(&self, change: &LabStatusChange) -> Result<Option<String>, HimsError> {
        if !self.status.can_transition_to(change.status) {
            return Err(HimsError::InvalidTransition {
                from: self.status.to_string(),
                to: change.status.to_string(),
            });
        }
        let result = optional(change.result.as_deref());
        match (change.status, &result) {
            (LabStatus::Completed, None) => {
                Err(HimsError::invalid("A result is required to complete a lab request"))
            }
            (LabStatus::Completed, Some(_)) => Ok(result),
            (_, Some(_)) => Err(HimsError::invalid(
                "A result can only be recorded when completing a lab request",
            )),
            (_, None) => Ok(self.result.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLabRequest {
    pub patient_id: Uuid,
    #[serde(default)]
    pub admission_id: Option<Uuid>,
    pub test_name: String,
    pub price: Decimal,
    #[serde(default = "routine")]
    pub priority: LabPriority,
    #[serde(default)]
    pub requested_by: Option<String>,
}

fn routine() -> LabPriority {
    LabPriority::Routine
}

impl NewLabRequest {
    pub fn normalize(self) -> Result<Self, HimsError> {
        let mut v = Violations::new();
        let test_name = required(&mut v, "test_name", &self.test_name);
        if let Err(e) = money::check_non_negative("price", self.price) {
            v.push(e.to_string());
        }
        v.finish()?;
        Ok(Self {
            patient_id: self.patient_id,
            admission_id: self.admission_id,
            test_name,
            price: money::round(self.price),
            priority: self.priority,
            requested_by: optional(self.requested_by.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabStatusChange {
    pub status: LabStatus,
    #[serde(default)]
    pub result: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: LabStatus) -> LabRequest {
        LabRequest {
            id: Uuid::new_v4(),
            number: "LAB-2026-000001".to_string(),
            patient_id: Uuid::new_v4(),
            admission_id: None,
            test_name: "CBC".to_string(),
            price: Decimal::from(350),
            priority: LabPriority::Routine,
            status,
            result: None,
            requested_by: None,
            requested_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn change(status: LabStatus, result: Option<&str>) -> LabStatusChange {
        LabStatusChange {
            status,
            result: result.map(str::to_string),
        }
    }

    #[test]
    fn happy_path() {
        let mut lab = request(LabStatus::Requested);
        for next in [LabStatus::SampleCollected, LabStatus::InProgress] {
            assert_eq!(lab.apply(&change(next, None)).unwrap(), None);
            lab.status = next;
        }
        let result = lab
            .apply(&change(LabStatus::Completed, Some("Hb 13.2 g/dL")))
            .unwrap();
        assert_eq!(result.as_deref(), Some("Hb 13.2 g/dL"));
    }

    #[test]
    fn completion_needs_result() {
        let lab = request(LabStatus::InProgress);
        assert!(lab.apply(&change(LabStatus::Completed, Some("  "))).is_err());
    }

    #[test]
    fn cannot_skip_or_reopen() {
        let lab = request(LabStatus::Requested);
        assert!(matches!(
            lab.apply(&change(LabStatus::InProgress, None)),
            Err(HimsError::InvalidTransition { .. })
        ));
        let done = request(LabStatus::Completed);
        assert!(done.apply(&change(LabStatus::Cancelled, None)).is_err());
        let running = request(LabStatus::InProgress);
        assert!(running.apply(&change(LabStatus::Cancelled, None)).is_err());
    }

    #[test]
    fn priority_rank() {
        let mut priorities = vec![LabPriority::Routine, LabPriority::Stat, LabPriority::Urgent];
        priorities.sort_by_key(|p| p.rank());
        assert_eq!(
            priorities,
            vec![LabPriority::Stat, LabPriority::Urgent, LabPriority::Routine]
        );
    }
}
