use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::HimsError;
use crate::error::{Violations, optional, required};

text_enum! {
    /// Administrative gender
    pub enum Gender {
        Male => "male",
        Female => "female",
        Other => "other",
        Unknown => "unknown",
    }
}

text_enum! {
    /// ABO/Rh blood group
    pub enum BloodGroup {
        APos => "A+",
        ANeg => "A-",
        BPos => "B+",
        BNeg => "B-",
        AbPos => "AB+",
        AbNeg => "AB-",
        OPos => "O+",
        ONeg => "O-",
    }
}

/// A registered patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub uhid: String,
    pub full_name: String,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration or demographic update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub full_name: String,
    pub gender: Gender,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub blood_group: Option<BloodGroup>,
}

/// Strip formatting from a phone number and check its length.
pub fn normalize_phone(raw: &str) -> Result<String, HimsError> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, '+' | '-' | ' ' | '(' | ')'))
        .collect();
    if (7..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
        Ok(digits)
    } else {
        Err(HimsError::invalid(format!("Malformed phone number '{raw}'")))
    }
}

impl NewPatient {
    /// Validate and normalise the payload as of `today`.
    pub fn normalize(self, today: NaiveDate) -> Result<Self, HimsError> {
        let mut v = Violations::new();
        let full_name = required(&mut v, "full_name", &self.full_name);
        v.check(full_name.chars().count() <= 200, "full_name is too long");

        if let Some(dob) = self.birth_date {
            v.check(dob <= today, "birth_date must not be in the future");
        }

        let phone = match optional(self.phone.as_deref()) {
            Some(raw) => match normalize_phone(&raw) {
                Ok(p) => Some(p),
                Err(e) => {
                    v.push(e.to_string());
                    None
                }
            },
            None => None,
        };

        let email = optional(self.email.as_deref()).map(|e| e.to_lowercase());
        if let Some(ref e) = email {
            v.check(e.contains('@'), format!("Malformed email '{e}'"));
        }

        v.finish()?;
        Ok(Self {
            full_name,
            gender: self.gender,
            birth_date: self.birth_date,
            phone,
            email,
            address: optional(self.address.as_deref()),
            blood_group: self.blood_group,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn sample() -> NewPatient {
        NewPatient {
            full_name: "  Asha Rao ".to_string(),
            gender: Gender::Female,
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 15),
            phone: Some("+91 98450-12345".to_string()),
            email: Some("Asha@Example.org".to_string()),
            address: Some("   ".to_string()),
            blood_group: Some(BloodGroup::OPos),
        }
    }

    #[test]
    fn normalizes_fields() {
        let p = sample().normalize(today()).unwrap();
        assert_eq!(p.full_name, "Asha Rao");
        assert_eq!(p.phone.as_deref(), Some("919845012345"));
        assert_eq!(p.email.as_deref(), Some("asha@example.org"));
        assert_eq!(p.address, None);
    }

    #[test]
    fn collects_every_problem() {
        let mut p = sample();
        p.full_name = " ".to_string();
        p.phone = Some("12".to_string());
        p.birth_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        let err = p.normalize(today()).unwrap_err().to_string();
        assert!(err.contains("full_name is required"));
        assert!(err.contains("phone"));
        assert!(err.contains("birth_date"));
    }

    #[test]
    fn email_needs_only_an_at_sign() {
        let mut p = sample();
        p.email = Some("ward.desk@localhost".to_string());
        assert_eq!(
            p.normalize(today()).unwrap().email.as_deref(),
            Some("ward.desk@localhost")
        );

        let mut p = sample();
        p.email = Some("asha.example.org".to_string());
        let err = p.normalize(today()).unwrap_err().to_string();
        assert!(err.contains("Malformed email"));
    }

    #[test]
    fn blood_group_spelling() {
        assert_eq!("AB-".parse::<BloodGroup>().unwrap(), BloodGroup::AbNeg);
        assert_eq!(serde_json::to_value(BloodGroup::APos).unwrap(), "A+");
        assert!("C+".parse::<BloodGroup>().is_err());
    }
}
