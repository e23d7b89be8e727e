use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionStatus {
    Stable,
    Critical,
    Observation,
    Discharged,
}

impl AdmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionStatus::Stable => "stable",
            AdmissionStatus::Critical => "critical",
            AdmissionStatus::Observation => "observation",
            AdmissionStatus::Discharged => "discharged",
        }
    }
}

impl std::fmt::Display for AdmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    pub age: u8,
    pub room_number: String,
    pub attending_doctor: String,
    pub admission_status: AdmissionStatus,
    pub admission_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_to: Option<String>,
    pub condition: String,
    pub emergency_contact: String,
}

impl Patient {
    /// The department is encoded as the room prefix before the first dash,
    /// e.g. `"A-101"` is department `"A"`. No dash means no department.
    pub fn department(&self) -> &str {
        self.room_number
            .split_once('-')
            .map(|(prefix, _)| prefix)
            .unwrap_or("")
    }

    /// Admission instant, if the stored timestamp parses.
    pub fn admitted_at(&self) -> Option<DateTime<Utc>> {
        super::parse_when(&self.admission_date)
    }
}

/// Registration payload. The required-field and age-range rules the intake
/// form enforces live here so a headless caller gets the same checks.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PatientDraft {
    #[validate(length(min = 1, message = "Name is required"))]
    #[serde(rename = "Name")]
    pub name: String,
    #[validate(range(min = 1, max = 120, message = "Valid age is required (1-120)"))]
    pub age: u8,
    #[validate(length(min = 1, message = "Room number is required"))]
    pub room_number: String,
    #[validate(length(min = 1, message = "Attending doctor is required"))]
    pub attending_doctor: String,
    pub admission_status: AdmissionStatus,
    #[validate(length(min = 1, message = "Admission date is required"))]
    pub admission_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_to: Option<String>,
    #[validate(length(min = 1, message = "Condition is required"))]
    pub condition: String,
    #[validate(length(min = 1, message = "Emergency contact is required"))]
    pub emergency_contact: String,
}

/// Partial update: only the supplied fields reach the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPatch {
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attending_doctor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission_status: Option<AdmissionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn department_is_room_prefix() {
        let mut patient = sample();
        assert_eq!(patient.department(), "A");

        patient.room_number = "ICU-3".into();
        assert_eq!(patient.department(), "ICU");

        patient.room_number = "217".into();
        assert_eq!(patient.department(), "");
    }

    #[test]
    fn wire_shape_keeps_store_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("Id").is_some());
        assert!(value.get("Name").is_some());
        assert!(value.get("roomNumber").is_some());
        assert_eq!(value["admissionStatus"], "stable");
    }

    fn sample() -> Patient {
        Patient {
            id: 1,
            name: "Alice Morgan".into(),
            age: 54,
            room_number: "A-101".into(),
            attending_doctor: "Dr. Chen".into(),
            admission_status: AdmissionStatus::Stable,
            admission_date: "2024-01-01".into(),
            admission_from: None,
            admission_to: None,
            condition: "Pneumonia".into(),
            emergency_contact: "555-0134".into(),
        }
    }
}
