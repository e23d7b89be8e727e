//! Client-side patient filtering, search and sort.
//!
//! Everything here is a pure function from an input collection and a filter
//! description to a derived collection: the input is never mutated and the
//! output is always a fresh `Vec`, so callers can hold both without aliasing
//! surprises.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::models::{parse_when, AdmissionStatus, Patient};

/// Panel filter spec. Every field is optional; an empty or blank string
/// means the constraint is absent. Active constraints AND together.
#[derive(Debug, Clone, Default)]
pub struct PatientFilters {
    /// Case-insensitive substring on the patient name.
    pub name: Option<String>,
    /// Exact match against the room-number prefix before the first dash.
    pub department: Option<String>,
    pub status: Option<AdmissionStatus>,
    /// Inclusive lower bound, taken at the start of the given day.
    pub date_from: Option<String>,
    /// Inclusive upper bound, forced to 23:59:59.999 of the given day.
    pub date_to: Option<String>,
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn day_of(raw: &str) -> Option<NaiveDate> {
    parse_when(raw).map(|ts| ts.date_naive())
}

fn start_of_day(raw: &str) -> Option<DateTime<Utc>> {
    day_of(raw)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn end_of_day(raw: &str) -> Option<DateTime<Utc>> {
    day_of(raw)
        .and_then(|day| day.and_hms_milli_opt(23, 59, 59, 999))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Applies the panel filters. Malformed dates never panic: an unparsable
/// bound (or an unparsable admission date on the record) is a constraint
/// nothing satisfies, so the affected records simply drop out.
pub fn filter_patients(patients: &[Patient], filters: &PatientFilters) -> Vec<Patient> {
    let name = active(&filters.name).map(str::to_lowercase);
    let department = active(&filters.department);
    // `Some(None)` is an active-but-malformed bound.
    let from = active(&filters.date_from).map(start_of_day);
    let to = active(&filters.date_to).map(end_of_day);

    patients
        .iter()
        .filter(|patient| {
            if let Some(needle) = &name {
                if !patient.name.to_lowercase().contains(needle) {
                    return false;
                }
            }
            if let Some(department) = department {
                if patient.department() != department {
                    return false;
                }
            }
            if let Some(status) = filters.status {
                if patient.admission_status != status {
                    return false;
                }
            }
            if from.is_some() || to.is_some() {
                let Some(admitted) = patient.admitted_at() else {
                    return false;
                };
                match &from {
                    Some(Some(bound)) if admitted >= *bound => {}
                    None => {}
                    _ => return false,
                }
                match &to {
                    Some(Some(bound)) if admitted <= *bound => {}
                    None => {}
                    _ => return false,
                }
            }
            true
        })
        .cloned()
        .collect()
}

/// Free-text table search: keeps patients whose name, id (as printed) or
/// attending doctor contains the query, case-insensitively. A blank query
/// keeps everyone.
pub fn search_patients(patients: &[Patient], query: &str) -> Vec<Patient> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return patients.to_vec();
    }
    patients
        .iter()
        .filter(|patient| {
            patient.name.to_lowercase().contains(&needle)
                || patient.id.to_string().contains(&needle)
                || patient.attending_doctor.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Name,
    Room,
    Doctor,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Column-header sort state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for TableSort {
    fn default() -> Self {
        TableSort {
            field: SortField::Name,
            direction: SortDirection::Ascending,
        }
    }
}

impl TableSort {
    /// Header-click semantics: re-selecting the current field flips the
    /// direction, selecting a new field resets to ascending.
    pub fn select(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.flipped();
        } else {
            self.field = field;
            self.direction = SortDirection::Ascending;
        }
    }
}

/// Sorts a derived view. Text fields compare case-insensitively, ids
/// naturally; ties keep no particular order.
pub fn sort_patients(patients: &[Patient], sort: TableSort) -> Vec<Patient> {
    let mut sorted = patients.to_vec();
    sorted.sort_by(|a, b| {
        let ordering = match sort.field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Room => a.room_number.to_lowercase().cmp(&b.room_number.to_lowercase()),
            SortField::Doctor => a
                .attending_doctor
                .to_lowercase()
                .cmp(&b.attending_doctor.to_lowercase()),
            SortField::Status => a.admission_status.as_str().cmp(b.admission_status.as_str()),
        };
        match sort.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
    sorted
}
