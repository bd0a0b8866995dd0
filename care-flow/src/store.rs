use std::collections::HashMap;

use crate::models::{DoctorNotes, PatientRecord};

/// Patient records saved within one session, keyed by the name the patient typed.
///
/// Keys are case-sensitive and stored exactly as given. A save replaces the whole
/// record. Names are listed in the order they were first saved.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: HashMap<String, PatientRecord>,
    order: Vec<String>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace the record for `name`. Returns the replaced record, if any.
    pub fn save_report(&mut self, name: &str, report_text: &str) -> Option<PatientRecord> {
        let previous = self
            .records
            .insert(name.to_string(), PatientRecord::new(report_text));
        if previous.is_none() {
            self.order.push(name.to_string());
        }
        previous
    }

    /// Overwrite the doctor's notes for `name`. Returns `false` if no such patient.
    pub fn save_notes(&mut self, name: &str, notes: DoctorNotes) -> bool {
        match self.records.get_mut(name) {
            Some(record) => {
                record.doctor_notes = Some(notes);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&PatientRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
