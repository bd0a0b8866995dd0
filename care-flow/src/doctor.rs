use serde::Serialize;
use tracing::info;

use crate::error::{FlowError, Result};
use crate::models::DoctorNotes;
use crate::store::RecordStore;

pub const NO_PATIENTS_MESSAGE: &str = "No patient data available yet.";

#[derive(Debug, Clone)]
pub enum DoctorEvent {
    SelectPatient { name: String },
    SaveNotes { prescription: String, comment: String },
}

impl DoctorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DoctorEvent::SelectPatient { .. } => "select_patient",
            DoctorEvent::SaveNotes { .. } => "save_notes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DoctorOutcome {
    Selected { name: String },
    NotesSaved { name: String },
}

/// What the doctor dashboard shows for the current store contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DoctorView {
    /// Nothing saved yet; no patient selector is offered.
    NoPatients { message: &'static str },
    Dashboard {
        patients: Vec<String>,
        selected: String,
        report_text: String,
        saved_notes: Option<DoctorNotes>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DoctorFlow {
    selected: Option<String>,
}

impl DoctorFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// The patient the dashboard is showing: the explicit selection if it still
    /// exists, else the first listed patient.
    pub fn current_patient<'a>(&'a self, records: &'a RecordStore) -> Option<&'a str> {
        self.selected
            .as_deref()
            .filter(|name| records.contains(name))
            .or_else(|| records.first_name())
    }

    pub fn handle(&mut self, event: DoctorEvent, records: &mut RecordStore) -> Result<DoctorOutcome> {
        match event {
            DoctorEvent::SelectPatient { name } => {
                if !records.contains(&name) {
                    return Err(FlowError::PatientNotFound(name));
                }
                info!(patient = %name, "Doctor selected patient");
                self.selected = Some(name.clone());
                Ok(DoctorOutcome::Selected { name })
            }
            DoctorEvent::SaveNotes {
                prescription,
                comment,
            } => {
                let name = self
                    .current_patient(records)
                    .map(str::to_string)
                    .ok_or(FlowError::NoPatients)?;

                if !records.save_notes(&name, DoctorNotes::new(prescription, comment)) {
                    return Err(FlowError::PatientNotFound(name));
                }
                info!(patient = %name, "Doctor notes saved");
                Ok(DoctorOutcome::NotesSaved { name })
            }
        }
    }

    pub fn view(&self, records: &RecordStore) -> DoctorView {
        let Some(name) = self.current_patient(records) else {
            return DoctorView::NoPatients {
                message: NO_PATIENTS_MESSAGE,
            };
        };
        let Some(record) = records.get(name) else {
            return DoctorView::NoPatients {
                message: NO_PATIENTS_MESSAGE,
            };
        };

        DoctorView::Dashboard {
            patients: records.names(),
            selected: name.to_string(),
            report_text: record.report_text.clone(),
            saved_notes: record.doctor_notes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes(prescription: &str, comment: &str) -> DoctorEvent {
        DoctorEvent::SaveNotes {
            prescription: prescription.to_string(),
            comment: comment.to_string(),
        }
    }

    #[test]
    fn test_empty_store_shows_message_without_selector() {
        let flow = DoctorFlow::new();
        let records = RecordStore::new();

        assert_eq!(
            flow.view(&records),
            DoctorView::NoPatients {
                message: "No patient data available yet."
            }
        );
    }

    #[test]
    fn test_save_notes_with_empty_store_fails() {
        let mut flow = DoctorFlow::new();
        let mut records = RecordStore::new();

        let err = flow.handle(notes("x", "y"), &mut records).unwrap_err();
        assert_eq!(err, FlowError::NoPatients);
    }

    #[test]
    fn test_first_patient_is_selected_by_default() {
        let flow = DoctorFlow::new();
        let mut records = RecordStore::new();
        records.save_report("Asha", "BP 120/80");
        records.save_report("Ravi", "Hb 13.5");

        match flow.view(&records) {
            DoctorView::Dashboard {
                patients,
                selected,
                report_text,
                saved_notes,
            } => {
                assert_eq!(patients, vec!["Asha", "Ravi"]);
                assert_eq!(selected, "Asha");
                assert_eq!(report_text, "BP 120/80");
                assert!(saved_notes.is_none());
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[test]
    fn test_selecting_unknown_patient_fails() {
        let mut flow = DoctorFlow::new();
        let mut records = RecordStore::new();
        records.save_report("Asha", "BP 120/80");

        let err = flow
            .handle(
                DoctorEvent::SelectPatient {
                    name: "asha".to_string(),
                },
                &mut records,
            )
            .unwrap_err();
        assert_eq!(err, FlowError::PatientNotFound("asha".to_string()));
    }

    #[test]
    fn test_second_notes_save_overwrites_both_fields() {
        let mut flow = DoctorFlow::new();
        let mut records = RecordStore::new();
        records.save_report("Asha", "BP 120/80");
        records.save_report("Ravi", "Hb 13.5");

        flow.handle(
            DoctorEvent::SelectPatient {
                name: "Ravi".to_string(),
            },
            &mut records,
        )
        .unwrap();
        flow.handle(notes("Iron 100mg", "Recheck in 4 weeks"), &mut records)
            .unwrap();
        flow.handle(notes("Paracetamol 500mg", ""), &mut records)
            .unwrap();

        let saved = records.get("Ravi").unwrap().doctor_notes.clone().unwrap();
        assert_eq!(saved.prescription, "Paracetamol 500mg");
        assert_eq!(saved.comment, "");
        assert!(records.get("Asha").unwrap().doctor_notes.is_none());
    }
}
