use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapter::Adapters;
use crate::doctor::{DoctorEvent, DoctorFlow, DoctorOutcome, DoctorView};
use crate::error::{FlowError, Result};
use crate::patient::{PatientEvent, PatientFlow, PatientOutcome, PatientView};
use crate::store::RecordStore;

/// The two mutually exclusive views of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Patient,
    Doctor,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    SwitchMode(Mode),
    Patient(PatientEvent),
    Doctor(DoctorEvent),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SwitchMode(_) => "switch_mode",
            SessionEvent::Patient(event) => event.name(),
            SessionEvent::Doctor(event) => event.name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventOutcome {
    ModeSwitched { mode: Mode },
    Patient(PatientOutcome),
    Doctor(DoctorOutcome),
}

/// Rendering of whichever flow is active.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SessionView {
    Patient { patient: PatientView },
    Doctor { doctor: DoctorView },
}

/// One interactive user session: the mode switch, both flows and the records they share.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub mode: Mode,
    pub created_at: DateTime<Utc>,
    pub patient: PatientFlow,
    pub doctor: DoctorFlow,
    pub records: RecordStore,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mode: Mode::default(),
            created_at: Utc::now(),
            patient: PatientFlow::new(),
            doctor: DoctorFlow::new(),
            records: RecordStore::new(),
        }
    }

    pub fn new_random() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub async fn handle(&mut self, event: SessionEvent, adapters: &Adapters) -> Result<EventOutcome> {
        match event {
            SessionEvent::SwitchMode(mode) => {
                info!(from = ?self.mode, to = ?mode, "Switching mode");
                self.mode = mode;
                Ok(EventOutcome::ModeSwitched { mode })
            }
            SessionEvent::Patient(event) => {
                self.require_mode(Mode::Patient)?;
                self.patient
                    .handle(event, &mut self.records, adapters)
                    .await
                    .map(EventOutcome::Patient)
            }
            SessionEvent::Doctor(event) => {
                self.require_mode(Mode::Doctor)?;
                self.doctor
                    .handle(event, &mut self.records)
                    .map(EventOutcome::Doctor)
            }
        }
    }

    fn require_mode(&self, expected: Mode) -> Result<()> {
        if self.mode != expected {
            return Err(FlowError::WrongMode {
                expected,
                actual: self.mode,
            });
        }
        Ok(())
    }

    pub fn view(&self) -> SessionView {
        match self.mode {
            Mode::Patient => SessionView::Patient {
                patient: self.patient.view(),
            },
            Mode::Doctor => SessionView::Doctor {
                doctor: self.doctor.view(&self.records),
            },
        }
    }
}
