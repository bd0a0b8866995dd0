pub mod adapter;
pub mod doctor;
pub mod error;
pub mod models;
pub mod patient;
pub mod runner;
pub mod session;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use adapter::{Adapters, Summarizer, TextExtractor};
pub use doctor::{DoctorEvent, DoctorFlow, DoctorOutcome, DoctorView, NO_PATIENTS_MESSAGE};
pub use error::{ExtractionError, FlowError, RemoteApiError, Result};
pub use models::{DoctorNotes, FileInfo, PatientRecord, UploadKind, UploadedFile};
pub use patient::{PatientEvent, PatientFlow, PatientOutcome, PatientState, PatientView};
pub use runner::{FlowRunner, RunResult};
pub use session::{EventOutcome, Mode, Session, SessionEvent, SessionView};
pub use storage::{InMemorySessionStorage, SessionStorage};
pub use store::RecordStore;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct EchoExtractor;

    #[async_trait]
    impl TextExtractor for EchoExtractor {
        fn name(&self) -> &str {
            "echo"
        }

        async fn extract_text(&self, file: &UploadedFile) -> std::result::Result<String, ExtractionError> {
            Ok(String::from_utf8_lossy(&file.bytes).into_owned())
        }
    }

    struct SlowSummarizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Summarizer for SlowSummarizer {
        async fn summarize_and_translate(&self, text: &str) -> std::result::Result<String, RemoteApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(format!("सारांश: {}", text))
        }
    }

    fn runner() -> (FlowRunner, Arc<SlowSummarizer>) {
        let summarizer = Arc::new(SlowSummarizer {
            calls: AtomicUsize::new(0),
        });
        let adapters = Adapters::new(Arc::new(EchoExtractor), summarizer.clone());
        (
            FlowRunner::new(Arc::new(InMemorySessionStorage::new()), adapters),
            summarizer,
        )
    }

    fn upload(name: &str, text: &str) -> SessionEvent {
        SessionEvent::Patient(PatientEvent::Upload {
            file_name: name.to_string(),
            bytes: Arc::from(text.as_bytes()),
        })
    }

    #[tokio::test]
    async fn test_patient_to_doctor_round_trip() {
        let (runner, _) = runner();
        let session = runner.create_session().await.unwrap();
        let id = session.id.as_str();

        runner.run(id, upload("report.png", "BP 120/80")).await.unwrap();
        runner
            .run(
                id,
                SessionEvent::Patient(PatientEvent::Save {
                    name: "Asha".to_string(),
                }),
            )
            .await
            .unwrap();

        let result = runner
            .run(id, SessionEvent::SwitchMode(Mode::Doctor))
            .await
            .unwrap();
        match result.view {
            SessionView::Doctor {
                doctor: DoctorView::Dashboard {
                    patients,
                    report_text,
                    ..
                },
            } => {
                assert_eq!(patients, vec!["Asha"]);
                assert_eq!(report_text, "BP 120/80");
            }
            other => panic!("unexpected view: {:?}", other),
        }

        runner
            .run(
                id,
                SessionEvent::Doctor(DoctorEvent::SelectPatient {
                    name: "Asha".to_string(),
                }),
            )
            .await
            .unwrap();
        runner
            .run(
                id,
                SessionEvent::Doctor(DoctorEvent::SaveNotes {
                    prescription: "Paracetamol 500mg".to_string(),
                    comment: "After meals".to_string(),
                }),
            )
            .await
            .unwrap();

        match runner.view(id).await.unwrap() {
            SessionView::Doctor {
                doctor: DoctorView::Dashboard { saved_notes, .. },
            } => {
                let notes = saved_notes.unwrap();
                assert_eq!(notes.prescription, "Paracetamol 500mg");
                assert_eq!(notes.comment, "After meals");
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_events_for_inactive_mode_are_rejected() {
        let (runner, _) = runner();
        let session = runner.create_session().await.unwrap();

        let err = runner
            .run(
                &session.id,
                SessionEvent::Doctor(DoctorEvent::SelectPatient {
                    name: "Asha".to_string(),
                }),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            FlowError::WrongMode {
                expected: Mode::Doctor,
                actual: Mode::Patient
            }
        );
    }

    #[tokio::test]
    async fn test_upload_filter_runs_after_session_and_mode_checks() {
        let (runner, _) = runner();

        let err = runner
            .run("missing", upload("scan.gif", "GIF89a"))
            .await
            .unwrap_err();
        assert_eq!(err, FlowError::SessionNotFound("missing".to_string()));

        let session = runner.create_session().await.unwrap();
        runner
            .run(&session.id, SessionEvent::SwitchMode(Mode::Doctor))
            .await
            .unwrap();
        let err = runner
            .run(&session.id, upload("scan.gif", "GIF89a"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FlowError::WrongMode {
                expected: Mode::Patient,
                actual: Mode::Doctor
            }
        );

        runner
            .run(&session.id, SessionEvent::SwitchMode(Mode::Patient))
            .await
            .unwrap();
        let err = runner
            .run(&session.id, upload("scan.gif", "GIF89a"))
            .await
            .unwrap_err();
        assert_eq!(err, FlowError::UnsupportedFileType("scan.gif".to_string()));
    }

    #[tokio::test]
    async fn test_events_for_one_session_are_serialized() {
        let (runner, summarizer) = runner();
        let session = runner.create_session().await.unwrap();
        let id = session.id.clone();

        runner.run(&id, upload("labs.png", "Hb 13.5")).await.unwrap();

        let slow = {
            let runner = runner.clone();
            let id = id.clone();
            tokio::spawn(async move {
                runner
                    .run(&id, SessionEvent::Patient(PatientEvent::Summarize))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let saved = runner
            .run(
                &id,
                SessionEvent::Patient(PatientEvent::Save {
                    name: "Ravi".to_string(),
                }),
            )
            .await
            .unwrap();
        slow.await.unwrap().unwrap();

        // The save waited for the summary, so neither change was lost.
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
        match saved.view {
            SessionView::Patient { patient } => {
                assert_eq!(patient.state, "saved");
                assert_eq!(patient.summary.as_deref(), Some("सारांश: Hb 13.5"));
            }
            other => panic!("unexpected view: {:?}", other),
        }
        let stored = runner.storage().get(&id).await.unwrap().unwrap();
        assert_eq!(stored.records.get("Ravi").unwrap().report_text, "Hb 13.5");
    }

    #[tokio::test]
    async fn test_unknown_and_ended_sessions() {
        let (runner, _) = runner();

        let err = runner
            .run("missing", SessionEvent::SwitchMode(Mode::Doctor))
            .await
            .unwrap_err();
        assert_eq!(err, FlowError::SessionNotFound("missing".to_string()));

        let session = runner.create_session().await.unwrap();
        runner.end_session(&session.id).await.unwrap();
        assert!(runner.view(&session.id).await.is_err());
        assert_eq!(runner.storage().count().await.unwrap(), 0);
    }
}
