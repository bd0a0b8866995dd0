use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapter::Adapters;
use crate::error::{FlowError, Result};
use crate::models::{FileInfo, UploadedFile};
use crate::store::RecordStore;

/// Where the patient currently is in the upload → extract → summarize → save sequence.
#[derive(Debug, Clone, Default)]
pub enum PatientState {
    #[default]
    Idle,
    FileUploaded {
        file: UploadedFile,
    },
    TextExtracted {
        file: UploadedFile,
        text: String,
    },
    Summarized {
        file: UploadedFile,
        text: String,
        summary: String,
    },
    Saved {
        file: UploadedFile,
        text: String,
        summary: Option<String>,
        name: String,
    },
}

impl PatientState {
    pub fn name(&self) -> &'static str {
        match self {
            PatientState::Idle => "idle",
            PatientState::FileUploaded { .. } => "file_uploaded",
            PatientState::TextExtracted { .. } => "text_extracted",
            PatientState::Summarized { .. } => "summarized",
            PatientState::Saved { .. } => "saved",
        }
    }

    fn file(&self) -> Option<&UploadedFile> {
        match self {
            PatientState::Idle => None,
            PatientState::FileUploaded { file }
            | PatientState::TextExtracted { file, .. }
            | PatientState::Summarized { file, .. }
            | PatientState::Saved { file, .. } => Some(file),
        }
    }

    fn text(&self) -> Option<&str> {
        match self {
            PatientState::TextExtracted { text, .. }
            | PatientState::Summarized { text, .. }
            | PatientState::Saved { text, .. } => Some(text),
            _ => None,
        }
    }

    fn summary(&self) -> Option<&str> {
        match self {
            PatientState::Summarized { summary, .. } => Some(summary),
            PatientState::Saved { summary, .. } => summary.as_deref(),
            _ => None,
        }
    }
}

/// Discrete inputs the patient side can produce.
#[derive(Debug, Clone)]
pub enum PatientEvent {
    /// A new file was selected; it is checked against the upload filter and
    /// extraction runs right after.
    Upload { file_name: String, bytes: Arc<[u8]> },
    /// Run OCR again on the current file.
    Extract,
    Summarize,
    Save { name: String },
    Reset,
}

impl PatientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PatientEvent::Upload { .. } => "upload",
            PatientEvent::Extract => "extract",
            PatientEvent::Summarize => "summarize",
            PatientEvent::Save { .. } => "save",
            PatientEvent::Reset => "reset",
        }
    }
}

/// What a handled patient event produced, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PatientOutcome {
    Extracted { text: String },
    Summarized { summary: String },
    Saved { name: String, replaced: bool },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientView {
    pub state: &'static str,
    pub file: Option<FileInfo>,
    pub extracted_text: Option<String>,
    pub summary: Option<String>,
    pub saved_as: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PatientFlow {
    state: PatientState,
}

impl PatientFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PatientState {
        &self.state
    }

    pub async fn handle(
        &mut self,
        event: PatientEvent,
        records: &mut RecordStore,
        adapters: &Adapters,
    ) -> Result<PatientOutcome> {
        match event {
            PatientEvent::Upload { file_name, bytes } => {
                let file = UploadedFile::new(file_name, bytes)?;
                info!(
                    file_name = %file.file_name,
                    size_bytes = file.size_bytes(),
                    "Patient uploaded a report"
                );
                self.extract(file, adapters).await
            }
            PatientEvent::Extract => {
                let file = self
                    .state
                    .file()
                    .cloned()
                    .ok_or_else(|| self.invalid("extract"))?;
                self.extract(file, adapters).await
            }
            PatientEvent::Summarize => self.summarize(adapters).await,
            PatientEvent::Save { name } => self.save(name, records),
            PatientEvent::Reset => {
                self.state = PatientState::Idle;
                Ok(PatientOutcome::Reset)
            }
        }
    }

    /// Enters `FileUploaded`, then runs OCR once. On failure the flow stays in
    /// `FileUploaded` so the same file can be extracted again.
    async fn extract(&mut self, file: UploadedFile, adapters: &Adapters) -> Result<PatientOutcome> {
        self.state = PatientState::FileUploaded { file: file.clone() };

        let text = match adapters.extractor.extract_text(&file).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    backend = adapters.extractor.name(),
                    error = %e,
                    "Text extraction failed"
                );
                return Err(e.into());
            }
        };

        info!(
            backend = adapters.extractor.name(),
            characters = text.chars().count(),
            "Extracted text from report"
        );

        self.state = PatientState::TextExtracted {
            file,
            text: text.clone(),
        };
        Ok(PatientOutcome::Extracted { text })
    }

    async fn summarize(&mut self, adapters: &Adapters) -> Result<PatientOutcome> {
        let text = self
            .state
            .text()
            .map(str::to_string)
            .ok_or_else(|| self.invalid("summarize"))?;

        let summary = adapters.summarizer.summarize_and_translate(&text).await?;
        info!(characters = summary.chars().count(), "Report summarized");

        self.state = match std::mem::take(&mut self.state) {
            PatientState::TextExtracted { file, text } | PatientState::Summarized { file, text, .. } => {
                PatientState::Summarized {
                    file,
                    text,
                    summary: summary.clone(),
                }
            }
            PatientState::Saved {
                file, text, name, ..
            } => PatientState::Saved {
                file,
                text,
                summary: Some(summary.clone()),
                name,
            },
            other => other,
        };

        Ok(PatientOutcome::Summarized { summary })
    }

    fn save(&mut self, name: String, records: &mut RecordStore) -> Result<PatientOutcome> {
        let text = self
            .state
            .text()
            .map(str::to_string)
            .ok_or_else(|| self.invalid("save"))?;

        if name.trim().is_empty() {
            warn!("Save rejected: patient name is blank");
            return Err(FlowError::MissingPatientName);
        }

        let replaced = records.save_report(&name, &text).is_some();
        info!(patient = %name, replaced, "Report saved for doctor");

        self.state = match std::mem::take(&mut self.state) {
            PatientState::TextExtracted { file, text } => PatientState::Saved {
                file,
                text,
                summary: None,
                name: name.clone(),
            },
            PatientState::Summarized {
                file,
                text,
                summary,
            } => PatientState::Saved {
                file,
                text,
                summary: Some(summary),
                name: name.clone(),
            },
            PatientState::Saved {
                file,
                text,
                summary,
                ..
            } => PatientState::Saved {
                file,
                text,
                summary,
                name: name.clone(),
            },
            other => other,
        };

        Ok(PatientOutcome::Saved { name, replaced })
    }

    fn invalid(&self, event: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            state: self.state.name(),
            event,
        }
    }

    pub fn view(&self) -> PatientView {
        PatientView {
            state: self.state.name(),
            file: self.state.file().map(UploadedFile::info),
            extracted_text: self.state.text().map(str::to_string),
            summary: self.state.summary().map(str::to_string),
            saved_as: match &self.state {
                PatientState::Saved { name, .. } => Some(name.clone()),
                _ => None,
            },
        }
    }
}
