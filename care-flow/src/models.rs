use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::FlowError;

/// Report text a patient saved for the doctor, plus whatever the doctor wrote back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub report_text: String,
    pub doctor_notes: Option<DoctorNotes>,
    pub saved_at: DateTime<Utc>,
}

impl PatientRecord {
    pub fn new(report_text: impl Into<String>) -> Self {
        Self {
            report_text: report_text.into(),
            doctor_notes: None,
            saved_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorNotes {
    pub prescription: String,
    pub comment: String,
    pub updated_at: DateTime<Utc>,
}

impl DoctorNotes {
    pub fn new(prescription: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            prescription: prescription.into(),
            comment: comment.into(),
            updated_at: Utc::now(),
        }
    }
}

/// File kinds accepted by the upload filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Png,
    Jpeg,
    Pdf,
}

impl UploadKind {
    /// Classify a file by its extension only; content is not inspected.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();

        match extension.as_str() {
            "png" => Some(UploadKind::Png),
            "jpg" | "jpeg" => Some(UploadKind::Jpeg),
            "pdf" => Some(UploadKind::Pdf),
            _ => None,
        }
    }
}

/// An uploaded report held in memory for the lifetime of the patient flow.
#[derive(Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub kind: UploadKind,
    pub bytes: Arc<[u8]>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Result<Self, FlowError> {
        let file_name = file_name.into();
        let kind = UploadKind::from_file_name(&file_name)
            .ok_or_else(|| FlowError::UnsupportedFileType(file_name.clone()))?;

        Ok(Self {
            file_name,
            kind,
            bytes: bytes.into(),
        })
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn info(&self) -> FileInfo {
        FileInfo {
            file_name: self.file_name.clone(),
            kind: self.kind,
            size_bytes: self.size_bytes(),
        }
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("kind", &self.kind)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

/// Metadata of an upload, safe to render in views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_name: String,
    pub kind: UploadKind,
    pub size_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_kind_from_extension() {
        assert_eq!(UploadKind::from_file_name("report.png"), Some(UploadKind::Png));
        assert_eq!(UploadKind::from_file_name("scan.JPG"), Some(UploadKind::Jpeg));
        assert_eq!(UploadKind::from_file_name("scan.jpeg"), Some(UploadKind::Jpeg));
        assert_eq!(UploadKind::from_file_name("labs.pdf"), Some(UploadKind::Pdf));
        assert_eq!(UploadKind::from_file_name("notes.txt"), None);
        assert_eq!(UploadKind::from_file_name("no_extension"), None);
    }

    #[test]
    fn test_uploaded_file_rejects_unknown_extension() {
        let err = UploadedFile::new("report.gif", vec![1u8, 2, 3]).unwrap_err();
        assert_eq!(err, FlowError::UnsupportedFileType("report.gif".to_string()));
    }
}
