//! Upload batch inputs and the aggregate result returned to clients.

use serde::Serialize;

/// A single file part received in an upload batch.
#[derive(Clone, Debug)]
pub struct IncomingFile {
    pub filename: String,
    pub data: Vec<u8>,
}

impl IncomingFile {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }
}

/// Classification of a batch as seen by the client.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Success,
    Warning,
    Error,
}

/// A file persisted by the batch.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    /// Filename as submitted.
    pub filename: String,
    /// Object key the payload was stored under.
    pub stored_as: String,
    /// Byte length of the submitted payload.
    pub size: u64,
}

/// A file skipped because identical content is already stored.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DuplicateFile {
    pub filename: String,
    /// Key of the stored object holding the same content.
    pub existing: String,
}

/// Aggregate outcome of one upload batch.
#[derive(Serialize, Clone, Debug)]
pub struct BatchReport {
    pub status: UploadStatus,
    pub message: String,
    pub container_name: String,
    pub uploaded_files: Vec<UploadedFile>,
    pub duplicate_files: Vec<DuplicateFile>,
}

impl BatchReport {
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            status: UploadStatus::Warning,
            message: String::new(),
            container_name: container_name.into(),
            uploaded_files: Vec::new(),
            duplicate_files: Vec::new(),
        }
    }

    /// Set `status` and `message` from the uploaded/duplicate lists.
    pub fn classify(&mut self) {
        let (status, message) = match (
            self.uploaded_files.is_empty(),
            self.duplicate_files.is_empty(),
        ) {
            (false, true) => (UploadStatus::Success, "Files uploaded successfully."),
            (true, false) => (
                UploadStatus::Warning,
                "All files already exist in this case; nothing was uploaded.",
            ),
            (false, false) => (
                UploadStatus::Warning,
                "Some files were uploaded; others already exist in this case.",
            ),
            (true, true) => (UploadStatus::Warning, "Nothing uploaded."),
        };
        self.status = status;
        self.message = message.to_string();
    }

    /// Mark the batch as failed, keeping the lists gathered so far.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = UploadStatus::Error;
        self.message = message.into();
    }
}
