//! Wire types for the file service.

use serde::{Deserialize, Serialize};

/// File types that can be previewed as text.
pub const TEXT_FILE_TYPES: [&str; 2] = ["txt", "json"];

// ============================================================================
// FILE METADATA
// ============================================================================

/// Server-issued record describing one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: i64,
    /// Storage key assigned by the server; addresses content and downloads.
    pub file_name: String,
    /// Name the file was uploaded under.
    pub original_file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub file_path: String,
    /// Raw ISO timestamp, with or without an offset.
    pub upload_time: String,
}

impl FileMetadata {
    /// Whether this file is eligible for in-app preview.
    pub fn is_text(&self) -> bool {
        is_text_type(&self.file_type)
    }
}

pub fn is_text_type(file_type: &str) -> bool {
    TEXT_FILE_TYPES
        .iter()
        .any(|text| text.eq_ignore_ascii_case(file_type))
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContentResponse {
    pub content: String,
    pub metadata: FileMetadata,
}

/// Upload acknowledgement. The service wraps the record as
/// `{ message, file }`; a bare record is accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum UploadResponse {
    Wrapped { file: FileMetadata },
    Bare(FileMetadata),
}

impl UploadResponse {
    pub(crate) fn into_metadata(self) -> FileMetadata {
        match self {
            UploadResponse::Wrapped { file } => file,
            UploadResponse::Bare(file) => file,
        }
    }
}
