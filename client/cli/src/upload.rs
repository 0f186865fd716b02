//! Upload panel: pick one local file, check its extension, send it.

use crate::api::{FileMetadata, TransferClient, TransferError};
use crate::format::format_kilobytes;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};
use std::path::{Path, PathBuf};

/// Extensions accepted for upload, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 9] =
    ["txt", "json", "jpg", "jpeg", "png", "gif", "pdf", "doc", "docx"];

pub const UPLOAD_FALLBACK: &str = "Failed to upload file";
pub const UPLOAD_SUCCESS: &str = "File uploaded successfully!";
const NOTHING_SELECTED: &str = "Please select a file first";

/// A file on local disk the user picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

impl LocalFile {
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            name: display_name(path),
            size: meta.len(),
        })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Check `name` against [`ALLOWED_EXTENSIONS`] using the text after the last dot.
pub fn validate_extension(name: &str) -> Result<(), TransferError> {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    if ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    {
        Ok(())
    } else {
        Err(TransferError::Validation {
            extension: extension.to_lowercase(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle { notice: Option<Notice> },
    FileSelected(LocalFile),
    Uploading(LocalFile),
    /// Upload failed; the selection is kept so the user can try again.
    Error { file: LocalFile, message: String },
}

/// Emitted once per successful upload; the listing refreshes on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded(FileMetadata),
}

#[derive(Debug, Clone)]
pub struct UploadPanel {
    state: UploadState,
    /// Path typed into the file input.
    input: String,
}

impl Default for UploadPanel {
    fn default() -> Self {
        Self {
            state: UploadState::Idle { notice: None },
            input: String::new(),
        }
    }
}

impl UploadPanel {
    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn push_char(&mut self, c: char) {
        if !self.is_uploading() {
            self.input.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if !self.is_uploading() {
            self.input.pop();
        }
    }

    pub fn selected(&self) -> Option<&LocalFile> {
        match &self.state {
            UploadState::FileSelected(file)
            | UploadState::Uploading(file)
            | UploadState::Error { file, .. } => Some(file),
            UploadState::Idle { .. } => None,
        }
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.state, UploadState::Uploading(_))
    }

    /// The upload action is enabled only with a valid selection and nothing
    /// in flight.
    pub fn can_upload(&self) -> bool {
        matches!(
            self.state,
            UploadState::FileSelected(_) | UploadState::Error { .. }
        )
    }

    /// Message currently shown under the button, if any.
    pub fn notice(&self) -> Option<Notice> {
        match &self.state {
            UploadState::Idle { notice } => notice.clone(),
            UploadState::Error { message, .. } => Some(Notice::Error(message.clone())),
            _ => None,
        }
    }

    pub fn select(&mut self, file: LocalFile) {
        if self.is_uploading() {
            return;
        }

        match validate_extension(&file.name) {
            Ok(()) => {
                tracing::debug!(name = %file.name, size = file.size, "file selected");
                self.state = UploadState::FileSelected(file);
            }
            Err(err) => {
                tracing::debug!(name = %file.name, "rejected file type");
                self.state = UploadState::Idle {
                    notice: Some(Notice::Error(err.to_string())),
                };
            }
        }
    }

    pub fn choose_path(&mut self, path: &Path) {
        if self.is_uploading() {
            return;
        }

        if let Err(err) = validate_extension(&display_name(path)) {
            self.state = UploadState::Idle {
                notice: Some(Notice::Error(err.to_string())),
            };
            return;
        }

        match LocalFile::from_path(path) {
            Ok(file) => self.select(file),
            Err(err) => {
                self.state = UploadState::Idle {
                    notice: Some(Notice::Error(format!(
                        "Could not read {}: {}",
                        path.display(),
                        err
                    ))),
                };
            }
        }
    }

    /// Choose whatever path is typed into the input.
    pub fn choose_input(&mut self) {
        let input = self.input.trim().to_string();
        if input.is_empty() {
            return;
        }
        self.choose_path(Path::new(&input));
    }

    /// Move to `Uploading` and hand back the file to send.
    pub fn begin_upload(&mut self) -> Option<LocalFile> {
        let file = match &self.state {
            UploadState::FileSelected(file) | UploadState::Error { file, .. } => file.clone(),
            UploadState::Uploading(_) => return None,
            // A rejection notice stays; it already says what went wrong.
            UploadState::Idle { notice: Some(Notice::Error(_)) } => return None,
            UploadState::Idle { .. } => {
                self.state = UploadState::Idle {
                    notice: Some(Notice::Error(NOTHING_SELECTED.to_string())),
                };
                return None;
            }
        };

        self.state = UploadState::Uploading(file.clone());
        Some(file)
    }

    pub fn finish(
        &mut self,
        result: Result<FileMetadata, TransferError>,
    ) -> Option<UploadOutcome> {
        let file = match std::mem::replace(&mut self.state, UploadState::Idle { notice: None }) {
            UploadState::Uploading(file) => file,
            other => {
                self.state = other;
                return None;
            }
        };

        match result {
            Ok(metadata) => {
                self.input.clear();
                self.state = UploadState::Idle {
                    notice: Some(Notice::Success(UPLOAD_SUCCESS.to_string())),
                };
                Some(UploadOutcome::Uploaded(metadata))
            }
            Err(err) => {
                tracing::warn!(name = %file.name, error = %err, "upload failed");
                self.state = UploadState::Error {
                    message: err.user_message(UPLOAD_FALLBACK),
                    file,
                };
                None
            }
        }
    }

    pub async fn submit(&mut self, client: &TransferClient) -> Option<UploadOutcome> {
        let file = self.begin_upload()?;
        let result = client.upload_file(&file.path).await;
        self.finish(result)
    }

    pub fn lines(&self, focused: bool) -> Vec<Line<'_>> {
        let cursor = if focused { "_" } else { "" };
        let prompt = if focused { "> " } else { "  " };
        let mut lines = vec![
            Line::from(format!("{}file: {}{}", prompt, self.input, cursor)),
            Line::from(Span::styled(
                format!("Supported formats: {}", ALLOWED_EXTENSIONS.join(", ")),
                Style::default().fg(Color::DarkGray),
            )),
        ];

        if let Some(file) = self.selected() {
            lines.push(Line::from(format!(
                "Selected: {} ({} KB)",
                file.name,
                format_kilobytes(file.size)
            )));
        }

        let button = if self.is_uploading() {
            "[Uploading...]"
        } else {
            "[ctrl+s] Upload File"
        };
        let button_style = if self.can_upload() {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(Span::styled(button, button_style)));

        match self.notice() {
            Some(Notice::Success(text)) => {
                lines.push(Line::from(Span::styled(text, Style::default().fg(Color::Green))));
            }
            Some(Notice::Error(text)) => {
                lines.push(Line::from(Span::styled(text, Style::default().fg(Color::Red))));
            }
            None => {}
        }

        lines
    }

    pub fn render(&self, f: &mut Frame, area: Rect, focused: bool) {
        let border = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let block = Block::bordered().title("Upload File").border_style(border);
        f.render_widget(Paragraph::new(self.lines(focused)).block(block), area);
    }
}
