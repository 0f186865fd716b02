//! Content viewer for a single text file.

use crate::api::{FileContentResponse, FileMetadata, TransferClient, TransferError};
use crate::download::DownloadRequest;
use crate::format::{format_size, format_upload_time};
use crate::listing;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Text},
    widgets::{Block, Paragraph, Wrap},
    Frame,
};

pub const CONTENT_FALLBACK: &str = "Failed to load file content";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerState {
    Loading,
    Failed(String),
    Loaded(FileContentResponse),
}

#[derive(Debug, Clone)]
pub struct ContentViewer {
    file_name: String,
    state: ViewerState,
    scroll: u16,
}

impl ContentViewer {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            state: ViewerState::Loading,
            scroll: 0,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub async fn load(&mut self, client: &TransferClient) {
        let result = client.fetch_content(&self.file_name).await;
        self.apply(result);
    }

    /// Settle a pending fetch. Once settled the viewer never refetches.
    pub fn apply(&mut self, result: Result<FileContentResponse, TransferError>) {
        if self.state != ViewerState::Loading {
            return;
        }

        self.state = match result {
            Ok(response) => ViewerState::Loaded(response),
            Err(err) => {
                tracing::warn!(file_name = %self.file_name, error = %err, "failed to load file content");
                ViewerState::Failed(err.user_message(CONTENT_FALLBACK))
            }
        };
    }

    /// Download using the metadata already fetched.
    pub fn download_request(&self, client: &TransferClient) -> Option<DownloadRequest> {
        match &self.state {
            ViewerState::Loaded(response) => {
                Some(listing::download_request(client, &response.metadata))
            }
            _ => None,
        }
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        match &self.state {
            ViewerState::Loading => {
                let paragraph = Paragraph::new("loading...").block(Block::bordered());
                f.render_widget(paragraph, area);
            }
            ViewerState::Failed(message) => {
                let lines = vec![
                    Line::styled("Error", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                    Line::from(""),
                    Line::from(message.as_str()),
                    Line::from(""),
                    Line::from("[b] Go Back"),
                ];
                let paragraph = Paragraph::new(lines)
                    .wrap(Wrap { trim: false })
                    .block(Block::bordered().border_style(Style::default().fg(Color::Red)));
                f.render_widget(paragraph, area);
            }
            ViewerState::Loaded(response) => self.render_loaded(f, area, response),
        }
    }

    fn render_loaded(&self, f: &mut Frame, area: Rect, response: &FileContentResponse) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0)])
            .split(area);

        let header = vec![
            Line::styled(
                response.metadata.original_file_name.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Line::styled(
                metadata_strip(&response.metadata),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        f.render_widget(Paragraph::new(header).block(Block::bordered()), layout[0]);

        // Tabs have no width in the terminal buffer.
        let content = Text::raw(response.content.replace('\t', "    "));
        let body = Paragraph::new(content)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .block(Block::bordered());
        f.render_widget(body, layout[1]);
    }
}

pub fn metadata_strip(metadata: &FileMetadata) -> String {
    format!(
        "Type: {}  Size: {}  Uploaded: {}",
        metadata.file_type.to_uppercase(),
        format_size(metadata.file_size),
        format_upload_time(&metadata.upload_time)
    )
}
