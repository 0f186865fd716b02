//! Listing panel: the table of known files.

use crate::api::{FileMetadata, TransferClient};
use crate::download::DownloadRequest;
use crate::format::{format_size, format_upload_time};
use crate::tui::Route;
use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

pub const EMPTY_TITLE: &str = "No files uploaded";
pub const EMPTY_HINT: &str = "Upload your first file to get started.";

const HEADER: [&str; 5] = ["File", "Type", "Size", "Upload Date", "Actions"];

pub fn file_icon(file_type: &str) -> &'static str {
    match file_type.to_lowercase().as_str() {
        "txt" => "📄",
        "json" => "📋",
        "jpg" | "jpeg" | "png" | "gif" => "🖼️",
        "pdf" => "📕",
        "doc" | "docx" => "📘",
        _ => "📁",
    }
}

/// Display model for one listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow<'a> {
    pub icon: &'static str,
    pub name: &'a str,
    pub file_type: String,
    pub size: String,
    pub uploaded: String,
    /// Present only for files that can be previewed.
    pub view: Option<Route>,
}

impl<'a> ListingRow<'a> {
    pub fn from_metadata(file: &'a FileMetadata) -> Self {
        Self {
            icon: file_icon(&file.file_type),
            name: &file.original_file_name,
            file_type: file.file_type.to_uppercase(),
            size: format_size(file.file_size),
            uploaded: format_upload_time(&file.upload_time),
            view: file
                .is_text()
                .then(|| Route::File(file.file_name.clone())),
        }
    }

    pub fn actions(&self) -> &'static str {
        if self.view.is_some() {
            "View  Download"
        } else {
            "Download"
        }
    }
}

pub fn rows(files: &[FileMetadata]) -> Vec<ListingRow<'_>> {
    files.iter().map(ListingRow::from_metadata).collect()
}

/// Download action for a row: fetch by storage key, save under the
/// original name.
pub fn download_request(client: &TransferClient, file: &FileMetadata) -> DownloadRequest {
    DownloadRequest {
        url: client.download_url(&file.file_name),
        suggested_name: file.original_file_name.clone(),
    }
}

pub fn render(f: &mut Frame, area: Rect, files: &[FileMetadata], state: &mut TableState) {
    if files.is_empty() {
        render_empty(f, area);
        return;
    }

    let header = Row::new(HEADER.iter().map(|h| Cell::from(*h)))
        .style(Style::default().add_modifier(Modifier::BOLD));

    let table_rows = rows(files).into_iter().map(|row| {
        let actions = row.actions();
        Row::new(vec![
            Cell::from(format!("{} {}", row.icon, row.name)),
            Cell::from(row.file_type),
            Cell::from(row.size),
            Cell::from(row.uploaded),
            Cell::from(actions),
        ])
    });

    let widths = [
        Constraint::Min(24),
        Constraint::Length(6),
        Constraint::Length(11),
        Constraint::Length(22),
        Constraint::Length(15),
    ];

    let table = Table::new(table_rows, widths)
        .header(header)
        .block(Block::bordered().title("Your Files"))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .highlight_symbol("> ");

    f.render_stateful_widget(table, area, state);
}

fn render_empty(f: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from("📁"),
        Line::styled(EMPTY_TITLE, Style::default().add_modifier(Modifier::BOLD)),
        Line::styled(EMPTY_HINT, Style::default().fg(Color::DarkGray)),
    ];
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::bordered());
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use ratatui::{backend::TestBackend, Terminal};

    fn metadata(file_type: &str, size: u64) -> FileMetadata {
        FileMetadata {
            id: 1,
            file_name: format!("0b9e.{}", file_type.to_lowercase()),
            original_file_name: format!("picture.{}", file_type.to_lowercase()),
            file_type: file_type.to_string(),
            file_size: size,
            file_path: "uploads/0b9e".to_string(),
            upload_time: "2024-03-01T10:05:00Z".to_string(),
        }
    }

    fn draw(files: &[FileMetadata]) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 12)).unwrap();
        let mut state = TableState::default();
        terminal
            .draw(|f| {
                let area = f.area();
                render(f, area, files, &mut state)
            })
            .unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_icons() {
        assert_eq!(file_icon("txt"), "📄");
        assert_eq!(file_icon("JSON"), "📋");
        assert_eq!(file_icon("gif"), "🖼️");
        assert_eq!(file_icon("pdf"), "📕");
        assert_eq!(file_icon("Docx"), "📘");
        assert_eq!(file_icon("zip"), "📁");
    }

    #[test]
    fn test_png_row() {
        let file = metadata("PNG", 2048);
        let row = ListingRow::from_metadata(&file);
        assert_eq!(row.size, "2 KB");
        assert_eq!(row.icon, "🖼️");
        assert_eq!(row.view, None);
        assert_eq!(row.actions(), "Download");
        assert_eq!(row.uploaded, "Mar 1, 2024, 10:05 AM");
    }

    #[test]
    fn test_view_only_for_text_types() {
        for (file_type, viewable) in [
            ("txt", true),
            ("TXT", true),
            ("Json", true),
            ("pdf", false),
            ("docx", false),
            ("jpeg", false),
        ] {
            let file = metadata(file_type, 10);
            let row = ListingRow::from_metadata(&file);
            assert_eq!(row.view.is_some(), viewable, "{}", file_type);
        }

        let file = metadata("txt", 10);
        assert_eq!(
            ListingRow::from_metadata(&file).view,
            Some(Route::File("0b9e.txt".to_string()))
        );
    }

    #[test]
    fn test_download_request_keeps_names_apart() {
        let config = ServiceConfig::from_url("http://localhost:8080/api/files").unwrap();
        let client = TransferClient::new(&config).unwrap();
        let file = metadata("pdf", 10);

        let request = download_request(&client, &file);
        assert_eq!(
            request.url.as_str(),
            "http://localhost:8080/api/files/download/0b9e.pdf"
        );
        assert_eq!(request.suggested_name, "picture.pdf");
    }

    #[test]
    fn test_empty_state_iff_no_files() {
        let screen = draw(&[]);
        assert!(screen.contains(EMPTY_TITLE));
        assert!(!screen.contains("Upload Date"));

        let screen = draw(&[metadata("txt", 5)]);
        assert!(!screen.contains(EMPTY_TITLE));
        assert!(screen.contains("Your Files"));
        assert!(screen.contains("Upload Date"));
        assert!(screen.contains("View  Download"));
    }
}
