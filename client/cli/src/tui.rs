use crate::api::{FileMetadata, TransferClient};
use crate::download::{DownloadRequest, Downloader};
use crate::listing;
use crate::upload::{LocalFile, UploadOutcome, UploadPanel};
use crate::viewer::ContentViewer;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, TableState},
    Frame, Terminal,
};
use std::fmt;
use std::io;
use std::str::FromStr;
use std::time::Duration;

const DOWNLOAD_FALLBACK: &str = "Failed to download file";

/// Where the shell is: the listing page or one file's viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    File(String),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => write!(f, "/"),
            Route::File(file_name) => write!(f, "/file/{}", file_name),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown route: {0}")]
pub struct UnknownRoute(String);

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "/" => Ok(Route::Home),
            other => match other.strip_prefix("/file/") {
                Some(file_name) if !file_name.is_empty() && !file_name.contains('/') => {
                    Ok(Route::File(file_name.to_string()))
                }
                _ => Err(UnknownRoute(other.to_string())),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Listing,
    Upload,
}

/// Network work queued by a key press, run before the next key is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    LoadListing,
    Upload(LocalFile),
    LoadContent,
    Download(DownloadRequest),
}

pub struct App {
    client: TransferClient,
    downloader: Box<dyn Downloader>,
    route: Route,
    files: Vec<FileMetadata>,
    listing_loaded: bool,
    table: TableState,
    upload: UploadPanel,
    viewer: Option<ContentViewer>,
    focus: Focus,
    status: Option<String>,
    pending: Option<Task>,
    finished: bool,
}

impl App {
    pub fn new(client: TransferClient, downloader: Box<dyn Downloader>, open: Route) -> Self {
        let mut app = Self {
            client,
            downloader,
            route: Route::Home,
            files: Vec::new(),
            listing_loaded: false,
            table: TableState::default(),
            upload: UploadPanel::default(),
            viewer: None,
            focus: Focus::Listing,
            status: None,
            pending: None,
            finished: false,
        };
        app.navigate(open);
        app
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn files(&self) -> &[FileMetadata] {
        &self.files
    }

    pub fn upload(&self) -> &UploadPanel {
        &self.upload
    }

    pub fn viewer(&self) -> Option<&ContentViewer> {
        self.viewer.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn pending(&self) -> Option<&Task> {
        self.pending.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Entering a route mounts it: home fetches the listing, a file route
    /// fetches that file's content.
    pub fn navigate(&mut self, route: Route) {
        match &route {
            Route::Home => {
                self.viewer = None;
                self.pending = Some(Task::LoadListing);
            }
            Route::File(file_name) => {
                self.viewer = Some(ContentViewer::new(file_name.clone()));
                self.pending = Some(Task::LoadContent);
            }
        }
        tracing::debug!(route = %route, "navigate");
        self.status = None;
        self.route = route;
    }

    fn selected_file(&self) -> Option<&FileMetadata> {
        self.table.selected().and_then(|i| self.files.get(i))
    }

    fn move_selection(&mut self, forward: bool) {
        if self.files.is_empty() {
            self.table.select(None);
            return;
        }

        let last = self.files.len() - 1;
        let next = match self.table.selected() {
            None => 0,
            Some(i) if forward => (i + 1).min(last),
            Some(i) => i.saturating_sub(1),
        };
        self.table.select(Some(next));
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.finished = true;
            return;
        }

        match self.route {
            Route::Home => match self.focus {
                Focus::Listing => self.listing_key(key),
                Focus::Upload => self.upload_key(key),
            },
            Route::File(_) => self.viewer_key(key),
        }
    }

    fn listing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.finished = true,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(false),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(true),
            KeyCode::Char('r') => self.pending = Some(Task::LoadListing),
            KeyCode::Char('u') | KeyCode::Tab => self.focus = Focus::Upload,
            KeyCode::Enter | KeyCode::Char('v') => {
                let Some(file) = self.selected_file() else {
                    return;
                };
                if file.is_text() {
                    let route = Route::File(file.file_name.clone());
                    self.navigate(route);
                } else {
                    self.status = Some("preview is only available for txt and json files".to_string());
                }
            }
            KeyCode::Char('d') => {
                if let Some(file) = self.selected_file() {
                    let request = listing::download_request(&self.client, file);
                    self.pending = Some(Task::Download(request));
                }
            }
            _ => {}
        }
    }

    fn upload_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('s') {
                if let Some(file) = self.upload.begin_upload() {
                    self.pending = Some(Task::Upload(file));
                }
            }
            return;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Tab => self.focus = Focus::Listing,
            KeyCode::Enter => self.upload.choose_input(),
            KeyCode::Backspace => self.upload.pop_char(),
            KeyCode::Char(c) => self.upload.push_char(c),
            _ => {}
        }
    }

    fn viewer_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.finished = true,
            KeyCode::Char('b') | KeyCode::Esc | KeyCode::Backspace => self.navigate(Route::Home),
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.scroll_up();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.scroll_down();
                }
            }
            KeyCode::Char('d') => {
                let request = self
                    .viewer
                    .as_ref()
                    .and_then(|viewer| viewer.download_request(&self.client));
                if let Some(request) = request {
                    self.pending = Some(Task::Download(request));
                }
            }
            _ => {}
        }
    }

    /// Run the pending task, if any. A successful upload queues exactly one
    /// listing refresh.
    pub async fn run_task(&mut self) {
        let Some(task) = self.pending.take() else {
            return;
        };

        match task {
            Task::LoadListing => self.refresh_listing().await,
            Task::Upload(file) => {
                let result = self.client.upload_file(&file.path).await;
                if let Some(UploadOutcome::Uploaded(metadata)) = self.upload.finish(result) {
                    self.status = Some(format!("uploaded {}", metadata.original_file_name));
                    self.pending = Some(Task::LoadListing);
                }
            }
            Task::LoadContent => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.load(&self.client).await;
                }
            }
            Task::Download(request) => {
                match self
                    .downloader
                    .trigger_download(&request.url, &request.suggested_name)
                    .await
                {
                    Ok(path) => self.status = Some(format!("saved {}", path.display())),
                    Err(err) => {
                        tracing::warn!(url = %request.url, error = %err, "download failed");
                        self.status = Some(err.user_message(DOWNLOAD_FALLBACK));
                    }
                }
            }
        }
    }

    /// Run tasks until nothing is queued.
    pub async fn settle(&mut self) {
        while self.pending.is_some() {
            self.run_task().await;
        }
    }

    async fn refresh_listing(&mut self) {
        match self.client.list_files().await {
            Ok(files) => {
                self.files = files;
                let selection = match self.table.selected() {
                    _ if self.files.is_empty() => None,
                    Some(i) => Some(i.min(self.files.len() - 1)),
                    None => Some(0),
                };
                self.table.select(selection);
            }
            Err(err) => {
                // Not shown; the previous listing stays on screen.
                tracing::error!(error = %err, "failed to fetch file listing");
            }
        }
        self.listing_loaded = true;
    }
}

pub async fn run(client: TransferClient, downloader: Box<dyn Downloader>, open: Route) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(client, downloader, open);
    let result = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        // Handle async operations
        if app.pending.is_some() {
            app.run_task().await;
            continue;
        }

        if app.is_finished() {
            return Ok(());
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let area = f.area();

    match app.route.clone() {
        Route::Home => {
            let layout = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints([
                    Constraint::Length(2),
                    Constraint::Length(7),
                    Constraint::Min(0),
                    Constraint::Length(1),
                ])
                .split(area);

            let header = vec![
                Line::styled("Files", Style::default().add_modifier(Modifier::BOLD)),
                Line::from("All uploaded files with their name, type, size and upload date."),
            ];
            f.render_widget(Paragraph::new(header), layout[0]);

            app.upload.render(f, layout[1], app.focus == Focus::Upload);

            if app.listing_loaded {
                listing::render(f, layout[2], &app.files, &mut app.table);
            } else {
                f.render_widget(Paragraph::new("loading..."), layout[2]);
            }

            let hints = match app.focus {
                Focus::Listing => "[↑↓] select  [enter] view  [d] download  [u] upload  [r] refresh  [q] quit",
                Focus::Upload => "[enter] choose file  [ctrl+s] upload  [esc] back to list",
            };
            f.render_widget(status_line(app.status.as_deref(), hints), layout[3]);
        }
        Route::File(_) => {
            let layout = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(area);

            if let Some(viewer) = &app.viewer {
                viewer.render(f, layout[0]);
            }
            let hints = "[↑↓] scroll  [d] download  [b] back  [q] quit";
            f.render_widget(status_line(app.status.as_deref(), hints), layout[1]);
        }
    }
}

fn status_line<'a>(status: Option<&'a str>, hints: &'a str) -> Paragraph<'a> {
    let mut spans = Vec::new();
    if let Some(status) = status {
        spans.push(Span::styled(format!("* {}  ", status), Style::default().fg(Color::Yellow)));
    }
    spans.push(Span::styled(hints, Style::default().fg(Color::DarkGray)));
    Paragraph::new(Line::from(spans))
}
