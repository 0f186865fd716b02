use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod download;
mod format;
mod listing;
#[cfg(test)]
mod test_support;
mod tui;
mod upload;
mod viewer;

use api::TransferClient;
use config::Config;
use download::{Downloader, FileSaver};
use tui::Route;
use upload::{Notice, UploadOutcome, UploadPanel, UPLOAD_FALLBACK};
use viewer::{ContentViewer, ViewerState};

#[derive(Parser)]
#[command(name = "filedesk")]
#[command(about = "Upload, browse, preview and download files on a file service", long_about = None)]
struct Cli {
    /// File service base URL, e.g. http://localhost:8080/api/files
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive file manager (default)
    Browse {
        /// Start on a route: "/" or "/file/<name>"
        #[arg(long)]
        open: Option<Route>,
    },
    /// List uploaded files
    Ls,
    /// Upload a local file
    Upload {
        path: PathBuf,
    },
    /// Print a text file's content
    View {
        /// Stored file name
        file_name: String,
    },
    /// Show a file's metadata
    Info {
        /// Stored file name
        file_name: String,
    },
    /// Download a file under its original name
    Download {
        /// Stored file name
        file_name: String,
        /// Directory to save into
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show or update saved settings
    Config {
        #[arg(long)]
        server_url: Option<String>,
        #[arg(long)]
        download_dir: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;

    let command = cli.command.unwrap_or(Commands::Browse { open: None });
    let server = cli.server.as_deref();

    // The shell owns the terminal, so it logs to a file
    if !matches!(command, Commands::Browse { .. }) {
        init_stderr_logging();
    }

    match command {
        Commands::Browse { open } => {
            init_file_logging()?;
            let client = connect(&config, server)?;
            let downloader: Box<dyn Downloader> =
                Box::new(FileSaver::new(client.clone(), config.download_dir()));
            tracing::info!(server = %client.base_url(), "starting file manager");
            tui::run(client, downloader, open.unwrap_or(Route::Home)).await?;
        }
        Commands::Config {
            server_url,
            download_dir,
        } => update_config(&mut config, server_url, download_dir)?,
        Commands::Ls => list(&connect(&config, server)?).await?,
        Commands::Upload { path } => upload(&connect(&config, server)?, &path).await?,
        Commands::View { file_name } => view(&connect(&config, server)?, &file_name).await?,
        Commands::Info { file_name } => info(&connect(&config, server)?, &file_name).await?,
        Commands::Download { file_name, output } => {
            let dir = output.unwrap_or_else(|| config.download_dir());
            download(&connect(&config, server)?, &file_name, dir).await?
        }
    }

    Ok(())
}

fn connect(config: &Config, server: Option<&str>) -> anyhow::Result<TransferClient> {
    let service = config.resolve(server)?;
    Ok(TransferClient::new(&service)?)
}

fn init_stderr_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filedesk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn init_file_logging() -> anyhow::Result<()> {
    let log_file = File::options()
        .create(true)
        .append(true)
        .open(Config::log_path()?)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filedesk=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(log_file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

async fn list(client: &TransferClient) -> anyhow::Result<()> {
    let files = client.list_files().await?;

    if files.is_empty() {
        println!("no files uploaded");
        return Ok(());
    }

    for row in listing::rows(&files) {
        println!(
            "{} {:<32} {:<5} {:>10}  {}",
            row.icon, row.name, row.file_type, row.size, row.uploaded
        );
    }

    Ok(())
}

async fn upload(client: &TransferClient, path: &Path) -> anyhow::Result<()> {
    let mut panel = UploadPanel::default();
    panel.choose_path(path);

    if let Some(Notice::Error(message)) = panel.notice() {
        anyhow::bail!(message);
    }

    let pb = spinner(format!("uploading {}", path.display()));
    let outcome = panel.submit(client).await;
    pb.finish_and_clear();

    match outcome {
        Some(UploadOutcome::Uploaded(file)) => {
            println!("uploaded {} as {}", file.original_file_name, file.file_name);
            Ok(())
        }
        None => match panel.notice() {
            Some(Notice::Error(message)) => anyhow::bail!(message),
            _ => anyhow::bail!(UPLOAD_FALLBACK),
        },
    }
}

async fn view(client: &TransferClient, file_name: &str) -> anyhow::Result<()> {
    let mut viewer = ContentViewer::new(file_name);
    viewer.load(client).await;

    match viewer.state() {
        ViewerState::Loaded(response) => {
            println!("{}", response.metadata.original_file_name);
            println!("{}", viewer::metadata_strip(&response.metadata));
            println!();
            println!("{}", response.content);
            Ok(())
        }
        ViewerState::Failed(message) => anyhow::bail!(message.clone()),
        ViewerState::Loading => Ok(()),
    }
}

async fn info(client: &TransferClient, file_name: &str) -> anyhow::Result<()> {
    let file = client.fetch_metadata(file_name).await?;

    println!("id:       {}", file.id);
    println!("name:     {}", file.original_file_name);
    println!("stored:   {}", file.file_name);
    println!("type:     {}", file.file_type.to_uppercase());
    println!("size:     {} ({} bytes)", format::format_size(file.file_size), file.file_size);
    println!("path:     {}", file.file_path);
    println!("uploaded: {}", format::format_upload_time(&file.upload_time));
    println!("preview:  {}", if file.is_text() { "yes" } else { "no" });

    Ok(())
}

async fn download(client: &TransferClient, file_name: &str, dir: PathBuf) -> anyhow::Result<()> {
    let file = client.fetch_metadata(file_name).await?;
    let request = listing::download_request(client, &file);
    let saver = FileSaver::new(client.clone(), dir);

    let pb = spinner(format!("downloading {}", request.suggested_name));
    let result = saver
        .trigger_download(&request.url, &request.suggested_name)
        .await;
    pb.finish_and_clear();

    let path = result?;
    println!("saved {}", path.display());
    Ok(())
}

fn update_config(
    config: &mut Config,
    server_url: Option<String>,
    download_dir: Option<String>,
) -> anyhow::Result<()> {
    if server_url.is_none() && download_dir.is_none() {
        println!("config: {}", Config::config_path()?.display());
        println!(
            "server: {}",
            config.server_url.as_deref().unwrap_or(config::DEFAULT_SERVER_URL)
        );
        println!("downloads: {}", config.download_dir().display());
        return Ok(());
    }

    if let Some(url) = server_url {
        // Reject values the client could not use
        config::ServiceConfig::from_url(&url)?;
        config.server_url = Some(url);
    }
    if let Some(dir) = download_dir {
        config.download_dir = Some(dir);
    }

    config.save()?;
    println!("saved {}", Config::config_path()?.display());
    Ok(())
}
