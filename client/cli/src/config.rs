use directories::{ProjectDirs, UserDirs};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/api/files";
pub const SERVER_URL_ENV: &str = "FILEDESK_SERVER_URL";

/// Persisted settings, stored as `config.toml` in the project config dir.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub server_url: Option<String>,
    pub download_dir: Option<String>,
}

/// Connection settings handed to the transfer client, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: Url,
    pub connect_timeout: Duration,
    /// Upper bound for a whole API request, body included.
    pub request_timeout: Duration,
    /// Same bound for file downloads, which stream larger bodies.
    pub download_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_url(raw: &str) -> anyhow::Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            anyhow::bail!("server url required");
        }

        // Add http:// if missing
        let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("http://{}", raw)
        };

        let base_url = Url::parse(&with_scheme)
            .map_err(|e| anyhow::anyhow!("invalid server url '{}': {}", raw, e))?;

        Ok(Self {
            base_url,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(600),
        })
    }
}

impl Config {
    fn project_dirs() -> anyhow::Result<ProjectDirs> {
        ProjectDirs::from("com", "filedesk", "filedesk")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    /// Log file for the interactive shell, which cannot log to the terminal.
    pub fn log_path() -> anyhow::Result<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        let data_dir = proj_dirs.data_local_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("filedesk.log"))
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the service location. The command-line flag wins over the
    /// environment, which wins over the config file.
    pub fn resolve(&self, server_flag: Option<&str>) -> anyhow::Result<ServiceConfig> {
        let from_env = std::env::var(SERVER_URL_ENV).ok();
        self.resolve_with(server_flag, from_env.as_deref())
    }

    fn resolve_with(
        &self,
        server_flag: Option<&str>,
        from_env: Option<&str>,
    ) -> anyhow::Result<ServiceConfig> {
        let raw = server_flag
            .or(from_env)
            .or(self.server_url.as_deref())
            .unwrap_or(DEFAULT_SERVER_URL);
        ServiceConfig::from_url(raw)
    }

    pub fn download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.download_dir {
            return PathBuf::from(dir);
        }

        UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
