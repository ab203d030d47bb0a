use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/youtube.readonly",
    "https://www.googleapis.com/auth/yt-analytics.readonly",
];

/// Get the base data directory (~/.yt-snapshot/)
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(|| {
        std::env::var("YT_SNAPSHOT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".yt-snapshot")
            })
    })
}

/// Get the default config file path
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Get the .env file path
pub fn env_file_path() -> PathBuf {
    data_dir().join(".env")
}

/// Load environment variables from the data directory's .env file
pub fn load_env() {
    let env_path = env_file_path();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    } else {
        // Try current directory as fallback
        let _ = dotenvy::dotenv();
    }
}

/// A value per API surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerSurface {
    pub data: String,
    pub analytics: String,
}

fn default_api_root() -> PerSurface {
    PerSurface {
        data: "https://www.googleapis.com/youtube".to_string(),
        analytics: "https://youtubeanalytics.googleapis.com".to_string(),
    }
}

/// Extraction settings, read once from the config file and then passed around
/// by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub client_secrets_file: PathBuf,
    pub token_file: PathBuf,
    #[serde(default)]
    pub channel_id: String,
    pub years_to_analyze: u32,
    pub output_file: PathBuf,
    pub scopes: Vec<String>,
    pub api_service_name: PerSurface,
    pub api_version: PerSurface,
    #[serde(default = "default_api_root")]
    pub api_root: PerSurface,
    /// Seconds to wait between consecutive remote calls.
    pub request_delay: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_secrets_file: PathBuf::from("client_secrets.json"),
            token_file: PathBuf::from("token.json"),
            channel_id: String::new(),
            years_to_analyze: 5,
            output_file: PathBuf::from("youtube_data.json"),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            api_service_name: PerSurface {
                data: "youtube".to_string(),
                analytics: "youtubeAnalytics".to_string(),
            },
            api_version: PerSurface {
                data: "v3".to_string(),
                analytics: "v2".to_string(),
            },
            api_root: default_api_root(),
            request_delay: 0.5,
        }
    }
}

impl Config {
    /// Load the config file, writing the defaults first when it does not exist.
    /// The flag is true when the file was just created.
    pub fn load_or_create(path: &Path) -> Result<(Self, bool)> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok((config, true));
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok((config, false))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)? + "\n")?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.request_delay()?;
        if i32::try_from(self.years_to_analyze).is_err() {
            return Err(Error::Config(format!(
                "years_to_analyze is too large: {}",
                self.years_to_analyze
            )));
        }
        if self.scopes.is_empty() {
            return Err(Error::Config("scopes must not be empty".to_string()));
        }
        Ok(())
    }

    /// Returns a copy whose relative file paths are anchored at `base`.
    pub fn resolved_against(&self, base: &Path) -> Self {
        let anchor = |p: &PathBuf| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.clone()
            }
        };
        Self {
            client_secrets_file: anchor(&self.client_secrets_file),
            token_file: anchor(&self.token_file),
            output_file: anchor(&self.output_file),
            ..self.clone()
        }
    }

    pub fn request_delay(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.request_delay).map_err(|_| {
            Error::Config(format!(
                "request_delay must be a non-negative number of seconds, got {}",
                self.request_delay
            ))
        })
    }

    /// Inclusive year range ending at `current_year`.
    pub fn year_range(&self, current_year: i32) -> Result<(i32, i32)> {
        i32::try_from(self.years_to_analyze)
            .ok()
            .and_then(|years| current_year.checked_sub(years))
            .map(|start| (start, current_year))
            .ok_or_else(|| {
                Error::Config(format!(
                    "years_to_analyze is out of range: {}",
                    self.years_to_analyze
                ))
            })
    }

    pub fn data_base_url(&self) -> String {
        join_url(&self.api_root.data, &self.api_version.data)
    }

    pub fn analytics_base_url(&self) -> String {
        join_url(&self.api_root.analytics, &self.api_version.analytics)
    }
}

fn join_url(root: &str, version: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), version.trim_matches('/'))
}
