use std::path::PathBuf;

use chrono::{Datelike, Local, Utc};

use crate::api::YouTubeClient;
use crate::auth::{TokenManager, TokenStore};
use crate::config::Config;
use crate::diagnostics::LogDiagnostics;
use crate::error::{Error, Result};
use crate::oauth::GoogleOAuth;
use crate::pipeline::Pipeline;
use crate::snapshot::write_snapshot;

use super::{config_dir, prompt, summary};

pub struct ExtractOptions {
    pub config_path: PathBuf,
    pub channel: Option<String>,
    pub years: Option<u32>,
    pub output: Option<PathBuf>,
}

pub async fn run(options: ExtractOptions) -> Result<()> {
    let (mut config, created) = Config::load_or_create(&options.config_path)?;
    if created {
        eprintln!("Created config file: {}", options.config_path.display());
    }

    let channel_id = match options.channel.filter(|c| !c.trim().is_empty()) {
        Some(channel) => channel.trim().to_string(),
        None if !config.channel_id.is_empty() => config.channel_id.clone(),
        None => {
            let channel = prompt("Enter the YouTube channel ID: ")?;
            if channel.is_empty() {
                return Err(Error::Config("a channel ID is required".to_string()));
            }
            config.channel_id = channel.clone();
            config.save(&options.config_path)?;
            channel
        }
    };

    if let Some(years) = options.years {
        config.years_to_analyze = years;
    }
    if let Some(output) = options.output {
        config.output_file = output;
    }
    config.validate()?;
    let config = config.resolved_against(config_dir(&options.config_path));
    let (start_year, end_year) = config.year_range(Local::now().year())?;

    let diagnostics = LogDiagnostics;
    let server = GoogleOAuth::new()?;
    let credential = TokenManager::new(
        &server,
        TokenStore::new(&config.token_file),
        &config.client_secrets_file,
        &diagnostics,
    )
    .acquire(&config.scopes)
    .await?;

    let client = YouTubeClient::new(&config, &credential)?;

    let report = Pipeline::new(&client, &client, config.request_delay()?, &diagnostics)
        .run(&channel_id, start_year, end_year, Utc::now())
        .await?;

    eprintln!("Saving data to {}...", config.output_file.display());
    write_snapshot(&config.output_file, &report.snapshot)?;

    if report.is_degraded() {
        eprintln!("Some requests failed; affected values are zero or missing. See the log above.");
    }

    println!();
    summary::print_summary(&report.snapshot);
    println!("Data saved to: {}", config.output_file.display());

    Ok(())
}
