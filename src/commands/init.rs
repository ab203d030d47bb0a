use std::path::Path;

use crate::config::{Config, data_dir};
use crate::error::Result;

use super::config_dir;

pub fn run(config_path: &Path, channel: Option<String>, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        println!("Config already exists at {}", config_path.display());
        println!("Use --force to overwrite.");
        return Ok(());
    }

    let config = Config {
        channel_id: channel.map(|c| c.trim().to_string()).unwrap_or_default(),
        ..Config::default()
    };
    config.save(config_path)?;

    let resolved = config.resolved_against(config_dir(config_path));
    println!("Config saved to {}", config_path.display());
    println!("Data directory: {}", data_dir().display());
    println!(
        "Place the OAuth client JSON at {}",
        resolved.client_secrets_file.display()
    );

    Ok(())
}
