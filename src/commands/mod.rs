pub mod auth;
pub mod extract;
pub mod init;
pub mod summary;

use std::io::{self, Write};
use std::path::Path;

use crate::config::Config;
use crate::error::Result;

/// Load the config file (creating it if needed) with paths anchored at its
/// directory.
pub fn load_resolved_config(config_path: &Path) -> Result<Config> {
    let (config, created) = Config::load_or_create(config_path)?;
    if created {
        eprintln!("Created config file: {}", config_path.display());
    }
    Ok(config.resolved_against(config_dir(config_path)))
}

pub fn config_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

/// Ask for a single line on stdin.
pub fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
