use std::path::Path;

use crate::auth::{TokenManager, TokenStore};
use crate::diagnostics::LogDiagnostics;
use crate::error::Result;
use crate::oauth::GoogleOAuth;

use super::load_resolved_config;

pub async fn run(config_path: &Path) -> Result<()> {
    let config = load_resolved_config(config_path)?;

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

    println!("Credentials stored at {}", config.token_file.display());
    match credential.expiry {
        Some(expiry) => println!("Access token valid until {}", expiry.to_rfc3339()),
        None => println!("Access token has no expiry"),
    }
    println!("Granted scopes:");
    for scope in &credential.scopes {
        println!("  {}", scope);
    }

    Ok(())
}
