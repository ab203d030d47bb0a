//! Access credential lifecycle shared by the catalog and reporting surfaces.
//!
//! A stored credential is reused while it is valid, refreshed in place when it
//! has expired, and replaced through the interactive consent flow otherwise.
//! Every newly obtained credential is written back to the token file.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};

/// Tokens are treated as expired slightly before their real expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now)
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    pub fn is_valid(&self, required: &[String], now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && self.has_scopes(required)
    }
}

/// OAuth client identity, as downloaded from the platform's developer console.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Client secrets file not found: {}. Download the OAuth client JSON from the developer console and point client_secrets_file at it.",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        let file: ClientSecretsFile = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        file.installed.or(file.web).ok_or_else(|| {
            Error::Config(format!(
                "{}: expected an \"installed\" or \"web\" client",
                path.display()
            ))
        })
    }
}

/// Persisted credential file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Overwrite the stored credential.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(credential)?)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Token endpoint operations.
#[async_trait]
pub trait AuthorizationServer: Send + Sync {
    async fn refresh(&self, credential: &Credential) -> Result<Credential>;

    /// Run the interactive consent flow for `scopes`.
    async fn authorize(&self, secrets: &ClientSecrets, scopes: &[String]) -> Result<Credential>;
}

pub struct TokenManager<'a, A: AuthorizationServer + ?Sized> {
    server: &'a A,
    store: TokenStore,
    client_secrets_file: PathBuf,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a, A: AuthorizationServer + ?Sized> TokenManager<'a, A> {
    pub fn new(
        server: &'a A,
        store: TokenStore,
        client_secrets_file: impl Into<PathBuf>,
        diagnostics: &'a dyn Diagnostics,
    ) -> Self {
        Self {
            server,
            store,
            client_secrets_file: client_secrets_file.into(),
            diagnostics,
        }
    }

    /// Return a credential that is valid for `required` right now.
    pub async fn acquire(&self, required: &[String]) -> Result<Credential> {
        if let Some(stored) = self.load_compatible(required) {
            if !stored.is_expired(Utc::now()) {
                return Ok(stored);
            }

            if stored.refresh_token.is_some() {
                match self.server.refresh(&stored).await {
                    Ok(refreshed) if !refreshed.is_valid(required, Utc::now()) => {
                        self.diagnostics.error(&format!(
                            "Refreshed credentials do not cover {:?} (granted {:?})",
                            required, refreshed.scopes
                        ));
                    }
                    Ok(refreshed) => {
                        self.store.save(&refreshed)?;
                        self.diagnostics.info("Access token refreshed");
                        return Ok(refreshed);
                    }
                    Err(e) => {
                        self.diagnostics
                            .error(&format!("Failed to refresh access token: {}", e));
                    }
                }
            }
        }

        let secrets = ClientSecrets::load(&self.client_secrets_file)?;
        let credential = self
            .server
            .authorize(&secrets, required)
            .await
            .map_err(|e| match e {
                Error::Config(_) | Error::Authentication(_) => e,
                other => Error::Authentication(other.to_string()),
            })?;

        if !credential.is_valid(required, Utc::now()) {
            return Err(Error::Authentication(format!(
                "granted scopes {:?} do not cover {:?}",
                credential.scopes, required
            )));
        }

        self.store.save(&credential)?;
        self.diagnostics.info(&format!(
            "New credentials saved to {}",
            self.store.path().display()
        ));
        Ok(credential)
    }

    fn load_compatible(&self, required: &[String]) -> Option<Credential> {
        match self.store.load() {
            Ok(Some(credential)) if credential.has_scopes(required) => Some(credential),
            Ok(Some(_)) => {
                self.diagnostics
                    .info("Stored credentials lack required scopes, requesting consent");
                None
            }
            Ok(None) => None,
            Err(e) => {
                self.diagnostics
                    .error(&format!("Failed to load stored credentials: {}", e));
                None
            }
        }
    }
}
