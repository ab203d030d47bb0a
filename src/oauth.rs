use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use chrono::Utc;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::url::Url;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use reqwest::{Client, redirect};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::{AuthorizationServer, ClientSecrets, Credential};
use crate::error::{Error, Result};

const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

const CALLBACK_PAGE: &str =
    "<html><body><p>Authorization received. You can close this window.</p></body></html>";

/// Client able to run the full authorization-code flow.
pub type ConsentClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

type CallbackSender = Arc<watch::Sender<Option<Callback>>>;

/// Query parameters delivered to the loopback redirect.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Callback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Installed-app OAuth flow against the platform's authorization server.
pub struct GoogleOAuth {
    http: Client,
}

impl GoogleOAuth {
    pub fn new() -> Result<Self> {
        // Token requests must not follow redirects.
        let http = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl AuthorizationServer for GoogleOAuth {
    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or_else(|| Error::Authentication("no refresh token".to_string()))?;

        let client = BasicClient::new(ClientId::new(credential.client_id.clone()))
            .set_client_secret(ClientSecret::new(credential.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url(&credential.token_uri)?);

        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Authentication(format!("token refresh failed: {}", e)))?;

        Ok(credential_from_response(
            &response,
            &credential.token_uri,
            &credential.client_id,
            &credential.client_secret,
            credential.refresh_token.clone(),
            &credential.scopes,
        ))
    }

    async fn authorize(&self, secrets: &ClientSecrets, scopes: &[String]) -> Result<Credential> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let redirect_uri = format!("http://127.0.0.1:{}/", listener.local_addr()?.port());
        let state = Uuid::new_v4().simple().to_string();

        let client = consent_client(secrets, &redirect_uri)?;
        let url = authorization_url(&client, scopes, &state);
        eprintln!("Open this URL in your browser to authorize access:\n\n  {}\n", url);

        let callback = tokio::time::timeout(CONSENT_TIMEOUT, wait_for_callback(listener))
            .await
            .map_err(|_| Error::Authentication("timed out waiting for consent".to_string()))??;

        if let Some(error) = callback.error {
            return Err(Error::Authentication(format!("consent denied: {}", error)));
        }
        if callback.state.as_deref() != Some(state.as_str()) {
            return Err(Error::Authentication(
                "state mismatch in authorization response".to_string(),
            ));
        }
        let code = callback
            .code
            .ok_or_else(|| Error::Authentication("missing authorization code".to_string()))?;

        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Authentication(format!("token exchange failed: {}", e)))?;

        Ok(credential_from_response(
            &response,
            &secrets.token_uri,
            &secrets.client_id,
            &secrets.client_secret,
            None,
            scopes,
        ))
    }
}

fn token_url(uri: &str) -> Result<TokenUrl> {
    TokenUrl::new(uri.to_string())
        .map_err(|e| Error::Config(format!("invalid token_uri {}: {}", uri, e)))
}

pub fn consent_client(secrets: &ClientSecrets, redirect_uri: &str) -> Result<ConsentClient> {
    let auth_url = AuthUrl::new(secrets.auth_uri.clone())
        .map_err(|e| Error::Config(format!("invalid auth_uri {}: {}", secrets.auth_uri, e)))?;
    let redirect_url = RedirectUrl::new(redirect_uri.to_string())
        .map_err(|e| Error::Config(format!("invalid redirect uri {}: {}", redirect_uri, e)))?;

    Ok(BasicClient::new(ClientId::new(secrets.client_id.clone()))
        .set_client_secret(ClientSecret::new(secrets.client_secret.clone()))
        .set_auth_type(AuthType::RequestBody)
        .set_auth_uri(auth_url)
        .set_token_uri(token_url(&secrets.token_uri)?)
        .set_redirect_uri(redirect_url))
}

/// Build the consent URL the user opens in a browser.
pub fn authorization_url(client: &ConsentClient, scopes: &[String], state: &str) -> Url {
    let (url, _csrf) = client
        .authorize_url(|| CsrfToken::new(state.to_string()))
        .add_scopes(scopes.iter().cloned().map(Scope::new))
        .add_extra_param("access_type", "offline")
        .add_extra_param("prompt", "consent")
        .url();
    url
}

async fn receive_callback(
    State(sender): State<CallbackSender>,
    Query(callback): Query<Callback>,
) -> (StatusCode, Html<&'static str>) {
    if callback.code.is_none() && callback.error.is_none() {
        return (StatusCode::NOT_FOUND, Html(""));
    }
    sender.send_replace(Some(callback));
    (StatusCode::OK, Html(CALLBACK_PAGE))
}

/// Router for the loopback redirect. Anything but `GET /` is a 404.
pub fn callback_router(sender: CallbackSender) -> Router {
    Router::new()
        .route("/", get(receive_callback))
        .with_state(sender)
}

/// Serve the redirect endpoint until the browser delivers a code or an error.
pub async fn wait_for_callback(listener: TcpListener) -> Result<Callback> {
    let (sender, receiver) = watch::channel(None);
    let mut shutdown = receiver.clone();

    axum::serve(listener, callback_router(Arc::new(sender)))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(Option::is_some).await;
        })
        .await?;

    let callback = receiver.borrow().clone();
    callback.ok_or_else(|| {
        Error::Authentication("redirect listener stopped before consent".to_string())
    })
}

fn credential_from_response(
    response: &BasicTokenResponse,
    token_uri: &str,
    client_id: &str,
    client_secret: &str,
    previous_refresh_token: Option<String>,
    requested_scopes: &[String],
) -> Credential {
    let scopes = match response.scopes() {
        Some(granted) if !granted.is_empty() => {
            granted.iter().map(|s| s.as_str().to_string()).collect()
        }
        _ => requested_scopes.to_vec(),
    };

    Credential {
        token: response.access_token().secret().clone(),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or(previous_refresh_token),
        token_uri: token_uri.to_string(),
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
        scopes,
        expiry: response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d),
    }
}
