// Three-legged OAuth 1.0a flow:
// request token -> user approves in the browser -> verifier arrives on the
// local listener -> request token + verifier are exchanged for an access
// token. Persisting the result is left to the caller (see `session`).

use std::fmt;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use tracing::{debug, info, warn};
use url::Url;

use super::callback::CallbackListener;
use super::{AccessToken, Authorize, RequestToken, Signer, Token};
use crate::api::read_body;
use crate::config::Config;
use crate::error::{ApiError, OAuthError};

pub const REQUEST_TOKEN_ENDPOINT: &str = "get_request_token";
pub const ACCESS_TOKEN_ENDPOINT: &str = "get_access_token";

/// Where a handshake currently is. Used for logs and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RequestingToken,
    AwaitingCallback,
    ExchangingToken,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::RequestingToken => "requesting a temporary token",
            Stage::AwaitingCallback => "waiting for the browser callback",
            Stage::ExchangingToken => "exchanging the verifier for an access token",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Opens the authorization page for the user.
pub trait Browser {
    fn open(&self, url: &str) -> Result<()>;
}

/// Launches the platform's default browser.
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        let mut cmd = browser_command(url);
        cmd.spawn()
            .with_context(|| format!("failed to launch {:?}", cmd.get_program()))?;
        Ok(())
    }
}

#[cfg(target_os = "windows")]
fn browser_command(url: &str) -> Command {
    let mut cmd = Command::new("rundll32.exe");
    cmd.arg("url.dll,FileProtocolHandler").arg(url);
    cmd
}

#[cfg(target_os = "macos")]
fn browser_command(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn browser_command(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}

/// The interactive login against the provider.
pub struct OAuthFlow<'a, B> {
    config: &'a Config,
    http: Client,
    signer: Signer,
    browser: B,
}

impl<'a, B: Browser> OAuthFlow<'a, B> {
    pub fn new(config: &'a Config, http: Client, browser: B) -> Self {
        OAuthFlow {
            config,
            http,
            signer: config.signer(),
            browser,
        }
    }

    /// Obtain a temporary token whose approval redirects to `callback`.
    pub fn request_token(&self, callback: &str) -> Result<RequestToken, OAuthError> {
        let url = self.config.endpoint(REQUEST_TOKEN_ENDPOINT)?;
        let header = self.signer.authorization_header(
            "POST",
            &url,
            &[],
            None,
            &[("oauth_callback", callback)],
        );
        let body = self.post(REQUEST_TOKEN_ENDPOINT, url, header)?;
        parse_token_response(&body)
    }

    /// The provider page where the user approves `request`.
    pub fn authorize_url(&self, request: &RequestToken) -> Url {
        let mut url = self.config.authorize_url.clone();
        url.query_pairs_mut().append_pair("oauth_token", &request.token);
        url
    }

    /// Trade an approved request token and its verifier for an access token.
    pub fn exchange(&self, request: &RequestToken, verifier: &str) -> Result<AccessToken, OAuthError> {
        let url = self.config.endpoint(ACCESS_TOKEN_ENDPOINT)?;
        let header = self.signer.authorization_header(
            "POST",
            &url,
            &[],
            Some(request),
            &[("oauth_verifier", verifier)],
        );
        let body = self.post(ACCESS_TOKEN_ENDPOINT, url, header)?;
        parse_token_response(&body)
    }

    fn post(&self, endpoint: &str, url: Url, header: String) -> Result<String, OAuthError> {
        debug!(endpoint, "POST");
        let res = self
            .http
            .post(url)
            .header(AUTHORIZATION, header)
            .send()
            .map_err(ApiError::from)?;
        Ok(read_body(endpoint, res)?)
    }

    fn wait_for_verifier(&self, pending: super::PendingVerifier) -> Result<String, OAuthError> {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Waiting for approval in the browser...");
        spinner.enable_steady_tick(Duration::from_millis(120));
        let verifier = pending.wait(self.config.auth_timeout);
        spinner.finish_and_clear();
        verifier
    }
}

impl<B: Browser> Authorize for OAuthFlow<'_, B> {
    fn authorize(&self) -> Result<AccessToken> {
        // Bind first so the redirect can never arrive before we listen.
        let listener = CallbackListener::bind(self.config.callback_port)?;
        let callback = format!("http://{}:{}/", self.config.callback_host, listener.port());
        let pending = listener.spawn();

        let request = step(Stage::RequestingToken, || self.request_token(&callback))?;

        let verifier = step(Stage::AwaitingCallback, || {
            let url = self.authorize_url(&request);
            eprintln!("Approve access in your browser. If it did not open, visit:\n  {}", url);
            if let Err(e) = self.browser.open(url.as_str()) {
                warn!("could not open a browser: {:#}", e);
            }
            self.wait_for_verifier(pending)
        })?;

        let token = step(Stage::ExchangingToken, || self.exchange(&request, &verifier))?;
        info!(stage = %Stage::Done, "OAuth handshake complete");
        Ok(token)
    }
}

fn step<T>(stage: Stage, f: impl FnOnce() -> Result<T, OAuthError>) -> Result<T> {
    debug!(%stage, "OAuth handshake");
    f().with_context(|| format!("OAuth handshake failed while {}", stage))
}

/// Decode a form-encoded `oauth_token=..&oauth_token_secret=..` body.
pub fn parse_token_response(body: &str) -> Result<Token, OAuthError> {
    let mut token = None;
    let mut secret = None;
    for (k, v) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        match k.as_ref() {
            "oauth_token" => token = Some(v.into_owned()),
            "oauth_token_secret" => secret = Some(v.into_owned()),
            _ => {}
        }
    }
    Ok(Token {
        token: token
            .filter(|t| !t.is_empty())
            .ok_or(OAuthError::MissingField("oauth_token"))?,
        secret: secret
            .filter(|s| !s.is_empty())
            .ok_or(OAuthError::MissingField("oauth_token_secret"))?,
    })
}
