// Command-line surface and the resolved runtime configuration.
// `Cli` is what clap parses (flags with environment fallbacks); `Config` is
// the explicit settings struct handed to every component afterwards.

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::error::ApiError;
use crate::oauth::Signer;

pub const DEFAULT_API_URL: &str = "https://secure.splitwise.com/api/v3.0/";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://secure.splitwise.com/authorize";
pub const DEFAULT_CALLBACK_PORT: u16 = 1234;
const TOKEN_FILE_NAME: &str = ".splitwise_token";

/// Command-line client for the Splitwise API.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    /// OAuth consumer key of the registered Splitwise app
    #[arg(long, env = "SPLITWISE_CONSUMER_KEY", hide_env_values = true,
          value_parser = NonEmptyStringValueParser::new())]
    pub consumer_key: String,

    /// OAuth consumer secret of the registered Splitwise app
    #[arg(long, env = "SPLITWISE_CONSUMER_SECRET", hide_env_values = true,
          value_parser = NonEmptyStringValueParser::new())]
    pub consumer_secret: String,

    /// Where the access token is cached (defaults to ~/.splitwise_token)
    #[arg(long, env = "SPLITWISE_TOKEN_FILE", value_name = "FILE")]
    pub token_file: Option<PathBuf>,

    /// Base URL of the REST API
    #[arg(long, env = "SPLITWISE_API_URL", default_value = DEFAULT_API_URL,
          value_parser = api_base)]
    pub api_url: Url,

    /// Page where the user approves access
    #[arg(long, env = "SPLITWISE_AUTHORIZE_URL", default_value = DEFAULT_AUTHORIZE_URL)]
    pub authorize_url: Url,

    /// Local port receiving the OAuth redirect (0 picks a free port)
    #[arg(long, default_value_t = DEFAULT_CALLBACK_PORT)]
    pub callback_port: u16,

    /// Seconds to wait for approval in the browser (0 waits forever)
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    pub auth_timeout: u64,

    /// Log request flow to stderr
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the cached credentials work
    Test,
    /// List groups with members and balances
    Groups,
    /// Create an expense in a group
    Add(AddArgs),
    /// Authenticate in the browser and cache the token
    Login,
    /// Forget the cached token
    Logout,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Group to add the expense to (asks interactively when omitted)
    #[arg(long)]
    pub group_id: Option<i64>,

    /// Amount, e.g. 12.50
    #[arg(long)]
    pub cost: Option<String>,

    /// What the expense was for
    #[arg(long)]
    pub description: Option<String>,

    /// Record a payment between members instead of a shared expense
    #[arg(long)]
    pub payment: bool,
}

/// Resolved settings threaded through the client.
#[derive(Debug, Clone)]
pub struct Config {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub api_url: Url,
    pub authorize_url: Url,
    pub callback_host: String,
    pub callback_port: u16,
    pub token_path: PathBuf,
    pub auth_timeout: Option<Duration>,
}

impl Config {
    /// Defaults pointing at the public Splitwise API.
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Config {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            authorize_url: Url::parse(DEFAULT_AUTHORIZE_URL).expect("default authorize URL is valid"),
            callback_host: "localhost".into(),
            callback_port: DEFAULT_CALLBACK_PORT,
            token_path: default_token_path(),
            auth_timeout: Some(Duration::from_secs(300)),
        }
    }

    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = Config::new(&cli.consumer_key, &cli.consumer_secret);
        config.api_url = cli.api_url.clone();
        config.authorize_url = cli.authorize_url.clone();
        config.callback_port = cli.callback_port;
        if let Some(path) = &cli.token_file {
            config.token_path = path.clone();
        }
        config.auth_timeout = match cli.auth_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        config
    }

    /// Absolute URL of an API endpoint such as `get_groups`.
    pub fn endpoint(&self, name: &str) -> Result<Url, ApiError> {
        self.api_url.join(name).map_err(|source| ApiError::Url {
            endpoint: name.to_string(),
            source,
        })
    }

    pub fn signer(&self) -> Signer {
        Signer::new(&self.consumer_key, &self.consumer_secret)
    }
}

/// Parse the API base, forcing a trailing slash so endpoints join under it.
pub fn api_base(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn default_token_path() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(TOKEN_FILE_NAME)
}
