#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use splitwise_cli::config::{api_base, Config};
use splitwise_cli::oauth::Browser;
use tiny_http::{Response, Server};
use url::Url;

/// A request as seen by the mock provider.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl Recorded {
    /// Decoded `oauth_*` fields of the `Authorization: OAuth ...` header.
    pub fn oauth_params(&self) -> HashMap<String, String> {
        let header = self.authorization.as_deref().unwrap_or_default();
        header
            .trim_start_matches("OAuth ")
            .split(", ")
            .filter_map(|field| field.split_once('='))
            .map(|(k, v)| {
                let v = urlencoding::decode(v.trim_matches('"')).expect("utf8 header value");
                (k.to_string(), v.into_owned())
            })
            .collect()
    }

    pub fn form(&self) -> HashMap<String, String> {
        url::form_urlencoded::parse(self.body.as_bytes())
            .into_owned()
            .collect()
    }
}

/// Minimal stand-in for the Splitwise API: canned responses per path,
/// every request recorded.
pub struct MockProvider {
    port: u16,
    server: Arc<Server>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: Option<JoinHandle<()>>,
}

impl MockProvider {
    /// `routes` maps a path without its leading slash to (status, body).
    pub fn start(routes: &[(&str, u16, &str)]) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("mock server"));
        let port = server.server_addr().to_ip().expect("ip listener").port();
        let routes: HashMap<String, (u16, String)> = routes
            .iter()
            .map(|(path, status, body)| (path.to_string(), (*status, body.to_string())))
            .collect();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let thread_server = Arc::clone(&server);
        let log = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            for mut request in thread_server.incoming_requests() {
                let path = request
                    .url()
                    .split('?')
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches('/')
                    .to_string();
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let authorization = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_string());
                log.lock().expect("request log").push(Recorded {
                    method: request.method().to_string(),
                    path: path.clone(),
                    authorization,
                    body,
                });

                let (status, body) = routes
                    .get(&path)
                    .cloned()
                    .unwrap_or_else(|| (404, "not found".to_string()));
                let _ = request.respond(Response::from_string(body).with_status_code(status));
            }
        });

        MockProvider {
            port,
            server,
            requests,
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("request log").clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }

    /// Config pointing every URL at this mock, with an ephemeral callback port.
    pub fn config(&self, token_path: &Path) -> Config {
        let mut config = Config::new("consumer-key", "consumer-secret");
        config.api_url = api_base(&self.base_url()).expect("api url");
        config.authorize_url =
            Url::parse(&format!("{}authorize", self.base_url())).expect("authorize url");
        config.callback_host = "127.0.0.1".into();
        config.callback_port = 0;
        config.token_path = token_path.to_path_buf();
        config.auth_timeout = Some(Duration::from_secs(10));
        config
    }

    /// A browser that approves immediately by following the recorded
    /// `oauth_callback` with `verifier`.
    pub fn approving_browser(&self, verifier: &str) -> FakeBrowser {
        FakeBrowser {
            requests: Arc::clone(&self.requests),
            verifier: Some(verifier.to_string()),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A browser that opens nothing, so no callback ever arrives.
    pub fn idle_browser(&self) -> FakeBrowser {
        FakeBrowser {
            requests: Arc::clone(&self.requests),
            verifier: None,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[derive(Clone)]
pub struct FakeBrowser {
    requests: Arc<Mutex<Vec<Recorded>>>,
    verifier: Option<String>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl FakeBrowser {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("opened log").clone()
    }
}

impl Browser for FakeBrowser {
    fn open(&self, url: &str) -> anyhow::Result<()> {
        self.opened.lock().expect("opened log").push(url.to_string());
        let Some(verifier) = &self.verifier else {
            return Ok(());
        };

        let callback = self
            .requests
            .lock()
            .expect("request log")
            .iter()
            .rev()
            .find(|r| r.path == "get_request_token")
            .and_then(|r| r.oauth_params().get("oauth_callback").cloned())
            .expect("request token call carried oauth_callback");
        let mut redirect = Url::parse(&callback).expect("callback url");
        redirect
            .query_pairs_mut()
            .append_pair("oauth_token", "req-token")
            .append_pair("oauth_verifier", verifier);

        let res = reqwest::blocking::get(redirect)?;
        anyhow::ensure!(res.status().is_success(), "callback answered {}", res.status());
        Ok(())
    }
}

pub const REQUEST_TOKEN_BODY: &str =
    "oauth_token=req-token&oauth_token_secret=req-secret&oauth_callback_confirmed=true";
pub const ACCESS_TOKEN_BODY: &str = "oauth_token=acc-token&oauth_token_secret=acc-secret";
