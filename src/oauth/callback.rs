// One-shot local listener for the provider's redirect.
// The listener runs on its own thread and hands the first verifier it sees
// to the waiting flow through a single-slot channel, then stops. The flow
// side (`PendingVerifier`) unblocks and joins the thread when it is done,
// whether it got a verifier, timed out, or was dropped early.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiny_http::{Response, Server};
use tracing::{debug, info};
use url::Url;

use crate::error::OAuthError;

const CONFIRMATION: &str = "Token obtained successfully, you can go back to the terminal";

/// A bound, not yet serving, callback listener.
pub struct CallbackListener {
    server: Arc<Server>,
    port: u16,
}

impl CallbackListener {
    /// Bind on the loopback interface. Port `0` picks a free port.
    pub fn bind(port: u16) -> Result<Self, OAuthError> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let server = Server::http(addr).map_err(|e| OAuthError::Bind {
            port,
            reason: e.to_string(),
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|a| a.port())
            .ok_or_else(|| OAuthError::Bind {
                port,
                reason: "listener has no IP address".into(),
            })?;
        debug!(port, "callback listener bound");
        Ok(CallbackListener {
            server: Arc::new(server),
            port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Start serving on a background thread.
    pub fn spawn(self) -> PendingVerifier {
        let (tx, rx) = mpsc::sync_channel(1);
        let server = Arc::clone(&self.server);
        let handle = thread::spawn(move || serve_until_verifier(&server, tx));
        PendingVerifier {
            rx,
            server: self.server,
            handle: Some(handle),
        }
    }
}

/// The flow's end of the handoff.
pub struct PendingVerifier {
    rx: Receiver<String>,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
}

impl PendingVerifier {
    /// Block until the verifier arrives. `None` waits forever.
    pub fn wait(mut self, timeout: Option<Duration>) -> Result<String, OAuthError> {
        let result = match timeout {
            Some(limit) => self.rx.recv_timeout(limit).map_err(|e| match e {
                RecvTimeoutError::Timeout => OAuthError::CallbackTimeout(limit),
                RecvTimeoutError::Disconnected => OAuthError::ListenerClosed,
            }),
            None => self.rx.recv().map_err(|_| OAuthError::ListenerClosed),
        };
        self.shutdown();
        result
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.server.unblock();
            let _ = handle.join();
            debug!("callback listener stopped");
        }
    }
}

impl Drop for PendingVerifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve_until_verifier(server: &Server, tx: SyncSender<String>) {
    // Ends once `unblock` is called from the flow side.
    for request in server.incoming_requests() {
        match verifier_from_target(request.url()) {
            Some(verifier) => {
                let _ = request.respond(Response::from_string(CONFIRMATION));
                info!("received OAuth verifier");
                let _ = tx.send(verifier);
                return;
            }
            None => {
                debug!(path = %request.url(), "ignoring request without verifier");
                let _ = request.respond(Response::from_string("Not Found").with_status_code(404));
            }
        }
    }
}

/// Pull a non-empty `oauth_verifier` out of a request target such as
/// `/?oauth_token=abc&oauth_verifier=xyz`.
pub(crate) fn verifier_from_target(target: &str) -> Option<String> {
    let url = Url::parse(&format!("http://localhost{}", target)).ok()?;
    url.query_pairs()
        .find(|(k, v)| k == "oauth_verifier" && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}
