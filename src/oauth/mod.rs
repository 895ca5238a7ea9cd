// OAuth 1.0a support.
// - `signer`: HMAC-SHA1 request signing and the `Authorization` header.
// - `callback`: the one-shot local listener that receives the verifier.
// - `handshake`: the three-legged flow tying the two together.

pub mod callback;
pub mod handshake;
pub mod signer;

use serde::{Deserialize, Serialize};

pub use callback::{CallbackListener, PendingVerifier};
pub use handshake::{Browser, OAuthFlow, Stage, SystemBrowser};
pub use signer::Signer;

/// An OAuth token together with its secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token: String,
    pub secret: String,
}

// Secrets stay out of logs and panic messages.
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Long-lived token used to sign API calls. This is what gets cached.
pub type AccessToken = Token;

/// Temporary token issued at the start of the handshake.
pub type RequestToken = Token;

/// Something that can produce a fresh access token.
pub trait Authorize {
    fn authorize(&self) -> anyhow::Result<AccessToken>;
}
