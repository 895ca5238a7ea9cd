// Token resolution: use the cached access token when there is one,
// otherwise run the OAuth handshake once and cache its result.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::oauth::{AccessToken, Authorize};
use crate::store::{TokenLoad, TokenStore};

/// Cached token if usable, else a fresh one from `authorizer`.
pub fn resolve_token(store: &TokenStore, authorizer: &dyn Authorize) -> Result<AccessToken> {
    match store.load() {
        TokenLoad::Found(token) => return Ok(token),
        TokenLoad::Absent => {
            info!(path = %store.path().display(), "no cached access token, starting login")
        }
        TokenLoad::Corrupt(reason) => warn!(
            path = %store.path().display(),
            "ignoring cached access token ({}), starting login",
            reason
        ),
    }
    login(store, authorizer)
}

/// Run the handshake unconditionally and overwrite the cache.
pub fn login(store: &TokenStore, authorizer: &dyn Authorize) -> Result<AccessToken> {
    let token = authorizer.authorize()?;
    store
        .save(&token)
        .with_context(|| format!("failed to save access token to {}", store.path().display()))?;
    Ok(token)
}
