// Credential store: a one-entry cache for the access token.
// The token lives in a single JSON file (by default `~/.splitwise_token`).
// Loading never fails hard: a missing file and a broken file are reported
// as distinct `TokenLoad` variants so the caller can log them and fall
// back to the OAuth handshake.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;
use crate::oauth::AccessToken;

/// Outcome of reading the cached token file.
#[derive(Debug, PartialEq, Eq)]
pub enum TokenLoad {
    Found(AccessToken),
    Absent,
    Corrupt(String),
}

/// Reads and writes the cached access token at a fixed path.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TokenStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to read the cached token.
    pub fn load(&self) -> TokenLoad {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return TokenLoad::Absent,
            Err(e) => return TokenLoad::Corrupt(format!("unreadable: {}", e)),
        };
        match serde_json::from_str::<AccessToken>(&data) {
            Ok(token) if token.token.is_empty() || token.secret.is_empty() => {
                TokenLoad::Corrupt("token or secret is empty".into())
            }
            Ok(token) => {
                debug!(path = %self.path.display(), "loaded cached access token");
                TokenLoad::Found(token)
            }
            Err(e) => TokenLoad::Corrupt(format!("undecodable: {}", e)),
        }
    }

    /// Overwrite the cached token, creating parent directories as needed.
    pub fn save(&self, token: &AccessToken) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let data = serde_json::to_string_pretty(token)?;
        let mut file = owner_only()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        // A pre-existing file keeps its old mode on open.
        restrict_permissions(&self.path).map_err(|source| self.io_error(source))?;
        file.write_all(data.as_bytes())
            .map_err(|source| self.io_error(source))?;
        debug!(path = %self.path.display(), "saved access token");
        Ok(())
    }

    /// Remove the cached token. A missing file is not an error.
    pub fn clear(&self) -> Result<bool, StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(unix)]
fn owner_only() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;
    let mut options = OpenOptions::new();
    options.mode(0o600);
    options
}

#[cfg(not(unix))]
fn owner_only() -> OpenOptions {
    OpenOptions::new()
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
