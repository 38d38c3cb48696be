//! Bearer token persisted next to the config file.
//!
//! Signing in happens elsewhere; this only keeps the token a previous login
//! produced so score submission can authenticate.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{API_TOKEN_ENV, config_dir};

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        let mut path = config_dir();
        path.push("token");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<String> {
        let text = fs::read_to_string(&self.path).ok()?;
        let token = text.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    pub fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, token.trim())
    }

    /// Forgets the stored token. A missing file is not an error.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }

    /// `TETRIS_API_TOKEN` wins over the stored token.
    pub fn resolve(&self) -> Option<String> {
        std::env::var(API_TOKEN_ENV)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .or_else(|| self.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_clear() {
        let mut path = std::env::temp_dir();
        path.push(format!("tetris-token-{}", std::process::id()));
        path.push("token");
        let store = TokenStore::new(&path);

        assert_eq!(store.load(), None);
        store.save(" abc.def \n").expect("save");
        assert_eq!(store.load().as_deref(), Some("abc.def"));
        store.clear().expect("clear");
        assert_eq!(store.load(), None);
        store.clear().expect("clearing twice is fine");

        let _ = fs::remove_dir_all(path.parent().expect("parent"));
    }

    #[test]
    fn blank_file_means_no_token() {
        let mut path = std::env::temp_dir();
        path.push(format!("tetris-token-blank-{}", std::process::id()));
        let store = TokenStore::new(&path);
        fs::write(&path, "   \n").expect("write");
        assert_eq!(store.load(), None);
        let _ = fs::remove_file(&path);
    }
}
