//! Shared-secret security gate
//!
//! When the gate is enabled, preset activation requires the caller to
//! present the stored key. The key always exists, enabled or not.

use rand::Rng;

use super::RedirectState;
use crate::error::{Error, Result};
use crate::models::SecurityInfo;

/// Length of generated keys
pub const KEY_LENGTH: usize = 32;

/// URL-safe alphabet, 64 symbols (6 bits each)
const KEY_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Generate a random URL-safe key with 192 bits of entropy
pub fn generate_key() -> String {
    let mut rng = rand::thread_rng();
    (0..KEY_LENGTH)
        .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

/// Compare without short-circuiting on the first differing byte
fn keys_match(expected: &str, presented: &str) -> bool {
    let (a, b) = (expected.as_bytes(), presented.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl RedirectState {
    pub fn is_api_key_enabled(&self) -> bool {
        self.lock().config.api_key_enabled
    }

    pub fn api_key(&self) -> String {
        self.lock().config.api_key.clone()
    }

    pub fn security_info(&self) -> SecurityInfo {
        let inner = self.lock();
        SecurityInfo {
            api_key_enabled: inner.config.api_key_enabled,
            api_key: inner.config.api_key.clone(),
        }
    }

    /// Turn the gate on or off
    pub fn set_api_key_enabled(&self, enabled: bool) -> Result<()> {
        let mut inner = self.lock();
        let mut draft = inner.config.clone();
        draft.api_key_enabled = enabled;
        self.commit_config(&mut inner, draft)?;
        tracing::info!(enabled, "API key requirement updated");
        Ok(())
    }

    /// Replace the key with a caller-chosen value
    pub fn set_api_key(&self, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::missing("api_key"));
        }

        let mut inner = self.lock();
        let mut draft = inner.config.clone();
        draft.api_key = key.to_string();
        self.commit_config(&mut inner, draft)?;
        tracing::info!("API key replaced");
        Ok(())
    }

    /// Replace the key with a freshly generated one and return it
    pub fn regenerate_api_key(&self) -> Result<String> {
        let key = generate_key();
        let mut inner = self.lock();
        let mut draft = inner.config.clone();
        draft.api_key = key.clone();
        self.commit_config(&mut inner, draft)?;
        tracing::info!("API key regenerated");
        Ok(key)
    }

    /// Check a presented key against the gate
    ///
    /// Always passes when the gate is disabled.
    pub fn authorize(&self, presented: Option<&str>) -> Result<()> {
        let inner = self.lock();
        if !inner.config.api_key_enabled {
            return Ok(());
        }
        match presented {
            Some(key) if keys_match(&inner.config.api_key, key) => Ok(()),
            _ => {
                tracing::warn!(presented = presented.is_some(), "Rejected preset activation");
                Err(Error::Unauthorized)
            }
        }
    }
}
