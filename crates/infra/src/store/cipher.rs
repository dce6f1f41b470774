use std::sync::Arc;

use fernet::Fernet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("encryption key must be 32 url-safe base64-encoded bytes")]
    InvalidKey,

    /// Wrong key, tampered token, or not a token at all.
    #[error("state cannot be decrypted with the configured key")]
    Decrypt,
}

/// Symmetric encryption for files kept under the state directory.
///
/// Tokens are standard Fernet tokens, so keys generated by other Fernet
/// implementations work unchanged.
#[derive(Clone)]
pub struct StateCipher {
    fernet: Arc<Fernet>,
}

impl std::fmt::Debug for StateCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCipher").finish_non_exhaustive()
    }
}

impl StateCipher {
    pub fn from_key(key: &str) -> Result<Self, CipherError> {
        let fernet = Fernet::new(key.trim()).ok_or(CipherError::InvalidKey)?;
        Ok(Self {
            fernet: Arc::new(fernet),
        })
    }

    pub fn generate_key() -> String {
        Fernet::generate_key()
    }

    /// Encrypt `plain` into a url-safe token (no newlines).
    pub fn seal(&self, plain: &[u8]) -> String {
        self.fernet.encrypt(plain)
    }

    pub fn open(&self, token: &str) -> Result<Vec<u8>, CipherError> {
        self.fernet.decrypt(token.trim()).map_err(|_| CipherError::Decrypt)
    }

    /// Like [`open`](Self::open), for raw file contents.
    pub fn open_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, CipherError> {
        let token = std::str::from_utf8(bytes).map_err(|_| CipherError::Decrypt)?;
        self.open(token)
    }
}
