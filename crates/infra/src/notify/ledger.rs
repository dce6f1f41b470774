use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockwatch_alerts::MessagePayload;
use stockwatch_core::StreamId;

use crate::store::StateCipher;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed-delivery ledger io failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed-delivery ledger line {line} is unreadable: {reason}")]
    Decode { line: usize, reason: String },

    #[error("failed delivery cannot be encoded: {0}")]
    Encode(String),
}

/// Messages of one run that could not be delivered, kept for re-delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDelivery {
    pub stream: StreamId,
    /// When delivery first failed.
    pub timestamp: DateTime<Utc>,
    /// Most recent failure.
    pub error: String,
    pub attempts: u32,
    /// Undelivered messages, in send order.
    #[serde(default)]
    pub payloads: Vec<MessagePayload>,
}

impl FailedDelivery {
    pub fn new(stream: StreamId, error: impl Into<String>, payloads: Vec<MessagePayload>) -> Self {
        Self {
            stream,
            timestamp: Utc::now(),
            error: error.into(),
            attempts: 1,
            payloads,
        }
    }

    /// Another failed attempt; `payloads` is what is still undelivered.
    pub fn retry_failed(&mut self, error: impl Into<String>, payloads: Vec<MessagePayload>) {
        self.attempts += 1;
        self.error = error.into();
        self.payloads = payloads;
    }

    fn summary(&self) -> String {
        format!(
            "Timestamp: {}\nError: {}\nAttempts: {}\n---",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.error,
            self.attempts
        )
    }
}

/// JSON-lines file of failed deliveries, one entry per line.
///
/// With a cipher each line is a sealed token instead of plain JSON.
#[derive(Debug, Clone)]
pub struct FailedDeliveryLog {
    path: PathBuf,
    cipher: Option<StateCipher>,
}

impl FailedDeliveryLog {
    pub const FILE_NAME: &'static str = "failed_deliveries.jsonl";
    pub const ENCRYPTED_FILE_NAME: &'static str = "failed_deliveries.enc";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cipher: None,
        }
    }

    /// The plaintext ledger kept alongside the snapshot state.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(Self::FILE_NAME))
    }

    /// The encrypted ledger kept alongside the snapshot state.
    pub fn encrypted_in_dir(dir: &Path, cipher: StateCipher) -> Self {
        Self {
            path: dir.join(Self::ENCRYPTED_FILE_NAME),
            cipher: Some(cipher),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn encode(&self, entry: &FailedDelivery) -> Result<String, LedgerError> {
        let json = serde_json::to_string(entry).map_err(|e| LedgerError::Encode(e.to_string()))?;
        let mut line = match &self.cipher {
            Some(cipher) => cipher.seal(json.as_bytes()),
            None => json,
        };
        line.push('\n');
        Ok(line)
    }

    fn decode(&self, line: usize, text: &str) -> Result<FailedDelivery, LedgerError> {
        let decode_err = |reason: String| LedgerError::Decode { line, reason };
        let json = match &self.cipher {
            Some(cipher) => cipher.open(text).map_err(|e| decode_err(e.to_string()))?,
            None => text.as_bytes().to_vec(),
        };
        serde_json::from_slice(&json).map_err(|e| decode_err(e.to_string()))
    }

    pub fn record(&self, entry: &FailedDelivery) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let line = self.encode(entry)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        file.write_all(line.as_bytes()).map_err(|e| self.io_err(e))
    }

    /// All recorded failures, oldest first. A missing ledger is empty.
    pub fn list(&self) -> Result<Vec<FailedDelivery>, LedgerError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };

        text.lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| self.decode(i + 1, l))
            .collect()
    }

    /// Replace the whole ledger. An empty list removes the file.
    pub fn replace(&self, entries: &[FailedDelivery]) -> Result<(), LedgerError> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(self.io_err(e)),
                _ => Ok(()),
            };
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let mut text = String::new();
        for entry in entries {
            text.push_str(&self.encode(entry)?);
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        {
            let mut file = fs::File::create(&tmp).map_err(|e| self.io_err(e))?;
            file.write_all(text.as_bytes()).map_err(|e| self.io_err(e))?;
            file.sync_all().map_err(|e| self.io_err(e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
    }
}

/// Human-readable listing: one block per failure, separated by `---`.
pub fn render_summary(entries: &[FailedDelivery]) -> String {
    entries
        .iter()
        .map(FailedDelivery::summary)
        .collect::<Vec<_>>()
        .join("\n")
}
