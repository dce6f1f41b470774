//! Outbound alert delivery.

pub mod ledger;
pub mod webhook;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use stockwatch_alerts::MessagePayload;

pub use ledger::{FailedDelivery, FailedDeliveryLog, LedgerError, render_summary};
pub use webhook::WebhookNotifier;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifierError {
    #[error("webhook request failed: {0}")]
    Transport(String),

    #[error("webhook rejected message with {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers one rendered message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, payload: &MessagePayload) -> Result<(), NotifierError>;
}

#[async_trait]
impl<N> Notifier for Arc<N>
where
    N: Notifier + ?Sized,
{
    async fn send(&self, payload: &MessagePayload) -> Result<(), NotifierError> {
        (**self).send(payload).await
    }
}

/// Records every payload; optionally fails on demand.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<MessagePayload>>,
    /// Fail once this many payloads have been recorded.
    fail_after: Mutex<Option<(usize, NotifierError)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `send` fails with `error` (nothing is recorded).
    pub fn failing(error: NotifierError) -> Self {
        Self::failing_after(0, error)
    }

    /// The first `accepted` sends succeed; every later one fails with `error`.
    pub fn failing_after(accepted: usize, error: NotifierError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_after: Mutex::new(Some((accepted, error))),
        }
    }

    /// Stop failing.
    pub fn recover(&self) {
        if let Ok(mut fail_after) = self.fail_after.lock() {
            *fail_after = None;
        }
    }

    pub fn sent(&self) -> Vec<MessagePayload> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, payload: &MessagePayload) -> Result<(), NotifierError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| NotifierError::Transport("recorder lock poisoned".into()))?;
        let failure = self.fail_after.lock().ok().and_then(|f| f.clone());
        if let Some((accepted, err)) = failure {
            if sent.len() >= accepted {
                return Err(err);
            }
        }
        sent.push(payload.clone());
        Ok(())
    }
}
