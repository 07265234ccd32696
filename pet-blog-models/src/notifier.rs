use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("no mail transport is configured")]
    NotConfigured,
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Something able to deliver a short message to an email address.
///
/// Implementations are shared between request handlers, so they must be `Send + Sync`.
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every message in memory instead of sending it.
///
/// Clones share the same storage, so a copy can be handed to the application
/// while another one is kept to inspect what was sent.
#[derive(Clone, Default)]
pub struct Outbox {
    sent: Arc<Mutex<Vec<Mail>>>,
    attempts: Arc<AtomicUsize>,
    failing: Arc<HashSet<String>>,
}

impl Outbox {
    pub fn new() -> Self {
        Outbox::default()
    }

    /// An outbox that refuses any message addressed to one of `recipients`.
    pub fn failing_for<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Outbox {
            sent: Arc::default(),
            attempts: Arc::default(),
            failing: Arc::new(recipients.into_iter().map(Into::into).collect()),
        }
    }

    /// How many times `notify` was called, failed deliveries included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// The messages delivered so far, oldest first.
    pub fn sent(&self) -> Vec<Mail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Notifier for Outbox {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(recipient) {
            return Err(NotifyError::Transport(format!(
                "{} refused the message",
                recipient
            )));
        }
        self.sent
            .lock()
            .map_err(|_| NotifyError::Transport("outbox lock poisoned".to_owned()))?
            .push(Mail {
                to: recipient.to_owned(),
                subject: subject.to_owned(),
                body: body.to_owned(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbox_records() {
        let outbox = Outbox::new();
        let shared = outbox.clone();
        shared.notify("a@example.com", "Hi", "Hello").unwrap();
        assert_eq!(
            outbox.sent(),
            vec![Mail {
                to: "a@example.com".to_owned(),
                subject: "Hi".to_owned(),
                body: "Hello".to_owned(),
            }]
        );
    }

    #[test]
    fn outbox_failures() {
        let outbox = Outbox::failing_for(vec!["b@example.com"]);
        assert!(outbox.notify("b@example.com", "Hi", "Hello").is_err());
        assert!(outbox.notify("a@example.com", "Hi", "Hello").is_ok());
        assert_eq!(outbox.sent().len(), 1);
        assert_eq!(outbox.attempts(), 2);
    }
}
