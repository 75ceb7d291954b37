//! [`RecordingNotifier`] — a [`Notifier`] that appends every sent message to
//! a shared, lock-guarded log instead of dispatching anywhere, so tests can
//! assert on what `notify(...)` and the alert path actually sent.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Error;
use crate::port::notifier::Notifier;

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<(), Error> {
        self.sent.lock().push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_every_message_in_order() {
        let notifier = RecordingNotifier::new();
        notifier.send("first").await.unwrap();
        notifier.send("second").await.unwrap();
        assert_eq!(notifier.sent(), vec!["first".to_string(), "second".to_string()]);
    }
}
