//! Byte-level progress reporting for S3 transfers
//!
//! The client layer does not know who is watching a transfer. It reports
//! raw byte counts through a [`ProgressReporter`]; the consumer drains the
//! matching receiver and turns the counts into sessions, rates and ETAs
//! (see `crate::core::progress`).
//!
//! Multipart parts finish in any order, so a report only ever says "n more
//! bytes are done", never which part they belonged to.
//!
//! ```ignore
//! let (reporter, mut receiver) = ProgressReporter::new();
//! let upload = client.upload_file(path, "photo.jpg", reporter);
//! // poll `upload` while draining `receiver.recv()`
//! ```

use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Progress reporter handed to a transfer
#[derive(Clone, Debug)]
pub struct ProgressReporter {
    sender: Option<Arc<UnboundedSender<u64>>>,
}

impl ProgressReporter {
    /// Create a new progress reporter and the receiver for its byte counts
    pub fn new() -> (Self, UnboundedReceiver<u64>) {
        let (sender, receiver) = unbounded_channel();
        (
            Self {
                sender: Some(Arc::new(sender)),
            },
            receiver,
        )
    }

    /// A reporter whose reports go nowhere
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Report that `bytes` more bytes have been transferred
    pub fn report(&self, bytes: u64) {
        if bytes == 0 {
            return;
        }
        if let Some(sender) = &self.sender {
            // Receiver may already be gone; the transfer itself is unaffected.
            let _ = sender.send(bytes);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_reach_receiver() {
        let (reporter, mut receiver) = ProgressReporter::new();

        reporter.report(100);
        reporter.clone().report(50);
        drop(reporter);

        assert_eq!(receiver.recv().await, Some(100));
        assert_eq!(receiver.recv().await, Some(50));
        assert_eq!(receiver.recv().await, None);
    }

    #[tokio::test]
    async fn test_zero_byte_reports_are_skipped() {
        let (reporter, mut receiver) = ProgressReporter::new();
        reporter.report(0);
        reporter.report(7);
        drop(reporter);

        assert_eq!(receiver.recv().await, Some(7));
        assert_eq!(receiver.recv().await, None);
    }

    #[test]
    fn test_disabled_reporter_does_not_panic() {
        let reporter = ProgressReporter::disabled();
        reporter.report(1024);

        let (reporter, receiver) = ProgressReporter::new();
        drop(receiver);
        reporter.report(1024);
    }
}
