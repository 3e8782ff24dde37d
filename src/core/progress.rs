/*!
 * Per-file transfer progress
 *
 * A [`TransferSession`] accumulates the bytes reported for one file. The
 * [`ProgressTracker`] adds byte counts to a session and decides when a
 * [`ProgressSnapshot`] is worth showing: at most once per interval (one
 * second by default) per session. Snapshots and lifecycle markers reach the
 * presentation layer as [`UploadEvent`]s through an [`EventSink`].
 *
 * Parts of a multipart upload complete in any order; the tracker only ever
 * sums counts, so ordering does not matter.
 */

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default minimum spacing between two snapshots of the same session
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Smallest elapsed time used for rate calculations
const MIN_ELAPSED: Duration = Duration::from_millis(1);

/// Progress state of a single file transfer
#[derive(Debug, Clone)]
pub struct TransferSession {
    pub file_name: String,
    pub file_path: PathBuf,
    pub total_bytes: u64,
    pub bytes_transferred: u64,
    pub start_time: Instant,
    pub last_report_time: Instant,
}

impl TransferSession {
    /// Start a session now
    pub fn new(file_name: impl Into<String>, file_path: impl AsRef<Path>, total_bytes: u64) -> Self {
        Self::starting_at(file_name, file_path, total_bytes, Instant::now())
    }

    /// Start a session at a given instant
    pub fn starting_at(
        file_name: impl Into<String>,
        file_path: impl AsRef<Path>,
        total_bytes: u64,
        start_time: Instant,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_path: file_path.as_ref().to_path_buf(),
            total_bytes,
            bytes_transferred: 0,
            start_time,
            last_report_time: start_time,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_transferred == self.total_bytes
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.bytes_transferred)
    }
}

/// Point-in-time view of a session, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub file_name: String,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    pub elapsed_secs: f64,
    pub rate_bytes_per_sec: f64,
    pub eta_secs: Option<f64>,
}

impl ProgressSnapshot {
    /// Completion percentage (an empty file counts as done)
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            100.0
        } else {
            self.bytes_transferred as f64 / self.total_bytes as f64 * 100.0
        }
    }

    pub fn eta(&self) -> Option<Duration> {
        self.eta_secs.map(Duration::from_secs_f64)
    }
}

/// Accumulates byte counts into sessions and throttles snapshots
#[derive(Debug, Clone, Copy)]
pub struct ProgressTracker {
    interval: Duration,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_REPORT_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Record `n` more bytes for `session`
    ///
    /// Returns a snapshot when the last one for this session is at least one
    /// interval old.
    pub fn on_bytes(&self, session: &mut TransferSession, n: u64) -> Option<ProgressSnapshot> {
        self.on_bytes_at(session, n, Instant::now())
    }

    /// Same as [`on_bytes`](Self::on_bytes) with an explicit clock
    pub fn on_bytes_at(
        &self,
        session: &mut TransferSession,
        n: u64,
        now: Instant,
    ) -> Option<ProgressSnapshot> {
        session.bytes_transferred = session
            .bytes_transferred
            .saturating_add(n)
            .min(session.total_bytes);

        if now.saturating_duration_since(session.last_report_time) < self.interval {
            return None;
        }

        session.last_report_time = now;
        Some(Self::snapshot_at(session, now))
    }

    /// Mark the session finished and return its final snapshot
    pub fn complete(&self, session: &mut TransferSession) -> ProgressSnapshot {
        self.complete_at(session, Instant::now())
    }

    pub fn complete_at(&self, session: &mut TransferSession, now: Instant) -> ProgressSnapshot {
        session.bytes_transferred = session.total_bytes;
        session.last_report_time = now;
        Self::snapshot_at(session, now)
    }

    /// Rate and ETA of a session as of `now`
    pub fn snapshot_at(session: &TransferSession, now: Instant) -> ProgressSnapshot {
        let elapsed = now
            .saturating_duration_since(session.start_time)
            .max(MIN_ELAPSED)
            .as_secs_f64();
        let rate = session.bytes_transferred as f64 / elapsed;
        let eta_secs = if session.bytes_transferred > 0 {
            Some(session.remaining_bytes() as f64 / rate)
        } else {
            None
        };

        ProgressSnapshot {
            file_name: session.file_name.clone(),
            bytes_transferred: session.bytes_transferred,
            total_bytes: session.total_bytes,
            elapsed_secs: elapsed,
            rate_bytes_per_sec: rate,
            eta_secs,
        }
    }
}

/// Lifecycle of an upload batch, as seen by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UploadEvent {
    BatchStarted {
        directory: PathBuf,
        files: usize,
        total_bytes: u64,
    },
    FileStarted {
        file_name: String,
        index: usize,
        count: usize,
        total_bytes: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<String>,
    },
    Progress(ProgressSnapshot),
    FileCompleted {
        file_name: String,
        bytes: u64,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<String>,
    },
    /// `bytes_transferred` counts bytes sent before the failure and never
    /// reaches the size of a non-empty file
    FileFailed {
        file_name: String,
        error: String,
        bytes_transferred: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<String>,
    },
    BatchCompleted {
        succeeded: usize,
        failed: usize,
        total_bytes: u64,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<String>,
    },
}

/// Receiver of upload events
pub trait EventSink {
    fn emit(&mut self, event: &UploadEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &UploadEvent) {}
}

impl EventSink for Vec<UploadEvent> {
    fn emit(&mut self, event: &UploadEvent) {
        self.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at(total: u64, start: Instant) -> TransferSession {
        TransferSession::starting_at("movie.mkv", "/tmp/movie.mkv", total, start)
    }

    #[test]
    fn test_eta_from_rate() {
        let start = Instant::now();
        let session = TransferSession {
            bytes_transferred: 250,
            ..session_at(1000, start)
        };

        let snapshot = ProgressTracker::snapshot_at(&session, start + Duration::from_secs(10));
        assert_eq!(snapshot.rate_bytes_per_sec, 25.0);
        assert_eq!(snapshot.eta_secs, Some(30.0));
        assert_eq!(snapshot.percent(), 25.0);
    }

    #[test]
    fn test_eta_unknown_before_first_byte() {
        let start = Instant::now();
        let session = session_at(1000, start);
        let snapshot = ProgressTracker::snapshot_at(&session, start);

        assert_eq!(snapshot.eta_secs, None);
        assert_eq!(snapshot.rate_bytes_per_sec, 0.0);
        // Zero elapsed is floored to 1 ms rather than dividing by zero.
        assert_eq!(snapshot.elapsed_secs, 0.001);
    }

    #[test]
    fn test_burst_within_half_second_emits_nothing() {
        let tracker = ProgressTracker::new();
        let start = Instant::now();
        let mut session = session_at(1_000_000, start);

        let emitted = (0..100)
            .filter_map(|i| {
                let now = start + Duration::from_millis(i * 5);
                tracker.on_bytes_at(&mut session, 100, now)
            })
            .count();

        assert!(emitted <= 1);
        assert_eq!(session.bytes_transferred, 10_000);
    }

    #[test]
    fn test_emits_at_most_once_per_interval() {
        let tracker = ProgressTracker::new();
        let start = Instant::now();
        let mut session = session_at(1_000_000, start);

        // 10 s of callbacks every 100 ms
        let emitted = (1..=100)
            .filter_map(|i| {
                let now = start + Duration::from_millis(i * 100);
                tracker.on_bytes_at(&mut session, 1000, now)
            })
            .count();

        assert_eq!(emitted, 10);
    }

    #[test]
    fn test_bytes_clamped_to_total() {
        let tracker = ProgressTracker::new();
        let start = Instant::now();
        let mut session = session_at(100, start);

        tracker.on_bytes_at(&mut session, 80, start);
        tracker.on_bytes_at(&mut session, 80, start);
        assert_eq!(session.bytes_transferred, 100);

        tracker.on_bytes_at(&mut session, u64::MAX, start);
        assert_eq!(session.bytes_transferred, 100);
    }

    #[test]
    fn test_out_of_order_parts_sum_the_same() {
        let tracker = ProgressTracker::new();
        let start = Instant::now();
        let mut a = session_at(30, start);
        let mut b = session_at(30, start);

        for n in [10, 5, 15] {
            tracker.on_bytes_at(&mut a, n, start);
        }
        for n in [15, 10, 5] {
            tracker.on_bytes_at(&mut b, n, start);
        }
        assert_eq!(a.bytes_transferred, b.bytes_transferred);
    }

    #[test]
    fn test_complete_sets_total() {
        let tracker = ProgressTracker::new();
        let start = Instant::now();
        let mut session = session_at(500, start);
        tracker.on_bytes_at(&mut session, 200, start);

        let snapshot = tracker.complete_at(&mut session, start + Duration::from_secs(2));
        assert!(session.is_complete());
        assert_eq!(snapshot.bytes_transferred, 500);
        assert_eq!(snapshot.eta_secs, Some(0.0));
    }

    #[test]
    fn test_empty_file_is_fully_done() {
        let tracker = ProgressTracker::new();
        let mut session = TransferSession::new("empty.txt", "/tmp/empty.txt", 0);
        let snapshot = tracker.complete(&mut session);
        assert_eq!(snapshot.percent(), 100.0);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = UploadEvent::FileFailed {
            file_name: "a.bin".to_string(),
            error: "boom".to_string(),
            bytes_transferred: 3,
            destination: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "file_failed");
        assert_eq!(json["file_name"], "a.bin");
        assert!(json.get("destination").is_none());

        let labelled = UploadEvent::FileStarted {
            file_name: "a.bin".to_string(),
            index: 0,
            count: 1,
            total_bytes: 3,
            destination: Some("Wasabi".to_string()),
        };
        let json = serde_json::to_value(&labelled).unwrap();
        assert_eq!(json["destination"], "Wasabi");
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<UploadEvent> = Vec::new();
        sink.emit(&UploadEvent::BatchCompleted {
            succeeded: 1,
            failed: 0,
            total_bytes: 10,
            duration_ms: 5,
            destination: None,
        });
        assert_eq!(sink.len(), 1);
    }
}
