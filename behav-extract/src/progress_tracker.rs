//! Progress reporting for extraction batches

use std::sync::mpsc::Sender;
use std::time::Instant;

use tracing::info;

/// Receives progress for one batch at a time: `begin`, any number of
/// `advance`, then `end`. Calls happen on the extracting thread.
pub trait ProgressSink {
    /// Announces a new batch of `total` items
    fn begin(&mut self, label: &str, total: u64);

    /// One item of the current batch finished, successfully or not
    fn advance(&mut self);

    /// The current batch is over
    fn end(&mut self);
}

/// Discards all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn begin(&mut self, _label: &str, _total: u64) {}

    fn advance(&mut self) {}

    fn end(&mut self) {}
}

/// Progress tracker with ETA estimation, reported through `tracing`
#[derive(Debug)]
pub struct ProgressTracker {
    total: u64,
    processed: u64,
    start_time: Instant,
    label: String,
    report_interval: u64,
}

impl ProgressTracker {
    /// Creates a tracker that logs every `report_interval` items
    pub fn new(report_interval: u64) -> Self {
        Self {
            total: 0,
            processed: 0,
            start_time: Instant::now(),
            label: String::new(),
            report_interval: report_interval.max(1),
        }
    }

    /// Items processed in the current batch
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Logs current progress with ETA
    fn print_progress(&self) {
        let current = self.processed;
        let elapsed_secs = self.start_time.elapsed().as_secs_f64();

        let percent = if self.total > 0 {
            (current as f64 / self.total as f64) * 100.0
        } else {
            0.0
        };

        if current > 0 && current < self.total {
            let rate = current as f64 / elapsed_secs.max(f64::EPSILON);
            let remaining = (self.total - current) as f64 / rate;
            info!(
                "{} {}/{} ({:.1}%) - elapsed: {} - ETA: {}",
                self.label,
                current,
                self.total,
                percent,
                format_duration(elapsed_secs),
                format_duration(remaining),
            );
        } else if current >= self.total {
            info!(
                "{} {}/{} (100.0%) - completed in {}",
                self.label,
                current,
                self.total,
                format_duration(elapsed_secs),
            );
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ProgressSink for ProgressTracker {
    fn begin(&mut self, label: &str, total: u64) {
        self.total = total;
        self.processed = 0;
        self.start_time = Instant::now();
        self.label = label.to_string();
    }

    fn advance(&mut self) {
        self.processed += 1;
        if self.processed % self.report_interval == 0 || self.processed == self.total {
            self.print_progress();
        }
    }

    fn end(&mut self) {
        if self.processed < self.total {
            info!(
                "{} stopped at {}/{}",
                self.label, self.processed, self.total
            );
        }
    }
}

/// Progress notification sent to another thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Begin { label: String, total: u64 },
    Advance,
    End,
}

/// Forwards progress over a channel, e.g. to an interactive front end
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: Sender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self { sender }
    }

    fn send(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching anymore
        let _ = self.sender.send(event);
    }
}

impl ProgressSink for ChannelProgress {
    fn begin(&mut self, label: &str, total: u64) {
        self.send(ProgressEvent::Begin {
            label: label.to_string(),
            total,
        });
    }

    fn advance(&mut self) {
        self.send(ProgressEvent::Advance);
    }

    fn end(&mut self) {
        self.send(ProgressEvent::End);
    }
}

/// Formats seconds into a human-readable duration string
fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor() as u64;
        let remaining = secs - (mins as f64 * 60.0);
        format!("{}m {:.0}s", mins, remaining)
    } else {
        let hours = (secs / 3600.0).floor() as u64;
        let remaining = secs - (hours as f64 * 3600.0);
        let mins = (remaining / 60.0).floor() as u64;
        let remaining_secs = remaining - (mins as f64 * 60.0);
        format!("{}h {}m {:.0}s", hours, mins, remaining_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(12.34), "12.3s");
        assert_eq!(format_duration(125.0), "2m 5s");
        assert_eq!(format_duration(3725.0), "1h 2m 5s");
    }

    #[test]
    fn test_tracker_counts_per_batch() {
        let mut tracker = ProgressTracker::new(10);
        tracker.begin("Extracting groom epochs", 3);
        tracker.advance();
        tracker.advance();
        assert_eq!(tracker.processed(), 2);
        tracker.end();

        tracker.begin("Extracting lick epochs", 1);
        assert_eq!(tracker.processed(), 0);
    }

    #[test]
    fn test_channel_progress() {
        let (tx, rx) = mpsc::channel();
        let mut progress = ChannelProgress::new(tx);
        progress.begin("batch", 2);
        progress.advance();
        progress.end();
        drop(progress);

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                ProgressEvent::Begin {
                    label: "batch".into(),
                    total: 2
                },
                ProgressEvent::Advance,
                ProgressEvent::End,
            ]
        );
    }
}
