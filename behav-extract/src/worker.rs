//! Background extraction
//!
//! FFmpeg contexts stay on the thread that created them, so the worker builds
//! its own [`EpochExtractor`] from a closure and reports back over a channel.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use behav_core::BehaviorSlot;
use tracing::{debug, info};

use crate::{
    CancellationToken, ChannelProgress, EpochExtractor, Error, ExtractionReport, ProgressEvent,
    Result, Selection,
};

/// Everything the worker needs besides the extractor itself
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub slots: Vec<BehaviorSlot>,
    pub output_dir: PathBuf,
    pub selection: Selection,
}

/// Handle to a running extraction
pub struct ExtractionHandle {
    thread: JoinHandle<Result<ExtractionReport>>,
    progress: Receiver<ProgressEvent>,
    cancel: CancellationToken,
}

impl ExtractionHandle {
    /// Progress events; the channel closes when the worker exits
    pub fn progress(&self) -> &Receiver<ProgressEvent> {
        &self.progress
    }

    /// Asks the worker to stop before its next recording
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the worker and returns its report
    pub fn join(self) -> Result<ExtractionReport> {
        self.thread
            .join()
            .map_err(|panic| Error::Worker(panic_message(panic.as_ref())))?
    }
}

/// Runs `job` on a dedicated thread with an extractor created by `build`
pub fn spawn_extraction<F>(build: F, job: ExtractionJob) -> Result<ExtractionHandle>
where
    F: FnOnce() -> Result<EpochExtractor> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let thread = thread::Builder::new()
        .name("behav-extract".to_string())
        .spawn(move || {
            let mut extractor = build()?;
            debug!(sources = extractor.source_count(), "extraction worker started");

            let mut progress = ChannelProgress::new(tx);
            let report = extractor.extract_with_cancel(
                &job.slots,
                &job.output_dir,
                &job.selection,
                &mut progress,
                &token,
            )?;

            info!(
                processed = report.processed,
                warnings = report.warnings.len(),
                cancelled = report.cancelled,
                "extraction worker finished"
            );
            Ok(report)
        })?;

    Ok(ExtractionHandle {
        thread,
        progress: rx,
        cancel,
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker thread panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemorySink, MockSource};
    use crate::{select_all, ExtractorConfig, VideoSource};
    use behav_core::{BehaviorKind, Recording};

    fn groom_job(dir: &std::path::Path, intervals: &[(u64, u64)]) -> ExtractionJob {
        let mut slot =
            BehaviorSlot::new(0, "groom", BehaviorKind::State, "#00ff00", "").unwrap();
        for &(start, end) in intervals {
            slot.push(Recording::interval(start, end)).unwrap();
        }
        let slots = vec![slot];
        ExtractionJob {
            selection: select_all(&slots),
            slots,
            output_dir: dir.to_path_buf(),
        }
    }

    fn mock_extractor() -> Result<EpochExtractor> {
        let sources: Vec<Box<dyn VideoSource>> = vec![Box::new(MockSource::new(10.0, 60_000.0))];
        Ok(EpochExtractor::new(
            sources,
            Box::new(MemorySink::default()),
            ExtractorConfig::default(),
        ))
    }

    #[test]
    fn test_worker_reports_progress_and_result() {
        let dir = tempfile::tempdir().unwrap();
        let job = groom_job(dir.path(), &[(2_000, 3_000), (5_000, 6_000)]);

        let handle = spawn_extraction(mock_extractor, job).unwrap();
        let events: Vec<ProgressEvent> = handle.progress().iter().collect();
        let report = handle.join().unwrap();

        assert!(report.completed());
        assert_eq!(report.processed, 2);
        assert_eq!(report.artifacts.len(), 2);
        assert_eq!(
            events,
            vec![
                ProgressEvent::Begin {
                    label: "Extracting groom epochs".into(),
                    total: 2
                },
                ProgressEvent::Advance,
                ProgressEvent::Advance,
                ProgressEvent::End,
            ]
        );
    }

    #[test]
    fn test_worker_build_failure() {
        let dir = tempfile::tempdir().unwrap();
        let job = groom_job(dir.path(), &[(2_000, 3_000)]);

        let handle = spawn_extraction(
            || Err(Error::SourceOpen {
                paths: vec!["cam0.mp4".into()],
            }),
            job,
        )
        .unwrap();

        assert!(matches!(handle.join(), Err(Error::SourceOpen { .. })));
    }

    #[test]
    fn test_worker_cancelled_before_build() {
        let dir = tempfile::tempdir().unwrap();
        let job = groom_job(dir.path(), &[(2_000, 3_000), (5_000, 6_000)]);
        let (ready_tx, ready_rx) = mpsc::channel::<()>();

        let handle = spawn_extraction(
            move || {
                ready_rx.recv().ok();
                mock_extractor()
            },
            job,
        )
        .unwrap();
        handle.cancel();
        ready_tx.send(()).unwrap();

        let report = handle.join().unwrap();
        assert!(report.cancelled);
        assert_eq!(report.processed, 0);
    }

    #[test]
    fn test_worker_panic_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let job = groom_job(dir.path(), &[(2_000, 3_000)]);

        let handle = spawn_extraction(|| panic!("decoder exploded"), job).unwrap();
        match handle.join() {
            Err(Error::Worker(message)) => assert_eq!(message, "decoder exploded"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
