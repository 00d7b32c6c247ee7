//! Epoch extraction pipeline
//!
//! For every selected recording, each synchronized video source produces one
//! artifact. State intervals become clips padded with context on both sides,
//! where frames inside the true interval get a highlight border. Events
//! become a single still frame. A failing recording is reported as a warning
//! and the batch moves on to the next one.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use behav_core::{BehaviorSlot, Recording, SlotId};
use tracing::{debug, info, warn};

use crate::border::draw_border;
use crate::{
    ArtifactSink, ClipWriter, Error, ExtractorConfig, FileSink, ProgressSink, Result, VideoReader,
    VideoSource,
};

/// Which recordings of one slot to export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpochSelection {
    All,
    /// Recording indices, exported in ascending order
    Indices(BTreeSet<usize>),
}

/// Per-slot selection; slots missing from the map are skipped
pub type Selection = BTreeMap<SlotId, EpochSelection>;

/// Selects every recording of every given slot
pub fn select_all(slots: &[BehaviorSlot]) -> Selection {
    slots
        .iter()
        .map(|s| (s.slot_id, EpochSelection::All))
        .collect()
}

/// Cooperative cancellation flag, checked between recordings
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A recording that could not be extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochWarning {
    pub slot_id: SlotId,
    pub behavior: String,
    pub index: usize,
    pub message: String,
}

impl fmt::Display for EpochWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to extract epoch {} for behavior {}: {}",
            self.index, self.behavior, self.message
        )
    }
}

/// Outcome of one extraction pass
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Recordings attempted, successful or not
    pub processed: usize,
    pub warnings: Vec<EpochWarning>,
    /// Files written, in order
    pub artifacts: Vec<PathBuf>,
    /// The output directory already held files before extraction
    pub output_dir_was_non_empty: bool,
    pub cancelled: bool,
}

impl ExtractionReport {
    /// True when every selected recording was attempted
    pub fn completed(&self) -> bool {
        !self.cancelled
    }
}

/// Exports recorded epochs from a set of synchronized video sources
pub struct EpochExtractor {
    sources: Vec<Box<dyn VideoSource>>,
    sink: Box<dyn ArtifactSink>,
    config: ExtractorConfig,
    unopened: Vec<String>,
}

impl EpochExtractor {
    /// Creates an extractor over already opened sources
    pub fn new(
        sources: Vec<Box<dyn VideoSource>>,
        sink: Box<dyn ArtifactSink>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            sources,
            sink,
            config,
            unopened: Vec::new(),
        }
    }

    /// Opens every video path with FFmpeg and writes artifacts to disk.
    ///
    /// Paths that fail to open are skipped and listed by [`Self::unopened`].
    /// Fails only if paths were given and none of them could be opened.
    pub fn open<P: AsRef<str>>(paths: &[P], config: ExtractorConfig) -> Result<Self> {
        let mut sources: Vec<Box<dyn VideoSource>> = Vec::with_capacity(paths.len());
        let mut unopened = Vec::new();

        for path in paths {
            let path = path.as_ref();
            match VideoReader::open(path) {
                Ok(reader) => {
                    info!(
                        path,
                        width = reader.width(),
                        height = reader.height(),
                        duration_ms = ?reader.duration_ms(),
                        "opened video source"
                    );
                    sources.push(Box::new(reader));
                }
                Err(e) => {
                    warn!(path, error = %e, "could not open video source");
                    unopened.push(path.to_string());
                }
            }
        }

        if !paths.is_empty() && sources.is_empty() {
            return Err(Error::SourceOpen { paths: unopened });
        }

        let mut extractor = Self::new(sources, Box::new(FileSink), config);
        extractor.unopened = unopened;
        Ok(extractor)
    }

    /// Configured paths that could not be opened
    pub fn unopened(&self) -> &[String] {
        &self.unopened
    }

    /// Number of usable sources
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extracts the selected recordings into `output_dir`
    pub fn extract(
        &mut self,
        slots: &[BehaviorSlot],
        output_dir: &Path,
        selection: &Selection,
        progress: &mut dyn ProgressSink,
    ) -> Result<ExtractionReport> {
        self.extract_with_cancel(
            slots,
            output_dir,
            selection,
            progress,
            &CancellationToken::new(),
        )
    }

    /// Like [`Self::extract`], stopping between recordings once `cancel` is set
    pub fn extract_with_cancel(
        &mut self,
        slots: &[BehaviorSlot],
        output_dir: &Path,
        selection: &Selection,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<ExtractionReport> {
        for (n, source) in self.sources.iter().enumerate() {
            if !source.is_open() {
                return Err(Error::SourceNotOpen(n));
            }
        }

        let mut report = ExtractionReport::default();

        fs::create_dir_all(output_dir)?;
        if fs::read_dir(output_dir)?.next().is_some() {
            warn!("Directory {} is not empty", output_dir.display());
            report.output_dir_was_non_empty = true;
        }

        for slot in slots {
            let Some(choice) = selection.get(&slot.slot_id) else {
                continue;
            };
            if slot.is_empty() {
                continue;
            }

            let indices: Vec<usize> = match choice {
                EpochSelection::All => (0..slot.len()).collect(),
                EpochSelection::Indices(set) => set.iter().copied().collect(),
            };
            if indices.is_empty() {
                continue;
            }

            info!(
                slot_id = slot.slot_id,
                behavior = %slot.name,
                epochs = indices.len(),
                "extracting epochs"
            );
            progress.begin(
                &format!("Extracting {} epochs", slot.name),
                indices.len() as u64,
            );

            for index in indices {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break;
                }

                let result = match slot.time_ms.get(index) {
                    Some(recording) => {
                        self.extract_recording(&slot.name, recording, output_dir, &mut report.artifacts)
                    }
                    None => Err(behav_core::Error::RecordingNotFound {
                        slot_id: slot.slot_id,
                        index,
                    }
                    .into()),
                };

                if let Err(e) = result {
                    let warning = EpochWarning {
                        slot_id: slot.slot_id,
                        behavior: slot.name.clone(),
                        index,
                        message: e.to_string(),
                    };
                    warn!("{warning}");
                    report.warnings.push(warning);
                }

                report.processed += 1;
                progress.advance();
            }

            progress.end();
            if report.cancelled {
                info!(processed = report.processed, "extraction cancelled");
                break;
            }
        }

        Ok(report)
    }

    fn extract_recording(
        &mut self,
        name: &str,
        recording: &Recording,
        output_dir: &Path,
        artifacts: &mut Vec<PathBuf>,
    ) -> Result<()> {
        match *recording {
            Recording::Interval { start_ms, end_ms } => {
                // name_start time_end time (source index)
                let prefix = format!("{name}_{}_{}", start_ms / 1000, end_ms / 1000);
                self.extract_interval(&output_dir.join(prefix), start_ms, end_ms, artifacts)
            }
            Recording::Point(time_ms) => {
                let prefix = format!("{name}_{}", time_ms / 1000);
                self.extract_point(&output_dir.join(prefix), time_ms, artifacts)
            }
        }
    }

    /// Writes one padded clip per source
    fn extract_interval(
        &mut self,
        prefix: &Path,
        start_ms: u64,
        end_ms: u64,
        artifacts: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let Self {
            sources,
            sink,
            config,
            ..
        } = self;

        let padded_start = start_ms.saturating_sub(config.padding_ms);
        let padded_end = end_ms.saturating_add(config.padding_ms);

        for (n, source) in sources.iter_mut().enumerate() {
            if !source.is_open() {
                return Err(Error::SourceNotOpen(n));
            }

            let (clip_start, clip_end) = clamp_window(
                padded_start as f64,
                padded_end as f64,
                source.duration_ms(),
            );

            let path = artifact_path(prefix, n, &config.clip_extension);
            let writer =
                sink.open_clip(&path, source.width(), source.height(), config.output_fps)?;

            let written = match write_clip(
                &mut **source,
                writer,
                config,
                clip_start,
                (start_ms as f64, end_ms as f64),
                clip_end,
            ) {
                Ok(written) => written,
                Err(e) => {
                    return Err(match sink.discard(&path) {
                        Ok(()) => e,
                        Err(discard_err) => {
                            warn!(
                                path = %path.display(),
                                error = %discard_err,
                                "could not remove incomplete clip"
                            );
                            Error::IncompleteClip {
                                path,
                                reason: e.to_string(),
                            }
                        }
                    });
                }
            };

            debug!(path = %path.display(), frames = written, "wrote clip");
            artifacts.push(path);
        }

        Ok(())
    }

    /// Writes one still frame per source
    fn extract_point(
        &mut self,
        prefix: &Path,
        time_ms: u64,
        artifacts: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let Self {
            sources,
            sink,
            config,
            ..
        } = self;

        for (n, source) in sources.iter_mut().enumerate() {
            if !source.is_open() {
                return Err(Error::SourceNotOpen(n));
            }

            source.seek(time_ms)?;
            let frame = source.read_next_frame()?.ok_or(Error::FrameRead {
                source_index: n,
                at_ms: time_ms,
            })?;

            let path = artifact_path(prefix, n, &config.still_extension);
            sink.write_still(&path, &frame.image)?;

            debug!(path = %path.display(), "wrote still");
            artifacts.push(path);
        }

        Ok(())
    }
}

/// Streams `[clip_start, clip_end]` into `writer`, bordering frames inside `highlight`.
///
/// The writer is finished on success and dropped unfinished on error.
fn write_clip(
    source: &mut dyn VideoSource,
    mut writer: Box<dyn ClipWriter>,
    config: &ExtractorConfig,
    clip_start: f64,
    highlight: (f64, f64),
    clip_end: f64,
) -> Result<usize> {
    source.seek(clip_start as u64)?;

    let mut written = 0usize;
    while let Some(mut frame) = source.read_next_frame()? {
        if frame.timestamp_ms > clip_end {
            break;
        }
        if frame.timestamp_ms >= highlight.0 && frame.timestamp_ms <= highlight.1 {
            draw_border(
                &mut frame.image,
                config.highlight_color,
                config.border_thickness,
            );
        }
        writer.write_frame(&frame.image)?;
        written += 1;
    }
    writer.finish()?;

    Ok(written)
}

/// Clamps a window to `[0, duration]` when the duration is known
fn clamp_window(start: f64, end: f64, duration_ms: Option<f64>) -> (f64, f64) {
    match duration_ms {
        Some(duration) => {
            let start = start.min(duration).max(0.0);
            let end = end.min(duration).max(start);
            (start, end)
        }
        None => (start, end),
    }
}

/// `{prefix}({source}).{extension}`
fn artifact_path(prefix: &Path, source_index: usize, extension: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(format!("({source_index}).{extension}"));
    PathBuf::from(name)
}
