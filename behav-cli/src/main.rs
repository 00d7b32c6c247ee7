//! Behav CLI Tool
//!
//! Command-line interface for recording behavior timelines and exporting
//! the recorded epochs from synchronized videos.

use anyhow::{bail, Context, Result};
use behav_core::slot::parse_hex_color;
use behav_core::{BehaviorKind, KeyOutcome, Recording, TimelineRecorder, TimelineSnapshot};
use behav_extract::{
    select_all, spawn_extraction, EpochExtractor, EpochSelection, ExtractionJob, ExtractorConfig,
    ProgressEvent, Selection, OUTPUT_FPS, PADDING_MS,
};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "behav")]
#[command(about = "Behavior annotation - keyboard timeline recording and epoch extraction")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a key script into a new timeline
    Record {
        /// Behavior definition as name:kind:#rrggbb[:note], in shortcut order
        #[arg(short, long = "behavior", required = true)]
        behaviors: Vec<String>,

        /// Key script, one `<key> <time_ms>` per line
        #[arg(short, long)]
        script: PathBuf,

        /// Video files the timeline refers to
        #[arg(long = "video")]
        videos: Vec<String>,

        /// Output timeline JSON path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the behaviors and epochs of a timeline
    Info {
        /// Timeline JSON path
        input: PathBuf,
    },

    /// Export recorded epochs as clips and still frames
    Export {
        /// Timeline JSON path
        input: PathBuf,

        /// Video files, overriding those stored in the timeline
        #[arg(long = "video")]
        videos: Vec<String>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Only export these behavior slot ids
        #[arg(long = "slot")]
        slots: Vec<u32>,

        /// Context before and after each state interval, in milliseconds
        #[arg(long, default_value_t = PADDING_MS)]
        padding_ms: u64,

        /// Frame rate of exported clips
        #[arg(long, default_value_t = OUTPUT_FPS)]
        fps: u32,

        /// Border color for frames inside a state interval
        #[arg(long, default_value = "#ff0000")]
        highlight: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Record {
            behaviors,
            script,
            videos,
            output,
        } => record_timeline(&behaviors, &script, videos, &output)?,

        Commands::Info { input } => show_info(&input)?,

        Commands::Export {
            input,
            videos,
            output,
            slots,
            padding_ms,
            fps,
            highlight,
        } => export_epochs(&input, videos, output, &slots, padding_ms, fps, &highlight)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Parsed `name:kind:#color[:note]` behavior definition
#[derive(Debug, PartialEq, Eq)]
struct BehaviorDef {
    name: String,
    kind: BehaviorKind,
    color: String,
    note: String,
}

fn parse_behavior(def: &str) -> Result<BehaviorDef> {
    let mut parts = def.splitn(4, ':');
    let name = parts.next().unwrap_or_default().trim();
    let kind = parts
        .next()
        .with_context(|| format!("Missing kind in behavior '{def}'"))?;
    let color = parts
        .next()
        .with_context(|| format!("Missing color in behavior '{def}'"))?;
    let note = parts.next().unwrap_or_default();

    Ok(BehaviorDef {
        name: name.to_string(),
        kind: kind.trim().parse()?,
        color: color.trim().to_string(),
        note: note.to_string(),
    })
}

/// Parses one script line into a key and a time; blank lines and comments yield `None`
fn parse_script_line(line: &str) -> Result<Option<(char, u64)>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();
    let key = fields.next().unwrap_or_default();
    let time = fields
        .next()
        .with_context(|| format!("Missing time in '{line}'"))?;
    if fields.next().is_some() {
        bail!("Expected `<key> <time_ms>`, got '{line}'");
    }

    let mut chars = key.chars();
    let (Some(key), None) = (chars.next(), chars.next()) else {
        bail!("Key must be a single character, got '{key}'");
    };
    let time_ms = time
        .parse::<u64>()
        .with_context(|| format!("Invalid time '{time}'"))?;

    Ok(Some((key, time_ms)))
}

fn format_recording(recording: &Recording) -> String {
    match recording {
        Recording::Point(t) => format!("{t} ms"),
        Recording::Interval { start_ms, end_ms } => {
            format!("{start_ms}-{end_ms} ms ({} ms)", recording.duration_ms())
        }
    }
}

fn record_timeline(
    behaviors: &[String],
    script: &Path,
    videos: Vec<String>,
    output: &Path,
) -> Result<()> {
    let mut recorder = TimelineRecorder::new();
    for def in behaviors {
        let def = parse_behavior(def)?;
        let slot_id = recorder
            .add_slot(&def.name, def.kind, &def.color, &def.note)
            .with_context(|| format!("Failed to add behavior '{}'", def.name))?;
        println!(
            "Behavior {} [{}] {} ({})",
            slot_id,
            recorder.shortcut_for(slot_id).unwrap_or('?'),
            def.name,
            def.kind
        );
    }

    let text = fs::read_to_string(script)
        .with_context(|| format!("Failed to read script {}", script.display()))?;

    for (number, line) in text.lines().enumerate() {
        let number = number + 1;
        let Some((key, time_ms)) =
            parse_script_line(line).with_context(|| format!("Script line {number}"))?
        else {
            continue;
        };

        match recorder.handle_key(key, time_ms) {
            Ok(outcome) => print_outcome(&recorder, time_ms, &outcome),
            Err(e) => warn!("line {number}: {e}"),
        }
    }

    for &slot_id in recorder.pending_slots() {
        if let (Ok(name), Some(start_ms)) = (recorder.name(slot_id), recorder.pending_start(slot_id)) {
            println!("Unclosed interval for {name} started at {start_ms} ms was not saved");
        }
    }

    let snapshot = TimelineSnapshot::capture(&recorder, videos);
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    snapshot
        .write(&mut writer)
        .context("Failed to write timeline")?;
    writer.flush()?;

    println!("Timeline written to {}", output.display());
    Ok(())
}

fn print_outcome(recorder: &TimelineRecorder, time_ms: u64, outcome: &KeyOutcome) {
    let name = |slot_id| recorder.name(slot_id).unwrap_or("?").to_string();

    match outcome {
        KeyOutcome::Recorded(event) => println!(
            "{:>8} ms  {}: recorded {}",
            time_ms,
            name(event.slot_id),
            format_recording(&event.recording)
        ),
        KeyOutcome::Started { slot_id, start_ms } => {
            println!("{:>8} ms  {}: started at {start_ms} ms", time_ms, name(*slot_id))
        }
        KeyOutcome::Undone { slot_id, start_ms } => println!(
            "{:>8} ms  {}: discarded interval started at {start_ms} ms",
            time_ms,
            name(*slot_id)
        ),
        KeyOutcome::NothingToUndo => println!("{:>8} ms  nothing to undo", time_ms),
        KeyOutcome::Deleted(removed) if removed.is_empty() => {
            println!("{:>8} ms  nothing to delete", time_ms)
        }
        KeyOutcome::Deleted(removed) => {
            for r in removed {
                println!(
                    "{:>8} ms  {}: deleted {}",
                    time_ms,
                    name(r.slot_id),
                    format_recording(&r.recording)
                );
            }
        }
    }
}

fn read_snapshot(path: &Path) -> Result<TimelineSnapshot> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    TimelineSnapshot::read(BufReader::new(file))
        .with_context(|| format!("Failed to parse timeline {}", path.display()))
}

fn show_info(input: &Path) -> Result<()> {
    let snapshot = read_snapshot(input)?;
    let recorder = snapshot
        .clone()
        .into_recorder()
        .context("Invalid timeline")?;

    println!("Timeline: {}", input.display());
    println!("Version: {}", snapshot.version);
    for (n, path) in snapshot.video_paths.iter().enumerate() {
        println!("Video {}: {}", n, path);
    }
    println!("Behaviors: {}", recorder.len());

    for slot in recorder.slots() {
        println!();
        println!(
            "[{}] {} ({}, {}) key '{}'",
            slot.slot_id,
            slot.name,
            slot.kind,
            slot.color,
            recorder.shortcut_for(slot.slot_id).unwrap_or('?')
        );
        if !slot.note.is_empty() {
            println!("  Note: {}", slot.note);
        }
        println!("  Epochs: {}", slot.len());
        for (index, recording) in slot.time_ms.iter().enumerate() {
            println!("    {:>3}: {}", index, format_recording(recording));
        }
    }

    Ok(())
}

fn export_epochs(
    input: &Path,
    videos: Vec<String>,
    output: PathBuf,
    slot_ids: &[u32],
    padding_ms: u64,
    fps: u32,
    highlight: &str,
) -> Result<()> {
    let snapshot = read_snapshot(input)?;
    let videos = if videos.is_empty() {
        snapshot.video_paths.clone()
    } else {
        videos
    };
    if videos.is_empty() {
        bail!("No video files given and none stored in {}", input.display());
    }

    let color = parse_hex_color(highlight)
        .with_context(|| format!("Invalid highlight color '{highlight}'"))?;
    let config = ExtractorConfig::default()
        .with_padding_ms(padding_ms)
        .with_output_fps(fps)
        .with_highlight_color(color);

    let slots = snapshot
        .into_recorder()
        .with_context(|| format!("Invalid timeline {}", input.display()))?
        .into_slots();
    let selection: Selection = if slot_ids.is_empty() {
        select_all(&slots)
    } else {
        for id in slot_ids {
            if !slots.iter().any(|s| s.slot_id == *id) {
                bail!("No behavior with slot id {id} in {}", input.display());
            }
        }
        slot_ids.iter().map(|&id| (id, EpochSelection::All)).collect()
    };

    println!("Exporting epochs to {}", output.display());
    for (n, path) in videos.iter().enumerate() {
        println!("Video {}: {}", n, path);
    }
    debug!(?config, "extraction config");

    let job = ExtractionJob {
        slots,
        output_dir: output,
        selection,
    };
    let handle = spawn_extraction(move || EpochExtractor::open(videos.as_slice(), config), job)
        .context("Failed to start extraction")?;

    let mut label = String::new();
    let mut total = 0;
    let mut done = 0;
    let mut stdout = std::io::stdout();
    for event in handle.progress().iter() {
        match event {
            ProgressEvent::Begin { label: l, total: t } => {
                label = l;
                total = t;
                done = 0;
                print!("{label}: 0/{total}");
            }
            ProgressEvent::Advance => {
                done += 1;
                print!("\r{label}: {done}/{total}");
            }
            ProgressEvent::End => println!(),
        }
        stdout.flush().ok();
    }

    let report = handle.join().context("Extraction failed")?;

    println!(
        "Processed {} epochs, wrote {} files",
        report.processed,
        report.artifacts.len()
    );
    if report.output_dir_was_non_empty {
        println!("Note: the output directory was not empty before export");
    }
    if !report.warnings.is_empty() {
        println!("{} epochs could not be extracted:", report.warnings.len());
        for warning in &report.warnings {
            println!("  {warning}");
        }
    }
    if !report.completed() {
        bail!("Extraction did not complete");
    }

    Ok(())
}
