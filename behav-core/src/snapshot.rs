//! JSON snapshots of a recorded timeline

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::{BehaviorSlot, Error, Result, TimelineRecorder};

/// Current snapshot format version
const VERSION: u16 = 1;

/// Serializable view of every slot of a session, including recordings.
///
/// Pending intervals are session-only state and are not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    pub version: u16,
    /// Video files the timeline was recorded against, in source order
    #[serde(default)]
    pub video_paths: Vec<String>,
    pub slots: Vec<BehaviorSlot>,
}

impl TimelineSnapshot {
    /// Captures the slots of a recorder
    pub fn capture(recorder: &TimelineRecorder, video_paths: Vec<String>) -> Self {
        Self {
            version: VERSION,
            video_paths,
            slots: recorder.slots().to_vec(),
        }
    }

    /// Rebuilds a recorder, validating every slot
    pub fn into_recorder(self) -> Result<TimelineRecorder> {
        TimelineRecorder::from_slots(self.slots)
    }

    /// Reads a snapshot from JSON
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let snapshot: Self = serde_json::from_reader(reader)?;
        if snapshot.version != VERSION {
            return Err(Error::Validation(format!(
                "Unsupported timeline version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Writes the snapshot as pretty-printed JSON
    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
