//! Behav Core Library
//!
//! This library provides the behavior data model, the fixed shortcut table
//! and the keyboard-driven timeline recorder used to annotate video sessions.

pub mod keymap;
pub mod recorder;
pub mod slot;

#[cfg(feature = "serde")]
pub mod snapshot;

pub use keymap::{KeyAction, DELETE_KEY, MAX_SLOTS, SHORTCUT_KEYS, UNDO_KEY};
pub use recorder::{EditState, KeyOutcome, RecordedEvent, RemovedRecording, TimelineRecorder};
pub use slot::{BehaviorKind, BehaviorSlot, Recording, SlotId};

#[cfg(feature = "serde")]
pub use snapshot::TimelineSnapshot;

/// Result type for behav-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for behav-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No behavior is bound to key '{0}'")]
    UnmappedKey(char),

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Behavior slot not found: {0}")]
    SlotNotFound(SlotId),

    #[error("Recording {index} not found for behavior slot {slot_id}")]
    RecordingNotFound { slot_id: SlotId, index: usize },

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
