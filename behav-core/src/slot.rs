//! Behavior slot data structures

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable identifier of a behavior slot, assigned in creation order
pub type SlotId = u32;

/// Characters that may not appear in a behavior name (they end up in file names)
pub const FORBIDDEN_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Kind of behavior a slot records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum BehaviorKind {
    /// Instantaneous behavior, recorded as a single timestamp
    Event,
    /// Behavior with a duration, recorded as a closed interval
    State,
}

impl BehaviorKind {
    /// Returns the display label of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "EVENT",
            Self::State => "STATE",
        }
    }
}

impl std::fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BehaviorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "EVENT" => Ok(Self::Event),
            "STATE" => Ok(Self::State),
            other => Err(Error::Validation(format!("Unknown behavior kind: {other}"))),
        }
    }
}

/// One recorded occurrence of a behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Recording {
    /// Point in time, in milliseconds
    Point(u64),
    /// Closed interval in milliseconds, always `start_ms <= end_ms`
    Interval { start_ms: u64, end_ms: u64 },
}

impl Recording {
    /// Creates an interval, swapping the endpoints if they arrive in reverse order
    pub fn interval(a: u64, b: u64) -> Self {
        Self::Interval {
            start_ms: a.min(b),
            end_ms: a.max(b),
        }
    }

    /// Returns the kind of behavior that produces this recording
    pub fn kind(&self) -> BehaviorKind {
        match self {
            Self::Point(_) => BehaviorKind::Event,
            Self::Interval { .. } => BehaviorKind::State,
        }
    }

    /// Returns the start time in milliseconds
    pub fn start_ms(&self) -> u64 {
        match *self {
            Self::Point(t) => t,
            Self::Interval { start_ms, .. } => start_ms,
        }
    }

    /// Returns the span used to draw this recording on a timeline.
    ///
    /// Points are widened to one millisecond so they stay visible.
    pub fn display_span(&self) -> (u64, u64) {
        match *self {
            Self::Point(t) => (t, t.saturating_add(1)),
            Self::Interval { start_ms, end_ms } => (start_ms, end_ms),
        }
    }

    /// Checks if the given timestamp falls inside the display span (inclusive)
    pub fn contains(&self, time_ms: u64) -> bool {
        let (start, end) = self.display_span();
        time_ms >= start && time_ms <= end
    }

    /// Returns the duration of this recording in milliseconds
    pub fn duration_ms(&self) -> u64 {
        match *self {
            Self::Point(_) => 0,
            Self::Interval { start_ms, end_ms } => end_ms.saturating_sub(start_ms),
        }
    }
}

/// A configured behavior together with its recorded epochs
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BehaviorSlot {
    /// Stable identifier, never reused within a session
    pub slot_id: SlotId,
    /// Behavior name, safe to use inside file names
    pub name: String,
    /// Event or state
    pub kind: BehaviorKind,
    /// Display color as `#rrggbb`
    pub color: String,
    /// Free text
    #[cfg_attr(feature = "serde", serde(default))]
    pub note: String,
    /// Recordings in the order they were made
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_ms: Vec<Recording>,
}

impl BehaviorSlot {
    /// Creates a new slot with no recordings, validating name and color
    pub fn new(
        slot_id: SlotId,
        name: &str,
        kind: BehaviorKind,
        color: &str,
        note: &str,
    ) -> Result<Self> {
        validate_name(name)?;
        validate_color(color)?;

        Ok(Self {
            slot_id,
            name: name.to_string(),
            kind,
            color: color.to_string(),
            note: note.to_string(),
            time_ms: Vec::new(),
        })
    }

    /// Appends a recording, rejecting one whose shape does not match the slot kind
    pub fn push(&mut self, recording: Recording) -> Result<usize> {
        if recording.kind() != self.kind {
            return Err(Error::Validation(format!(
                "Cannot add a {} recording to {} behavior '{}'",
                recording.kind(),
                self.kind,
                self.name
            )));
        }
        self.time_ms.push(recording);
        Ok(self.time_ms.len() - 1)
    }

    /// Number of recorded epochs
    pub fn len(&self) -> usize {
        self.time_ms.len()
    }

    /// Returns true if nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.time_ms.is_empty()
    }
}

/// Checks that a behavior name is non-empty and free of path-hostile characters
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("Behavior name cannot be empty".into()));
    }
    if name.contains(FORBIDDEN_NAME_CHARS) {
        return Err(Error::Validation(
            "Behavior name cannot contain special characters: \\ / : * ? \" < > |".into(),
        ));
    }
    Ok(())
}

/// Checks that a color is a `#rrggbb` hex string
pub fn validate_color(color: &str) -> Result<()> {
    parse_hex_color(color)
        .map(|_| ())
        .ok_or_else(|| Error::Validation(format!("Invalid color '{color}', expected #rrggbb")))
}

/// Parses a `#rrggbb` hex string into RGB components
pub fn parse_hex_color(color: &str) -> Option<[u8; 3]> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}
