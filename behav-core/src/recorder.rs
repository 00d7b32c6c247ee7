//! Keyboard-driven timeline recorder
//!
//! The recorder owns every behavior slot of an annotation session. Key presses
//! are turned into point recordings (events) or open/close interval pairs
//! (states). Each state slot has its own pending start, and the order in which
//! intervals were opened is kept on an undo stack so the most recent one can
//! be discarded.

use std::collections::HashMap;

use tracing::debug;

use crate::keymap::{self, KeyAction, MAX_SLOTS};
use crate::slot::{validate_color, validate_name};
use crate::{BehaviorKind, BehaviorSlot, Error, Recording, Result, SlotId};

/// A recording that was appended to a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedEvent {
    pub slot_id: SlotId,
    /// Position of the recording in the slot's `time_ms`
    pub index: usize,
    pub recording: Recording,
}

/// A recording that was deleted from a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedRecording {
    pub slot_id: SlotId,
    /// Position the recording held before removal
    pub index: usize,
    pub recording: Recording,
}

/// Result of handling one key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// A point or a closed interval was recorded
    Recorded(RecordedEvent),
    /// A state interval was opened and is now pending
    Started { slot_id: SlotId, start_ms: u64 },
    /// A pending interval was discarded
    Undone { slot_id: SlotId, start_ms: u64 },
    /// Undo was pressed with no pending interval
    NothingToUndo,
    /// Recordings under the current time were deleted
    Deleted(Vec<RemovedRecording>),
}

impl KeyOutcome {
    /// Returns the recorded epoch, if this press produced one
    pub fn recorded(&self) -> Option<&RecordedEvent> {
        match self {
            Self::Recorded(event) => Some(event),
            _ => None,
        }
    }
}

/// Whether a slot is currently being modified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Idle,
    Editing(SlotId),
}

/// Session state for recording behaviors on a timeline
#[derive(Debug, Default)]
pub struct TimelineRecorder {
    /// Live slots in ascending `slot_id` order
    slots: Vec<BehaviorSlot>,
    next_id: SlotId,
    pending_start: HashMap<SlotId, u64>,
    undo_stack: Vec<SlotId>,
    editing: Option<SlotId>,
}

impl TimelineRecorder {
    /// Creates an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a recorder from previously saved slots.
    ///
    /// Slot ids are kept as they are and new slots continue after the largest one.
    pub fn from_slots(mut slots: Vec<BehaviorSlot>) -> Result<Self> {
        if slots.len() > MAX_SLOTS {
            return Err(Error::Validation(format!(
                "Too many behaviors ({}), at most {MAX_SLOTS} are supported",
                slots.len()
            )));
        }

        slots.sort_by_key(|s| s.slot_id);
        for pair in slots.windows(2) {
            if pair[0].slot_id == pair[1].slot_id {
                return Err(Error::Validation(format!(
                    "Duplicate behavior slot id {}",
                    pair[0].slot_id
                )));
            }
        }

        for slot in &slots {
            validate_name(&slot.name)?;
            validate_color(&slot.color)?;
            if let Some(bad) = slot.time_ms.iter().find(|r| r.kind() != slot.kind) {
                return Err(Error::Validation(format!(
                    "Behavior '{}' is {} but holds a {} recording",
                    slot.name,
                    slot.kind,
                    bad.kind()
                )));
            }
            let inverted = slot.time_ms.iter().find(|r| {
                matches!(r, Recording::Interval { start_ms, end_ms } if start_ms > end_ms)
            });
            if let Some(Recording::Interval { start_ms, end_ms }) = inverted {
                return Err(Error::Validation(format!(
                    "Behavior '{}' holds an interval ending before it starts ({start_ms} > {end_ms})",
                    slot.name
                )));
            }
        }

        let next_id = match slots.last() {
            Some(last) => next_slot_id(last.slot_id)?,
            None => 0,
        };
        Ok(Self {
            slots,
            next_id,
            ..Self::default()
        })
    }

    /// Consumes the recorder and returns its slots
    pub fn into_slots(self) -> Vec<BehaviorSlot> {
        self.slots
    }

    /// Adds a new behavior and returns its id
    pub fn add_slot(
        &mut self,
        name: &str,
        kind: BehaviorKind,
        color: &str,
        note: &str,
    ) -> Result<SlotId> {
        if self.slots.len() >= MAX_SLOTS {
            return Err(Error::Validation(format!(
                "Maximum number of behaviors reached ({MAX_SLOTS}). Cannot add more."
            )));
        }

        let next_id = next_slot_id(self.next_id)?;
        let slot = BehaviorSlot::new(self.next_id, name, kind, color, note)?;
        let slot_id = slot.slot_id;
        self.slots.push(slot);
        self.next_id = next_id;

        debug!(slot_id, name, %kind, "added behavior slot");
        Ok(slot_id)
    }

    /// Removes a behavior and all of its recordings.
    ///
    /// A slot with a pending interval cannot be removed until the interval is
    /// closed or undone. Removed ids are never handed out again.
    pub fn remove_slot(&mut self, slot_id: SlotId) -> Result<BehaviorSlot> {
        let pos = self.position(slot_id)?;
        if self.pending_start.contains_key(&slot_id) {
            return Err(Error::StateConflict(format!(
                "Behavior '{}' has an open interval, undo or close it first",
                self.slots[pos].name
            )));
        }

        if self.editing == Some(slot_id) {
            self.editing = None;
        }

        let slot = self.slots.remove(pos);
        debug!(slot_id, name = %slot.name, "removed behavior slot");
        Ok(slot)
    }

    /// Returns a slot by id
    pub fn slot(&self, slot_id: SlotId) -> Option<&BehaviorSlot> {
        self.slots.iter().find(|s| s.slot_id == slot_id)
    }

    /// All live slots in ascending id order
    pub fn slots(&self) -> &[BehaviorSlot] {
        &self.slots
    }

    /// Number of live slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no slot exists
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn name(&self, slot_id: SlotId) -> Result<&str> {
        Ok(&self.get(slot_id)?.name)
    }

    pub fn kind(&self, slot_id: SlotId) -> Result<BehaviorKind> {
        Ok(self.get(slot_id)?.kind)
    }

    pub fn color(&self, slot_id: SlotId) -> Result<&str> {
        Ok(&self.get(slot_id)?.color)
    }

    pub fn note(&self, slot_id: SlotId) -> Result<&str> {
        Ok(&self.get(slot_id)?.note)
    }

    /// Returns the shortcut key currently bound to a slot
    pub fn shortcut_for(&self, slot_id: SlotId) -> Option<char> {
        let pos = self.slots.iter().position(|s| s.slot_id == slot_id)?;
        keymap::key_for_position(pos)
    }

    /// Resolves a behavior shortcut key to the slot it is bound to
    pub fn slot_for_key(&self, key: char) -> Result<SlotId> {
        match keymap::resolve(key) {
            Some(KeyAction::Slot(pos)) => self
                .slots
                .get(pos)
                .map(|s| s.slot_id)
                .ok_or(Error::UnmappedKey(key)),
            _ => Err(Error::UnmappedKey(key)),
        }
    }

    /// Handles a key press at the given position of the timeline
    pub fn handle_key(&mut self, key: char, current_ms: u64) -> Result<KeyOutcome> {
        match keymap::resolve(key) {
            Some(KeyAction::Undo) => Ok(match self.undo(None) {
                Some((slot_id, start_ms)) => KeyOutcome::Undone { slot_id, start_ms },
                None => KeyOutcome::NothingToUndo,
            }),
            Some(KeyAction::DeleteAtTime) => {
                Ok(KeyOutcome::Deleted(self.delete_recording_at(current_ms)))
            }
            Some(KeyAction::Slot(_)) => {
                let slot_id = self.slot_for_key(key)?;
                self.press(slot_id, current_ms)
            }
            None => Err(Error::UnmappedKey(key)),
        }
    }

    /// Records the press of a behavior's shortcut.
    ///
    /// Events record a point immediately. States alternate between opening a
    /// pending interval and closing it into a normalized `[start, end]`.
    pub fn press(&mut self, slot_id: SlotId, current_ms: u64) -> Result<KeyOutcome> {
        let kind = self.get(slot_id)?.kind;

        match kind {
            BehaviorKind::Event => {
                let recording = Recording::Point(current_ms);
                let index = self.slot_mut(slot_id)?.push(recording)?;
                Ok(KeyOutcome::Recorded(RecordedEvent {
                    slot_id,
                    index,
                    recording,
                }))
            }
            BehaviorKind::State => match self.pending_start.remove(&slot_id) {
                None => {
                    self.pending_start.insert(slot_id, current_ms);
                    self.undo_stack.push(slot_id);
                    Ok(KeyOutcome::Started {
                        slot_id,
                        start_ms: current_ms,
                    })
                }
                Some(start_ms) => {
                    self.undo_stack.retain(|&id| id != slot_id);
                    let recording = Recording::interval(start_ms, current_ms);
                    let index = self.slot_mut(slot_id)?.push(recording)?;
                    Ok(KeyOutcome::Recorded(RecordedEvent {
                        slot_id,
                        index,
                        recording,
                    }))
                }
            },
        }
    }

    /// Discards a pending interval.
    ///
    /// Without a target the most recently opened interval is discarded. With a
    /// target, that slot is taken off the undo stack wherever it sits. Returns
    /// the slot and the discarded start, or `None` if nothing was pending.
    pub fn undo(&mut self, slot_id: Option<SlotId>) -> Option<(SlotId, u64)> {
        let slot_id = match slot_id {
            None => self.undo_stack.pop()?,
            Some(id) => {
                let pos = self.undo_stack.iter().rposition(|&s| s == id)?;
                self.undo_stack.remove(pos)
            }
        };

        let start_ms = self.pending_start.remove(&slot_id)?;
        self.editing = None;
        Some((slot_id, start_ms))
    }

    /// Deletes every recording whose display span contains `time_ms`
    pub fn delete_recording_at(&mut self, time_ms: u64) -> Vec<RemovedRecording> {
        let mut removed = Vec::new();

        for slot in &mut self.slots {
            let slot_id = slot.slot_id;
            let mut index = 0;
            slot.time_ms.retain(|recording| {
                let keep = !recording.contains(time_ms);
                if !keep {
                    removed.push(RemovedRecording {
                        slot_id,
                        index,
                        recording: *recording,
                    });
                }
                index += 1;
                keep
            });
        }

        removed
    }

    /// Appends an already formed recording, e.g. when loading a saved session
    pub fn push_recording(&mut self, slot_id: SlotId, recording: Recording) -> Result<usize> {
        self.slot_mut(slot_id)?.push(recording)
    }

    /// Removes one recording by index
    pub fn remove_recording(&mut self, slot_id: SlotId, index: usize) -> Result<Recording> {
        let slot = self.slot_mut(slot_id)?;
        if index >= slot.time_ms.len() {
            return Err(Error::RecordingNotFound { slot_id, index });
        }
        Ok(slot.time_ms.remove(index))
    }

    /// Start of the pending interval of a state slot
    pub fn pending_start(&self, slot_id: SlotId) -> Option<u64> {
        self.pending_start.get(&slot_id).copied()
    }

    /// Slots with a pending interval, oldest first
    pub fn pending_slots(&self) -> &[SlotId] {
        &self.undo_stack
    }

    /// Starts modifying a slot, or stops if the same slot is pressed again.
    ///
    /// Pressing a different slot while one is being modified is a conflict.
    pub fn toggle_edit(&mut self, slot_id: SlotId) -> Result<EditState> {
        self.get(slot_id)?;

        match self.editing {
            Some(current) if current != slot_id => Err(Error::StateConflict(format!(
                "Behavior slot {current} is being modified, apply or cancel it first"
            ))),
            Some(_) => {
                self.editing = None;
                Ok(EditState::Idle)
            }
            None => {
                self.editing = Some(slot_id);
                Ok(EditState::Editing(slot_id))
            }
        }
    }

    /// Applies new metadata to the slot being modified and ends the edit
    pub fn apply_edit(
        &mut self,
        name: &str,
        kind: BehaviorKind,
        color: &str,
        note: &str,
    ) -> Result<SlotId> {
        let slot_id = self
            .editing
            .ok_or_else(|| Error::StateConflict("No behavior is being modified".into()))?;

        validate_name(name)?;
        validate_color(color)?;

        let pending = self.pending_start.contains_key(&slot_id);
        let slot = self.slot_mut(slot_id)?;
        if kind != slot.kind && (pending || !slot.is_empty()) {
            return Err(Error::Validation(format!(
                "Cannot change '{}' from {} to {} while it has recordings",
                slot.name, slot.kind, kind
            )));
        }

        slot.name = name.to_string();
        slot.kind = kind;
        slot.color = color.to_string();
        slot.note = note.to_string();

        self.editing = None;
        Ok(slot_id)
    }

    /// Ends the current edit without changes
    pub fn cancel_edit(&mut self) -> Option<SlotId> {
        self.editing.take()
    }

    /// Slot currently being modified
    pub fn editing(&self) -> Option<SlotId> {
        self.editing
    }

    /// Clears the whole session
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn position(&self, slot_id: SlotId) -> Result<usize> {
        self.slots
            .iter()
            .position(|s| s.slot_id == slot_id)
            .ok_or(Error::SlotNotFound(slot_id))
    }

    fn get(&self, slot_id: SlotId) -> Result<&BehaviorSlot> {
        self.slot(slot_id).ok_or(Error::SlotNotFound(slot_id))
    }

    fn slot_mut(&mut self, slot_id: SlotId) -> Result<&mut BehaviorSlot> {
        self.slots
            .iter_mut()
            .find(|s| s.slot_id == slot_id)
            .ok_or(Error::SlotNotFound(slot_id))
    }
}

/// Id following `slot_id`; ids are never wrapped around
fn next_slot_id(slot_id: SlotId) -> Result<SlotId> {
    slot_id
        .checked_add(1)
        .ok_or_else(|| Error::Validation(format!("Behavior slot ids exhausted at {slot_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder_with(kinds: &[BehaviorKind]) -> TimelineRecorder {
        let mut recorder = TimelineRecorder::new();
        for (i, kind) in kinds.iter().enumerate() {
            recorder
                .add_slot(&format!("behavior{i}"), *kind, "#ff0000", "")
                .unwrap();
        }
        recorder
    }

    #[test]
    fn test_add_slot_roundtrip() {
        let mut recorder = TimelineRecorder::new();
        let id = recorder
            .add_slot("rearing", BehaviorKind::State, "#12ab9f", "hind legs only")
            .unwrap();

        assert_eq!(id, 0);
        assert_eq!(recorder.name(id).unwrap(), "rearing");
        assert_eq!(recorder.kind(id).unwrap(), BehaviorKind::State);
        assert_eq!(recorder.color(id).unwrap(), "#12ab9f");
        assert_eq!(recorder.note(id).unwrap(), "hind legs only");
        assert!(recorder.slot(id).unwrap().is_empty());
    }

    #[test]
    fn test_add_slot_rejects_bad_names() {
        let mut recorder = TimelineRecorder::new();
        for name in ["a/b", "a:b", ""] {
            let err = recorder
                .add_slot(name, BehaviorKind::Event, "#ffffff", "")
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert!(recorder
            .add_slot("valid_name", BehaviorKind::Event, "#ffffff", "")
            .is_ok());
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_add_slot_capacity() {
        let mut recorder = recorder_with(&[BehaviorKind::Event; MAX_SLOTS]);
        let err = recorder
            .add_slot("one_more", BehaviorKind::Event, "#ffffff", "")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_event_press_appends_point() {
        let mut recorder = recorder_with(&[BehaviorKind::Event]);

        let outcome = recorder.handle_key('q', 1200).unwrap();
        let event = outcome.recorded().unwrap();
        assert_eq!(event.recording, Recording::Point(1200));
        assert_eq!(event.index, 0);

        recorder.handle_key('Q', 1300).unwrap();
        assert_eq!(recorder.slot(0).unwrap().len(), 2);
        assert!(recorder.pending_slots().is_empty());
        assert_eq!(recorder.pending_start(0), None);
    }

    #[test]
    fn test_state_press_opens_then_closes() {
        let mut recorder = recorder_with(&[BehaviorKind::State]);

        let outcome = recorder.handle_key('q', 1000).unwrap();
        assert_eq!(
            outcome,
            KeyOutcome::Started {
                slot_id: 0,
                start_ms: 1000
            }
        );
        assert_eq!(recorder.pending_start(0), Some(1000));
        assert!(recorder.slot(0).unwrap().is_empty());

        let outcome = recorder.handle_key('q', 2500).unwrap();
        assert_eq!(
            outcome.recorded().unwrap().recording,
            Recording::Interval {
                start_ms: 1000,
                end_ms: 2500
            }
        );
        assert_eq!(recorder.pending_start(0), None);
        assert!(recorder.pending_slots().is_empty());
    }

    #[test]
    fn test_state_reversed_presses_normalize() {
        let mut recorder = recorder_with(&[BehaviorKind::State]);
        recorder.handle_key('q', 5000).unwrap();
        recorder.handle_key('q', 2000).unwrap();

        assert_eq!(
            recorder.slot(0).unwrap().time_ms,
            vec![Recording::Interval {
                start_ms: 2000,
                end_ms: 5000
            }]
        );
    }

    #[test]
    fn test_independent_pending_slots() {
        let mut recorder = recorder_with(&[BehaviorKind::State, BehaviorKind::State]);
        recorder.handle_key('q', 100).unwrap();
        recorder.handle_key('w', 200).unwrap();
        assert_eq!(recorder.pending_slots(), &[0, 1]);

        recorder.handle_key('q', 300).unwrap();
        assert_eq!(recorder.pending_slots(), &[1]);
        assert_eq!(recorder.pending_start(1), Some(200));
    }

    #[test]
    fn test_undo_pops_most_recent() {
        let mut recorder = recorder_with(&[BehaviorKind::State, BehaviorKind::State]);
        recorder.handle_key('q', 100).unwrap();
        recorder.handle_key('w', 200).unwrap();

        let outcome = recorder.handle_key('z', 250).unwrap();
        assert_eq!(
            outcome,
            KeyOutcome::Undone {
                slot_id: 1,
                start_ms: 200
            }
        );
        assert_eq!(recorder.pending_start(1), None);
        assert_eq!(recorder.pending_start(0), Some(100));

        // slot 1 is idle again, so the next press opens a new interval
        let outcome = recorder.handle_key('w', 400).unwrap();
        assert!(matches!(outcome, KeyOutcome::Started { slot_id: 1, .. }));
        assert!(recorder.slot(1).unwrap().is_empty());
    }

    #[test]
    fn test_undo_with_nothing_pending_is_noop() {
        let mut recorder = recorder_with(&[BehaviorKind::Event]);
        assert_eq!(recorder.handle_key('z', 0).unwrap(), KeyOutcome::NothingToUndo);
        assert_eq!(recorder.undo(None), None);
    }

    #[test]
    fn test_undo_explicit_slot_anywhere_in_stack() {
        let mut recorder = recorder_with(&[BehaviorKind::State; 3]);
        recorder.handle_key('q', 10).unwrap();
        recorder.handle_key('w', 20).unwrap();
        recorder.handle_key('e', 30).unwrap();

        assert_eq!(recorder.undo(Some(0)), Some((0, 10)));
        assert_eq!(recorder.pending_slots(), &[1, 2]);
        assert_eq!(recorder.undo(Some(0)), None);
    }

    #[test]
    fn test_unmapped_key() {
        let mut recorder = recorder_with(&[BehaviorKind::Event]);
        assert!(matches!(
            recorder.handle_key('w', 0),
            Err(Error::UnmappedKey('w'))
        ));
        assert!(matches!(
            recorder.handle_key('p', 0),
            Err(Error::UnmappedKey('p'))
        ));
    }

    #[test]
    fn test_delete_recording_at() {
        let mut recorder = recorder_with(&[BehaviorKind::Event, BehaviorKind::State]);
        recorder.handle_key('q', 1000).unwrap();
        recorder.handle_key('q', 4000).unwrap();
        recorder.handle_key('w', 500).unwrap();
        recorder.handle_key('w', 1500).unwrap();

        let outcome = recorder.handle_key('x', 1000).unwrap();
        let KeyOutcome::Deleted(removed) = outcome else {
            panic!("expected a deletion");
        };
        assert_eq!(removed.len(), 2);
        assert_eq!(recorder.slot(0).unwrap().time_ms, vec![Recording::Point(4000)]);
        assert!(recorder.slot(1).unwrap().is_empty());

        assert!(recorder.delete_recording_at(9999).is_empty());
    }

    #[test]
    fn test_remove_slot_keeps_ids_stable() {
        let mut recorder = recorder_with(&[BehaviorKind::Event; 3]);
        recorder.remove_slot(1).unwrap();

        assert_eq!(recorder.shortcut_for(0), Some('q'));
        assert_eq!(recorder.shortcut_for(2), Some('w'));
        assert_eq!(recorder.shortcut_for(1), None);
        assert_eq!(recorder.slot_for_key('w').unwrap(), 2);
        assert!(matches!(recorder.slot_for_key('e'), Err(Error::UnmappedKey('e'))));

        let id = recorder
            .add_slot("late", BehaviorKind::Event, "#000000", "")
            .unwrap();
        assert_eq!(id, 3);
        assert!(matches!(recorder.remove_slot(1), Err(Error::SlotNotFound(1))));
    }

    #[test]
    fn test_remove_slot_with_pending_interval_is_rejected() {
        let mut recorder = recorder_with(&[BehaviorKind::State]);
        recorder.handle_key('q', 100).unwrap();

        assert!(matches!(recorder.remove_slot(0), Err(Error::StateConflict(_))));

        recorder.undo(None);
        assert!(recorder.remove_slot(0).is_ok());
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_edit_conflict() {
        let mut recorder = recorder_with(&[BehaviorKind::Event, BehaviorKind::Event]);
        assert_eq!(recorder.toggle_edit(0).unwrap(), EditState::Editing(0));
        assert!(matches!(recorder.toggle_edit(1), Err(Error::StateConflict(_))));
        assert_eq!(recorder.toggle_edit(0).unwrap(), EditState::Idle);
        assert_eq!(recorder.toggle_edit(1).unwrap(), EditState::Editing(1));
    }

    #[test]
    fn test_apply_edit() {
        let mut recorder = recorder_with(&[BehaviorKind::Event]);
        recorder.toggle_edit(0).unwrap();
        recorder
            .apply_edit("sniff", BehaviorKind::State, "#00ff00", "nose contact")
            .unwrap();

        let slot = recorder.slot(0).unwrap();
        assert_eq!(slot.name, "sniff");
        assert_eq!(slot.kind, BehaviorKind::State);
        assert_eq!(recorder.editing(), None);

        assert!(matches!(
            recorder.apply_edit("x", BehaviorKind::State, "#00ff00", ""),
            Err(Error::StateConflict(_))
        ));
    }

    #[test]
    fn test_apply_edit_rejects_kind_change_with_recordings() {
        let mut recorder = recorder_with(&[BehaviorKind::Event]);
        recorder.handle_key('q', 10).unwrap();
        recorder.toggle_edit(0).unwrap();

        let err = recorder
            .apply_edit("behavior0", BehaviorKind::State, "#ff0000", "")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(recorder.editing(), Some(0));
    }

    #[test]
    fn test_undo_ends_edit() {
        let mut recorder = recorder_with(&[BehaviorKind::State, BehaviorKind::Event]);
        recorder.handle_key('q', 10).unwrap();
        recorder.toggle_edit(1).unwrap();
        recorder.handle_key('z', 20).unwrap();
        assert_eq!(recorder.editing(), None);
    }

    #[test]
    fn test_push_and_remove_recording() {
        let mut recorder = recorder_with(&[BehaviorKind::State]);
        assert!(recorder.push_recording(0, Recording::Point(5)).is_err());
        recorder.push_recording(0, Recording::interval(5, 9)).unwrap();

        assert!(matches!(
            recorder.remove_recording(0, 3),
            Err(Error::RecordingNotFound { slot_id: 0, index: 3 })
        ));
        assert_eq!(
            recorder.remove_recording(0, 0).unwrap(),
            Recording::interval(5, 9)
        );
    }

    #[test]
    fn test_from_slots_continues_ids() {
        let mut a = BehaviorSlot::new(0, "a", BehaviorKind::Event, "#111111", "").unwrap();
        a.push(Recording::Point(1)).unwrap();
        let b = BehaviorSlot::new(4, "b", BehaviorKind::State, "#222222", "").unwrap();

        let mut recorder = TimelineRecorder::from_slots(vec![b, a]).unwrap();
        assert_eq!(recorder.slots()[0].slot_id, 0);
        assert_eq!(recorder.shortcut_for(4), Some('w'));
        assert_eq!(
            recorder
                .add_slot("c", BehaviorKind::Event, "#333333", "")
                .unwrap(),
            5
        );
    }

    #[test]
    fn test_from_slots_rejects_mismatched_recordings() {
        let mut slot = BehaviorSlot::new(0, "a", BehaviorKind::Event, "#111111", "").unwrap();
        slot.time_ms.push(Recording::interval(1, 2));
        assert!(TimelineRecorder::from_slots(vec![slot]).is_err());
    }

    #[test]
    fn test_from_slots_rejects_inverted_interval() {
        let mut slot = BehaviorSlot::new(0, "groom", BehaviorKind::State, "#111111", "").unwrap();
        slot.time_ms.push(Recording::Interval {
            start_ms: 20,
            end_ms: 10,
        });
        assert!(matches!(
            TimelineRecorder::from_slots(vec![slot]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_from_slots_rejects_last_slot_id() {
        let slot = BehaviorSlot::new(SlotId::MAX, "a", BehaviorKind::Event, "#111111", "").unwrap();
        assert!(matches!(
            TimelineRecorder::from_slots(vec![slot]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_add_slot_never_wraps_ids() {
        let slot =
            BehaviorSlot::new(SlotId::MAX - 1, "a", BehaviorKind::Event, "#111111", "").unwrap();
        let mut recorder = TimelineRecorder::from_slots(vec![slot]).unwrap();

        assert!(matches!(
            recorder.add_slot("b", BehaviorKind::Event, "#222222", ""),
            Err(Error::Validation(_))
        ));
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_reset() {
        let mut recorder = recorder_with(&[BehaviorKind::State]);
        recorder.handle_key('q', 10).unwrap();
        recorder.reset();

        assert!(recorder.is_empty());
        assert!(recorder.pending_slots().is_empty());
        assert_eq!(
            recorder
                .add_slot("fresh", BehaviorKind::Event, "#ffffff", "")
                .unwrap(),
            0
        );
    }
}
