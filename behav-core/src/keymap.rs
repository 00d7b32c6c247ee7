//! Fixed keyboard shortcut table

/// Ordered shortcut keys. Behavior positions come first, the last two keys are
/// reserved for the undo and delete-at-time actions.
pub const SHORTCUT_KEYS: [char; 20] = [
    'q', 'w', 'e', 'r', 't', 'a', 's', 'd', 'f', 'g', '1', '2', '3', '4', '5', '6', '7', '8',
    'z', 'x',
];

/// Discards the most recently opened interval
pub const UNDO_KEY: char = 'z';

/// Deletes every recording under the current time
pub const DELETE_KEY: char = 'x';

/// Maximum number of behaviors that can hold a shortcut at once
pub const MAX_SLOTS: usize = SHORTCUT_KEYS.len() - 2;

/// What a key press means before it is bound to a concrete slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Undo,
    DeleteAtTime,
    /// Shortcut position in `0..MAX_SLOTS`
    Slot(usize),
}

/// Resolves a key to its action, ignoring case
pub fn resolve(key: char) -> Option<KeyAction> {
    let key = key.to_ascii_lowercase();
    match key {
        UNDO_KEY => Some(KeyAction::Undo),
        DELETE_KEY => Some(KeyAction::DeleteAtTime),
        _ => SHORTCUT_KEYS[..MAX_SLOTS]
            .iter()
            .position(|&k| k == key)
            .map(KeyAction::Slot),
    }
}

/// Returns the key bound to a shortcut position
pub fn key_for_position(position: usize) -> Option<char> {
    SHORTCUT_KEYS[..MAX_SLOTS].get(position).copied()
}
