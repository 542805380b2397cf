use heapless::Vec;

use crate::KEYCODE_SLOTS;
use crate::hid::KeyboardData;
use crate::hid_state::HidModifiers;
use crate::keycode::KeyCode;
use crate::layout::KeyboardLayout;
use crate::matrix::PressMatrix;

/// Ordered set of held ordinary keys, oldest first, at most six entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveKeySet {
    keys: Vec<KeyCode, KEYCODE_SLOTS>,
}

impl ActiveKeySet {
    pub const fn new() -> Self {
        Self { keys: Vec::new() }
    }

    pub fn contains(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    /// Append `key` if it's absent and a slot is free.
    ///
    /// Returns `false` when nothing was added.
    pub fn insert(&mut self, key: KeyCode) -> bool {
        if self.contains(key) {
            return false;
        }
        self.keys.push(key).is_ok()
    }

    /// Remove `key` keeping the order of the others, no-op if absent.
    pub fn remove(&mut self, key: KeyCode) -> bool {
        match self.keys.iter().position(|k| *k == key) {
            Some(index) => {
                self.keys.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_full(&self) -> bool {
        self.keys.is_full()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn as_slice(&self) -> &[KeyCode] {
        &self.keys
    }

    /// Keycode slots of a report, zero padded.
    pub fn to_slots(&self) -> [KeyCode; KEYCODE_SLOTS] {
        let mut slots = [KeyCode::No; KEYCODE_SLOTS];
        for (slot, key) in slots.iter_mut().zip(self.keys.iter()) {
            *slot = *key;
        }
        slots
    }
}

/// Turns press matrices into keyboard reports.
///
/// The modifier byte is rebuilt from the matrix on every call. The held key
/// set survives between calls because its order encodes which keys were
/// pressed first.
#[derive(Debug, Default)]
pub struct ActiveKeyTracker {
    active: ActiveKeySet,
}

impl ActiveKeyTracker {
    pub const fn new() -> Self {
        Self {
            active: ActiveKeySet::new(),
        }
    }

    pub fn active_keys(&self) -> &ActiveKeySet {
        &self.active
    }

    /// Build the report for the current matrix.
    pub fn update<const ROW: usize, const COL: usize>(
        &mut self,
        matrix: &PressMatrix<ROW, COL>,
        layout: &KeyboardLayout<ROW, COL>,
    ) -> KeyboardData {
        let mut modifier = HidModifiers::new();
        for (row, col, pressed) in matrix.cells() {
            if pressed {
                modifier |= layout.get(row, col).to_hid_modifiers();
            }
        }

        // Releases first, so a key pressed in the same scan can take a freed slot
        let still_held: Vec<KeyCode, KEYCODE_SLOTS> = self
            .active
            .as_slice()
            .iter()
            .copied()
            .filter(|key| Self::is_held(matrix, layout, *key))
            .collect();
        self.active.keys = still_held;

        for (row, col, pressed) in matrix.cells() {
            let key = layout.get(row, col);
            if !pressed || !key.is_ordinary() || self.active.contains(key) {
                continue;
            }
            debug!("Key [{},{}] is pressed: {:?}", row, col, key);
            if !self.active.insert(key) {
                debug!("Rollover limit reached, {:?} isn't reported", key);
            }
        }

        KeyboardData {
            modifier,
            keycode: self.active.to_slots(),
        }
    }

    fn is_held<const ROW: usize, const COL: usize>(
        matrix: &PressMatrix<ROW, COL>,
        layout: &KeyboardLayout<ROW, COL>,
        key: KeyCode,
    ) -> bool {
        matrix
            .cells()
            .any(|(row, col, pressed)| pressed && layout.get(row, col) == key)
    }
}
