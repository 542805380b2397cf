use crate::keycode::KeyCode;
use crate::keycode::KeyCode::*;

/// Number of electrical row lines
pub const ROW: usize = 5;
/// Number of electrical column lines
pub const COL: usize = 7;

/// Physical half of the split keyboard, persisted as a single `i8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(i8)]
pub enum BoardSide {
    #[default]
    Left = 0,
    Right = 1,
}

impl BoardSide {
    /// Interpret a stored value, `None` if it names no known side
    pub fn from_config_value(value: i8) -> Option<Self> {
        match value {
            0 => Some(BoardSide::Left),
            1 => Some(BoardSide::Right),
            _ => None,
        }
    }

    pub fn config_value(self) -> i8 {
        self as i8
    }

    /// Keycode grid of this half
    pub fn layout(self) -> &'static KeyboardLayout<ROW, COL> {
        match self {
            BoardSide::Left => &LEFT_LAYOUT,
            BoardSide::Right => &RIGHT_LAYOUT,
        }
    }
}

/// Immutable mapping from a matrix cell to the keycode it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardLayout<const ROW: usize, const COL: usize> {
    keys: [[KeyCode; COL]; ROW],
}

impl<const ROW: usize, const COL: usize> KeyboardLayout<ROW, COL> {
    pub const fn new(keys: [[KeyCode; COL]; ROW]) -> Self {
        Self { keys }
    }

    /// Keycode at (row, col), `KeyCode::No` outside the grid
    pub fn get(&self, row: usize, col: usize) -> KeyCode {
        self.keys
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(KeyCode::No)
    }
}

#[rustfmt::skip]
pub static LEFT_LAYOUT: KeyboardLayout<ROW, COL> = KeyboardLayout::new([
    [Escape, Kc1, Kc2, Kc3, Kc4, Kc5, Backspace],
    [Tab, Q, W, E, R, T, Enter],
    [CapsLock, A, S, D, F, G, PageUp],
    [LShift, Z, X, C, V, B, PageDown],
    [LCtrl, No, No, Up, Down, LGui, No],
]);

#[rustfmt::skip]
pub static RIGHT_LAYOUT: KeyboardLayout<ROW, COL> = KeyboardLayout::new([
    [Minus, Kc0, Kc9, Kc8, Kc7, Kc6, Space],
    [Equal, P, O, I, U, Y, Backspace],
    [Quote, Semicolon, L, K, J, H, Delete],
    [Backslash, Slash, Dot, Comma, M, N, PrintScreen],
    [RAlt, RightBracket, LeftBracket, Right, Left, RCtrl, No],
]);
