use core::future::Future;

use embassy_time::Timer;
use embedded_hal::digital::{InputPin, OutputPin};

/// Pressed state of every switch, indexed `[row][col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressMatrix<const ROW: usize, const COL: usize> {
    cells: [[bool; COL]; ROW],
}

impl<const ROW: usize, const COL: usize> Default for PressMatrix<ROW, COL> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const ROW: usize, const COL: usize> PressMatrix<ROW, COL> {
    pub const fn new() -> Self {
        Self {
            cells: [[false; COL]; ROW],
        }
    }

    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, pressed: bool) {
        self.cells[row][col] = pressed;
    }

    /// Visit every cell in scan order: column by column, rows within a column.
    ///
    /// The active-key tracker relies on this being the same order the scanner
    /// drives the lines in.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, bool)> + '_ {
        (0..COL).flat_map(move |col| (0..ROW).map(move |row| (row, col, self.cells[row][col])))
    }
}

/// MatrixTrait is the trait for keyboard matrix.
///
/// A scan refreshes the whole press matrix in place and reports whether any
/// cell differs from the previous scan.
pub trait MatrixTrait<const ROW: usize, const COL: usize> {
    /// Scan all switches once, returns `true` if anything changed.
    fn scan(&mut self) -> impl Future<Output = bool>;

    /// Result of the latest scan
    fn press_matrix(&self) -> &PressMatrix<ROW, COL>;
}

/// Matrix is the physical pcb layout of the keyboard matrix.
///
/// Column lines are outputs, row lines are inputs with pull-downs: a pressed
/// switch connects the asserted column to its row.
pub struct Matrix<In: InputPin, Out: OutputPin, const ROW: usize, const COL: usize> {
    /// Input pins of the pcb matrix, one per row
    row_pins: [In; ROW],
    /// Output pins of the pcb matrix, one per column
    col_pins: [Out; COL],
    /// Key state matrix
    state: PressMatrix<ROW, COL>,
}

impl<In: InputPin, Out: OutputPin, const ROW: usize, const COL: usize> Matrix<In, Out, ROW, COL> {
    /// Create a matrix from input and output pins.
    pub fn new(row_pins: [In; ROW], col_pins: [Out; COL]) -> Self {
        Matrix {
            row_pins,
            col_pins,
            state: PressMatrix::new(),
        }
    }
}

impl<In: InputPin, Out: OutputPin, const ROW: usize, const COL: usize> MatrixTrait<ROW, COL>
    for Matrix<In, Out, ROW, COL>
{
    async fn scan(&mut self) -> bool {
        let mut changed = false;
        for (col, col_pin) in self.col_pins.iter_mut().enumerate() {
            // Pull up output pin, wait 1us ensuring the change comes into effect
            col_pin.set_high().ok();
            Timer::after_micros(1).await;
            for (row, row_pin) in self.row_pins.iter_mut().enumerate() {
                let pressed = row_pin.is_high().ok().unwrap_or_default();
                if self.state.is_pressed(row, col) != pressed {
                    self.state.set(row, col, pressed);
                    changed = true;
                }
            }
            // Pull it back to low
            col_pin.set_low().ok();
        }
        changed
    }

    fn press_matrix(&self) -> &PressMatrix<ROW, COL> {
        &self.state
    }
}
