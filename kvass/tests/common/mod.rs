#![allow(dead_code)]

use core::cell::RefCell;
use std::rc::Rc;

use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Timer};
use embedded_storage_async::nor_flash::{ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};
use kvass::hid::{HidError, KeyboardData, MouseData, TransportDriver};
use kvass::input_device::PointerSampler;
use kvass::layout::{COL, ROW};
use kvass::matrix::{MatrixTrait, PressMatrix};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Everything handed to a [`MockTransport`]
#[derive(Debug, Default)]
pub struct SentReports {
    pub keyboard: Vec<KeyboardData>,
    pub mouse: Vec<MouseData>,
    /// Send attempts, failed ones included
    pub attempts: usize,
    /// Number of upcoming sends that fail
    pub failures: usize,
}

/// Transport recording reports instead of transmitting them.
pub struct MockTransport<'a> {
    pub ready: bool,
    pub sent: &'a RefCell<SentReports>,
}

impl<'a> MockTransport<'a> {
    pub fn new(sent: &'a RefCell<SentReports>) -> Self {
        Self { ready: true, sent }
    }

    fn attempt(&self) -> Result<(), HidError> {
        let mut sent = self.sent.borrow_mut();
        sent.attempts += 1;
        if sent.failures > 0 {
            sent.failures -= 1;
            return Err(HidError::UsbDisabled);
        }
        Ok(())
    }
}

impl TransportDriver for MockTransport<'_> {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn send_keyboard_report(&mut self, report: &KeyboardData) -> Result<(), HidError> {
        self.attempt()?;
        self.sent.borrow_mut().keyboard.push(*report);
        Ok(())
    }

    async fn send_pointer_report(&mut self, report: &MouseData) -> Result<(), HidError> {
        self.attempt()?;
        self.sent.borrow_mut().mouse.push(*report);
        Ok(())
    }
}

/// Matrix replaying the press matrix set by the test on its next scan
pub struct ScriptedMatrix<'a> {
    pub next: &'a RefCell<PressMatrix<ROW, COL>>,
    state: PressMatrix<ROW, COL>,
}

impl<'a> ScriptedMatrix<'a> {
    pub fn new(next: &'a RefCell<PressMatrix<ROW, COL>>) -> Self {
        Self {
            next,
            state: PressMatrix::new(),
        }
    }
}

impl MatrixTrait<ROW, COL> for ScriptedMatrix<'_> {
    async fn scan(&mut self) -> bool {
        let next = *self.next.borrow();
        let changed = next != self.state;
        self.state = next;
        changed
    }

    fn press_matrix(&self) -> &PressMatrix<ROW, COL> {
        &self.state
    }
}

/// Joystick at rest
pub struct RestingPointer;

impl PointerSampler for RestingPointer {
    async fn sample(&mut self) -> MouseData {
        MouseData::default()
    }
}

/// Run `fut` for at most `duration`, returns whether it completed
pub async fn run_for<F: core::future::Future>(fut: F, duration: Duration) -> bool {
    match select(fut, Timer::after(duration)).await {
        Either::First(_) => true,
        Either::Second(_) => false,
    }
}

#[derive(Debug)]
pub struct RamFlashError;

impl NorFlashError for RamFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::OutOfBounds
    }
}

/// NOR flash in RAM. Clones share the same memory, so a test can reopen a
/// store over the data written by a previous one.
#[derive(Clone)]
pub struct RamFlash {
    memory: Rc<RefCell<Vec<u8>>>,
}

impl RamFlash {
    pub const SECTOR_SIZE: usize = 1024;

    pub fn new(sectors: usize) -> Self {
        Self {
            memory: Rc::new(RefCell::new(vec![0xFF; sectors * Self::SECTOR_SIZE])),
        }
    }

    /// Overwrite a region with zeros, as a torn write would leave it
    pub fn scribble(&self, from: usize, to: usize) {
        self.memory.borrow_mut()[from..to].fill(0);
    }

    pub fn is_erased(&self, from: usize, to: usize) -> bool {
        self.memory.borrow()[from..to].iter().all(|b| *b == 0xFF)
    }

    fn check(&self, offset: u32, len: usize) -> Result<(), RamFlashError> {
        if offset as usize + len > self.memory.borrow().len() {
            return Err(RamFlashError);
        }
        Ok(())
    }
}

impl ErrorType for RamFlash {
    type Error = RamFlashError;
}

impl ReadNorFlash for RamFlash {
    const READ_SIZE: usize = 1;

    async fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.check(offset, bytes.len())?;
        let start = offset as usize;
        bytes.copy_from_slice(&self.memory.borrow()[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.memory.borrow().len()
    }
}

impl NorFlash for RamFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = Self::SECTOR_SIZE;

    async fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        self.check(from, (to - from) as usize)?;
        self.memory.borrow_mut()[from as usize..to as usize].fill(0xFF);
        Ok(())
    }

    async fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.check(offset, bytes.len())?;
        let start = offset as usize;
        // NOR flash can only clear bits
        for (cell, byte) in self.memory.borrow_mut()[start..start + bytes.len()].iter_mut().zip(bytes) {
            *cell &= *byte;
        }
        Ok(())
    }
}
