//! Input devices sampled by the polling loop besides the key matrix.
//!
//! embedded-hal 1.0 has no ADC abstraction, so analog channels are read
//! through [`AnalogInput`], implemented by the board for its ADC driver.

use core::future::Future;

use crate::hid::MouseData;

pub mod joystick;

/// One analog channel, returning raw conversion results.
pub trait AnalogInput {
    type Error;

    /// Read a single raw sample
    fn read(&mut self) -> impl Future<Output = Result<u16, Self::Error>>;
}

/// A device that produces one pointer report per polling tick.
pub trait PointerSampler {
    fn sample(&mut self) -> impl Future<Output = MouseData>;
}
