use core::future::Future;

use embedded_hal::digital::InputPin;

use super::{AnalogInput, PointerSampler};
use crate::config::{AxisConfig, JoystickConfig};
use crate::hid::MouseData;

/// The push button of the joystick.
pub trait JoystickButton {
    fn is_pressed(&mut self) -> impl Future<Output = bool>;
}

/// Button wired to an analog channel, pressed above a raw threshold.
pub struct AnalogButton<A: AnalogInput> {
    input: A,
    threshold: u16,
}

impl<A: AnalogInput> AnalogButton<A> {
    pub fn new(input: A, threshold: u16) -> Self {
        Self { input, threshold }
    }
}

impl<A: AnalogInput> JoystickButton for AnalogButton<A> {
    async fn is_pressed(&mut self) -> bool {
        match self.input.read().await {
            Ok(raw) => raw > self.threshold,
            Err(_) => false,
        }
    }
}

/// Button wired to a digital input.
pub struct DigitalButton<P: InputPin> {
    pin: P,
    active_high: bool,
}

impl<P: InputPin> DigitalButton<P> {
    pub fn new(pin: P, active_high: bool) -> Self {
        Self { pin, active_high }
    }
}

impl<P: InputPin> JoystickButton for DigitalButton<P> {
    async fn is_pressed(&mut self) -> bool {
        let level = if self.active_high {
            self.pin.is_high()
        } else {
            self.pin.is_low()
        };
        level.unwrap_or(false)
    }
}

/// Two-axis analog joystick with a push button.
///
/// Every sample averages `samples` raw reads per axis and maps the means to
/// pointer deltas with the axis' linear transform.
pub struct Joystick<X: AnalogInput, Y: AnalogInput, B: JoystickButton> {
    x: X,
    y: Y,
    button: B,
    config: JoystickConfig,
}

impl<X: AnalogInput, Y: AnalogInput, B: JoystickButton> Joystick<X, Y, B> {
    pub fn new(x: X, y: Y, button: B, config: JoystickConfig) -> Self {
        Self { x, y, button, config }
    }
}

impl<X: AnalogInput, Y: AnalogInput, B: JoystickButton> PointerSampler for Joystick<X, Y, B> {
    async fn sample(&mut self) -> MouseData {
        let x = mean_of(&mut self.x, self.config.samples).await;
        let y = mean_of(&mut self.y, self.config.samples).await;
        let button = self.button.is_pressed().await;

        MouseData {
            button,
            delta_x: axis_delta(&self.config.x, x),
            delta_y: axis_delta(&self.config.y, y),
            scroll_v: 0,
            scroll_h: 0,
        }
    }
}

/// Arithmetic mean of `samples` reads, `None` if every read failed.
async fn mean_of<A: AnalogInput>(input: &mut A, samples: u16) -> Option<u16> {
    let mut sum: u32 = 0;
    let mut count: u32 = 0;
    for _ in 0..samples {
        match input.read().await {
            Ok(raw) => {
                sum += raw as u32;
                count += 1;
            }
            Err(_) => trace!("Analog read failed, sample skipped"),
        }
    }
    if count == 0 {
        warn!("No analog sample could be read");
        return None;
    }
    Some((sum / count) as u16)
}

/// Map a mean raw value to a pointer delta, saturated to the report range.
///
/// An axis without a usable mean reads as centered.
pub(crate) fn axis_delta(axis: &AxisConfig, mean: Option<u16>) -> i8 {
    let Some(mean) = mean else {
        return 0;
    };
    let offset = mean as i32 - axis.center as i32;
    let mut delta = offset / axis.divisor.max(1) as i32 * axis.scale as i32;
    if axis.invert {
        delta = -delta;
    }
    delta.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}
