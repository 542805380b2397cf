use embassy_time::{Duration, Timer};

use self::active_keys::{ActiveKeySet, ActiveKeyTracker};
use crate::channel::Channels;
use crate::config::MatrixConfig;
use crate::dispatcher::ReportDispatcher;
use crate::input_device::PointerSampler;
use crate::layout::KeyboardLayout;
use crate::matrix::MatrixTrait;

pub mod active_keys;

/// The polling loop: scans the matrix and samples the pointer every tick.
///
/// Owns the press matrix and the active key set for the process lifetime,
/// the transport loop only ever sees the reports copied into the queues.
pub struct Keyboard<'a, M: MatrixTrait<ROW, COL>, P: PointerSampler, const ROW: usize, const COL: usize> {
    matrix: M,
    pointer: P,
    /// Layout of this half, selected once at startup
    layout: &'a KeyboardLayout<ROW, COL>,
    tracker: ActiveKeyTracker,
    dispatcher: ReportDispatcher<'a>,
    scan_period: Duration,
}

impl<'a, M: MatrixTrait<ROW, COL>, P: PointerSampler, const ROW: usize, const COL: usize>
    Keyboard<'a, M, P, ROW, COL>
{
    pub fn new(
        matrix: M,
        pointer: P,
        layout: &'a KeyboardLayout<ROW, COL>,
        channels: &'a Channels,
        config: &MatrixConfig,
    ) -> Self {
        Self {
            matrix,
            pointer,
            layout,
            tracker: ActiveKeyTracker::new(),
            dispatcher: ReportDispatcher::new(channels),
            scan_period: config.scan_period,
        }
    }

    /// Run the polling loop forever
    pub async fn run(&mut self) {
        loop {
            self.tick().await;
            Timer::after(self.scan_period).await;
        }
    }

    /// One polling cycle.
    ///
    /// A keyboard report is queued only when the scan saw a change, the
    /// pointer report is queued every time.
    pub async fn tick(&mut self) {
        if self.matrix.scan().await {
            let report = self.tracker.update(self.matrix.press_matrix(), self.layout);
            self.dispatcher.dispatch_keyboard(report);
        }

        let pointer = self.pointer.sample().await;
        self.dispatcher.dispatch_mouse(pointer);
    }

    pub fn active_keys(&self) -> &ActiveKeySet {
        self.tracker.active_keys()
    }
}

#[cfg(test)]
mod test {
    use embassy_futures::block_on;

    use super::*;
    use crate::channel::NotifyFlags;
    use crate::hid::MouseData;
    use crate::keycode::KeyCode;
    use crate::layout::{COL, LEFT_LAYOUT, ROW};
    use crate::matrix::PressMatrix;
    use crate::state::TransportMode;

    /// Matrix whose next scan result is set by the test
    struct FakeMatrix {
        state: PressMatrix<ROW, COL>,
        next: PressMatrix<ROW, COL>,
    }

    impl MatrixTrait<ROW, COL> for FakeMatrix {
        async fn scan(&mut self) -> bool {
            let changed = self.state != self.next;
            self.state = self.next;
            changed
        }

        fn press_matrix(&self) -> &PressMatrix<ROW, COL> {
            &self.state
        }
    }

    struct FixedPointer(MouseData);

    impl PointerSampler for FixedPointer {
        async fn sample(&mut self) -> MouseData {
            self.0
        }
    }

    #[test]
    fn test_tick_dispatches_only_changes() {
        let channels = Channels::new(TransportMode::Usb);
        let matrix = FakeMatrix {
            state: PressMatrix::new(),
            next: PressMatrix::new(),
        };
        let pointer = FixedPointer(MouseData {
            delta_x: 3,
            ..Default::default()
        });
        let mut keyboard = Keyboard::new(matrix, pointer, &LEFT_LAYOUT, &channels, &MatrixConfig::default());

        // Nothing changed: only the pointer report goes out
        block_on(keyboard.tick());
        assert!(channels.keyboard.is_empty());
        assert_eq!(channels.mouse.len(), 1);
        assert_eq!(
            channels.notification.take(NotifyFlags::all()),
            NotifyFlags::MOUSE_CHANGED | NotifyFlags::HID_CHANGED
        );

        keyboard.matrix.next.set(0, 0, true);
        block_on(keyboard.tick());
        let report = channels.keyboard.try_receive().unwrap();
        assert_eq!(report.keycode[0], KeyCode::Escape);
        assert_eq!(keyboard.active_keys().as_slice(), &[KeyCode::Escape]);
        assert_eq!(channels.mouse.len(), 2);
        assert_eq!(channels.notification.take(NotifyFlags::all()), NotifyFlags::REPORTS);

        // Held without change: no new keyboard report
        block_on(keyboard.tick());
        assert!(channels.keyboard.is_empty());
    }
}
