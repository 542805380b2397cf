use embassy_sync::channel::TrySendError;

use crate::channel::{Channels, NotifyFlags};
use crate::hid::{KeyboardData, MouseData};

/// Hands reports over to the transport loop without ever waiting.
///
/// A full queue drops the report: the next polling tick produces a fresh one
/// anyway, and the polling loop must keep its period.
pub struct ReportDispatcher<'a> {
    channels: &'a Channels,
}

impl<'a> ReportDispatcher<'a> {
    pub fn new(channels: &'a Channels) -> Self {
        Self { channels }
    }

    /// Queue a keyboard report, returns `false` if it was dropped.
    pub fn dispatch_keyboard(&self, report: KeyboardData) -> bool {
        match self.channels.keyboard.try_send(report) {
            Ok(()) => {
                self.channels
                    .notification
                    .raise(NotifyFlags::KEY_CHANGED | NotifyFlags::HID_CHANGED);
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!("Keyboard queue is full, report dropped");
                false
            }
        }
    }

    /// Queue a pointer report, returns `false` if it was dropped.
    pub fn dispatch_mouse(&self, report: MouseData) -> bool {
        match self.channels.mouse.try_send(report) {
            Ok(()) => {
                self.channels
                    .notification
                    .raise(NotifyFlags::MOUSE_CHANGED | NotifyFlags::HID_CHANGED);
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!("Mouse queue is full, report dropped");
                false
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::keycode::KeyCode;
    use crate::state::TransportMode;
    use crate::{KEYBOARD_QUEUE_SIZE, MOUSE_QUEUE_SIZE};

    #[test]
    fn test_dispatch_keeps_fifo_order() {
        let channels = Channels::new(TransportMode::Usb);
        let dispatcher = ReportDispatcher::new(&channels);
        let mut first = KeyboardData::default();
        first.keycode[0] = KeyCode::A;
        let mut second = first;
        second.keycode[1] = KeyCode::B;

        assert!(dispatcher.dispatch_keyboard(first));
        assert!(dispatcher.dispatch_keyboard(second));
        assert_eq!(
            channels.notification.pending(),
            NotifyFlags::KEY_CHANGED | NotifyFlags::HID_CHANGED
        );
        assert_eq!(channels.keyboard.try_receive(), Ok(first));
        assert_eq!(channels.keyboard.try_receive(), Ok(second));
    }

    #[test]
    fn test_full_queue_drops_without_notifying() {
        let channels = Channels::new(TransportMode::Usb);
        let dispatcher = ReportDispatcher::new(&channels);
        for _ in 0..KEYBOARD_QUEUE_SIZE {
            assert!(dispatcher.dispatch_keyboard(KeyboardData::default()));
        }
        channels.notification.take(NotifyFlags::all());

        assert!(!dispatcher.dispatch_keyboard(KeyboardData::default()));
        assert!(channels.notification.pending().is_empty());
        assert_eq!(channels.keyboard.len(), KEYBOARD_QUEUE_SIZE);
    }

    #[test]
    fn test_mouse_dispatch_raises_mouse_flag() {
        let channels = Channels::new(TransportMode::Usb);
        let dispatcher = ReportDispatcher::new(&channels);
        for _ in 0..MOUSE_QUEUE_SIZE {
            assert!(dispatcher.dispatch_mouse(MouseData::default()));
        }
        assert!(!dispatcher.dispatch_mouse(MouseData::default()));
        assert_eq!(
            channels.notification.pending(),
            NotifyFlags::MOUSE_CHANGED | NotifyFlags::HID_CHANGED
        );
        assert!(channels.keyboard.is_empty());
    }
}
