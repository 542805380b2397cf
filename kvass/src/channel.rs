//! Queues and pending-event flags shared by the polling loop and the transport loop

use core::cell::Cell;
use core::future::poll_fn;
use core::task::Poll;

use bitflags::bitflags;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::waitqueue::AtomicWaker;
pub use embassy_sync::{blocking_mutex, channel};

use crate::hid::{KeyboardData, MouseData};
use crate::state::{AtomicTransportMode, TransportMode};
use crate::{KEYBOARD_QUEUE_SIZE, MOUSE_QUEUE_SIZE, RawMutex};

bitflags! {
    /// Pending events. Raising a bit that's already set is a no-op, so a
    /// consumer learns "at least one such event is queued", never how many.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NotifyFlags: u8 {
        const HID_CHANGED = 0x01;
        const KEY_CHANGED = 0x02;
        const MOUSE_CHANGED = 0x04;
        const PROTOCOL_CHANGED = 0x08;
    }
}

impl NotifyFlags {
    /// Every flag attached to a queued report
    pub const REPORTS: Self = Self::HID_CHANGED.union(Self::KEY_CHANGED).union(Self::MOUSE_CHANGED);
}

/// Accumulating flag set with a single waiter.
///
/// Bits are OR-ed in by [`Notification::raise`] and cleared atomically by the
/// consumer when it takes them.
pub struct Notification {
    pending: Mutex<RawMutex, Cell<NotifyFlags>>,
    waker: AtomicWaker,
}

impl Default for Notification {
    fn default() -> Self {
        Self::new()
    }
}

impl Notification {
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(NotifyFlags::empty())),
            waker: AtomicWaker::new(),
        }
    }

    /// OR `flags` into the pending set and wake the waiter.
    pub fn raise(&self, flags: NotifyFlags) {
        self.pending.lock(|pending| pending.set(pending.get() | flags));
        self.waker.wake();
    }

    /// Clear and return the pending bits within `mask`, other bits are left alone.
    pub fn take(&self, mask: NotifyFlags) -> NotifyFlags {
        self.pending.lock(|pending| {
            let current = pending.get();
            pending.set(current.difference(mask));
            current.intersection(mask)
        })
    }

    /// Pending bits, without clearing them
    pub fn pending(&self) -> NotifyFlags {
        self.pending.lock(|pending| pending.get())
    }

    /// Wait until any bit of `mask` is pending, then clear and return those bits.
    pub async fn wait(&self, mask: NotifyFlags) -> NotifyFlags {
        poll_fn(|cx| {
            self.waker.register(cx.waker());
            let flags = self.take(mask);
            if flags.is_empty() {
                Poll::Pending
            } else {
                Poll::Ready(flags)
            }
        })
        .await
    }
}

/// Everything the two loops exchange.
///
/// Reports are copied into the bounded queues, the notification tells the
/// transport which queues to look at.
pub struct Channels {
    /// Keyboard reports from the polling loop to the transport
    pub keyboard: Channel<RawMutex, KeyboardData, KEYBOARD_QUEUE_SIZE>,
    /// Pointer reports from the polling loop to the transport
    pub mouse: Channel<RawMutex, MouseData, MOUSE_QUEUE_SIZE>,
    pub notification: Notification,
    mode: AtomicTransportMode,
}

impl Channels {
    pub const fn new(initial_mode: TransportMode) -> Self {
        Self {
            keyboard: Channel::new(),
            mouse: Channel::new(),
            notification: Notification::new(),
            mode: AtomicTransportMode::new(initial_mode),
        }
    }

    /// Currently selected transport
    pub fn transport_mode(&self) -> TransportMode {
        self.mode.load()
    }

    /// Select the transport before the transport loop starts, nobody is woken.
    pub fn init_transport(&self, mode: TransportMode) {
        self.mode.store(mode);
    }

    /// Select another transport and make the transport loop re-enter its state machine.
    pub fn switch_transport(&self, mode: TransportMode) {
        info!("Switching transport to {:?}", mode);
        self.mode.store(mode);
        self.notification.raise(NotifyFlags::PROTOCOL_CHANGED);
    }

    /// Drop every queued report along with the flags announcing them.
    pub fn discard_reports(&self) {
        self.keyboard.clear();
        self.mouse.clear();
        self.notification.take(NotifyFlags::REPORTS);
    }
}

/// Channels used by [`crate::run_kvass`]
pub static CHANNELS: Channels = Channels::new(TransportMode::Usb);
