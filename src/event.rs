//! # Raw Input Events
//!
//! A plain `(type, code, value)` view of kernel input events, shared by the
//! controller side (events read) and the output side (events written).

use evdev::{EventType, InputEvent, Key, Synchronization};

/// Key value: button released.
pub const KEY_RELEASED: i32 = 0;
/// Key value: button pressed.
pub const KEY_PRESSED: i32 = 1;
/// Key value: kernel autorepeat. Never acted on.
pub const KEY_REPEAT: i32 = 2;

/// Event type of a [`RawEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// EV_KEY: key or button state change
    Key,
    /// EV_SYN: synchronization marker
    Sync,
    /// Any other event type, carried through by its raw number
    Other(u16),
}

impl EventKind {
    /// Raw kernel event type number.
    pub fn raw(self) -> u16 {
        match self {
            EventKind::Key => EventType::KEY.0,
            EventKind::Sync => EventType::SYNCHRONIZATION.0,
            EventKind::Other(raw) => raw,
        }
    }
}

impl From<EventType> for EventKind {
    fn from(ty: EventType) -> Self {
        match ty {
            EventType::KEY => EventKind::Key,
            EventType::SYNCHRONIZATION => EventKind::Sync,
            other => EventKind::Other(other.0),
        }
    }
}

/// One input event: type, code and value.
///
/// # Examples
///
/// ```
/// use deckbd::event::{EventKind, RawEvent, KEY_PRESSED};
/// use evdev::Key;
///
/// let ev = RawEvent::key(Key::BTN_DPAD_UP, KEY_PRESSED);
/// assert_eq!(ev.kind, EventKind::Key);
/// assert!(ev.is_key());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventKind,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    /// Builds an event from its parts.
    pub fn new(kind: EventKind, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    /// Builds a KEY event for `key`.
    pub fn key(key: Key, value: i32) -> Self {
        Self::new(EventKind::Key, key.code(), value)
    }

    /// Builds a SYN_REPORT marker.
    pub fn sync() -> Self {
        Self::new(EventKind::Sync, Synchronization::SYN_REPORT.0, 0)
    }

    pub fn is_key(&self) -> bool {
        self.kind == EventKind::Key
    }

    pub fn is_sync(&self) -> bool {
        self.kind == EventKind::Sync
    }
}

impl From<InputEvent> for RawEvent {
    fn from(event: InputEvent) -> Self {
        Self::new(event.event_type().into(), event.code(), event.value())
    }
}

impl From<RawEvent> for InputEvent {
    fn from(event: RawEvent) -> Self {
        InputEvent::new(EventType(event.kind.raw()), event.code, event.value)
    }
}
