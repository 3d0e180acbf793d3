//! # Key Emitter Module
//!
//! Writes a [`Keystroke`] to a [`KeySink`] as a strictly ordered event
//! sequence.
//!
//! ## Sequence
//!
//! For modifiers `M` (canonical order) and key `K`:
//!
//! ```text
//! (M_i down, SYN)*   K down, SYN   K up, SYN   (M_i up, SYN)*
//! ```
//!
//! Every step carries its own SYN marker so consumers never see a
//! half-applied state. Modifiers stay held across the key tap, which is what
//! makes `Shift+Key` style combos work. The sequence is
//! `4 + 4 * popcount(M)` events long.

use tracing::debug;

use super::sink::KeySink;
use crate::controller::translator::Keystroke;
use crate::error::{DeckbdError, Result};
use crate::event::{RawEvent, KEY_PRESSED, KEY_RELEASED};

/// Builds the full event sequence for `keystroke`, SYN markers included.
///
/// # Examples
///
/// ```
/// use deckbd::controller::translator::Keystroke;
/// use deckbd::output::emitter::key_sequence;
/// use evdev::Key;
///
/// let seq = key_sequence(Keystroke::plain(Key::KEY_1));
/// assert_eq!(seq.len(), 4);
/// ```
#[must_use]
pub fn key_sequence(keystroke: Keystroke) -> Vec<RawEvent> {
    let modifiers = keystroke.modifiers.keys();
    let mut events = Vec::with_capacity(4 + 4 * keystroke.modifiers.count());

    for modifier in modifiers.clone() {
        events.push(RawEvent::key(modifier, KEY_PRESSED));
        events.push(RawEvent::sync());
    }

    events.push(RawEvent::key(keystroke.key, KEY_PRESSED));
    events.push(RawEvent::sync());
    events.push(RawEvent::key(keystroke.key, KEY_RELEASED));
    events.push(RawEvent::sync());

    for modifier in modifiers {
        events.push(RawEvent::key(modifier, KEY_RELEASED));
        events.push(RawEvent::sync());
    }

    events
}

/// Sends keystrokes through a [`KeySink`].
#[derive(Debug)]
pub struct KeyEmitter<S: KeySink> {
    sink: S,
}

impl<S: KeySink> KeyEmitter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Writes the event sequence for `keystroke`, stopping at the first
    /// failed write.
    ///
    /// # Errors
    ///
    /// Returns `Emit` if the sink rejects a write. The virtual device is
    /// expected to be reliable once created, so the caller treats this as
    /// fatal.
    pub fn emit(&mut self, keystroke: Keystroke) -> Result<()> {
        debug!(
            "Emitting {:?} with modifiers 0b{:06b}",
            keystroke.key,
            keystroke.modifiers.bits()
        );

        for event in key_sequence(keystroke) {
            self.sink.write_event(event).map_err(|e| {
                DeckbdError::Emit(format!(
                    "write of type {} code {} value {} failed: {}",
                    event.kind.raw(),
                    event.code,
                    event.value,
                    e
                ))
            })?;
        }

        Ok(())
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Gives the sink back, e.g. to close it at a chosen point.
    pub fn into_sink(self) -> S {
        self.sink
    }
}
