//! # Event Translator Module
//!
//! Turns raw controller button events into keystrokes.
//!
//! Each mapped button is its own two-state machine:
//!
//! | State | Event | Next | Output |
//! |-------|-------|------|--------|
//! | released | press (1) | pressed | - |
//! | pressed | press (1) / repeat (2) | pressed | - |
//! | pressed | release (0) | released | keystroke |
//! | released | release (0) | released | - |
//!
//! A keystroke is produced only on the press-to-release edge, so one physical
//! press and release always yields exactly one complete key tap downstream.
//! Events for unmapped codes and non-KEY events (SYN markers and the like)
//! pass through without touching any state.
//!
//! ## Usage
//!
//! ```
//! use deckbd::controller::mapping::MappingTable;
//! use deckbd::controller::translator::Translator;
//! use deckbd::event::{RawEvent, KEY_PRESSED, KEY_RELEASED};
//! use evdev::Key;
//!
//! let mut translator = Translator::new(MappingTable::steam_deck());
//!
//! assert!(translator.process_event(&RawEvent::key(Key::BTN_DPAD_UP, KEY_PRESSED)).is_none());
//! let keystroke = translator
//!     .process_event(&RawEvent::key(Key::BTN_DPAD_UP, KEY_RELEASED))
//!     .unwrap();
//! assert_eq!(keystroke.key, Key::KEY_1);
//! ```

use evdev::Key;
use tracing::trace;

use super::mapping::{MappingTable, ModifierMask};
use crate::event::{RawEvent, KEY_PRESSED, KEY_RELEASED};

/// A key tap to send: `key` pressed and released while `modifiers` are held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keystroke {
    pub modifiers: ModifierMask,
    pub key: Key,
}

impl Keystroke {
    pub fn new(modifiers: ModifierMask, key: Key) -> Self {
        Self { modifiers, key }
    }

    /// A tap of `key` with no modifiers.
    pub fn plain(key: Key) -> Self {
        Self::new(ModifierMask::NONE, key)
    }
}

/// Edge detector over a [`MappingTable`].
///
/// The held/released flag of each rule lives here, indexed like
/// [`MappingTable::rules`], and is private to this type. Only
/// [`Translator::process_event`] writes it.
///
/// # Thread Safety
///
/// `Translator` is not thread-safe. Use from a single task/thread only.
#[derive(Debug)]
pub struct Translator {
    table: MappingTable,
    pressed: Vec<bool>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(MappingTable::default())
    }
}

impl Translator {
    /// Creates a translator with every button released.
    #[must_use]
    pub fn new(table: MappingTable) -> Self {
        let pressed = vec![false; table.len()];
        Self { table, pressed }
    }

    /// The mapping table being applied.
    #[must_use]
    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// Processes a single event.
    ///
    /// Returns the keystroke to emit when `event` completes a press/release
    /// cycle of a mapped button, `None` otherwise.
    pub fn process_event(&mut self, event: &RawEvent) -> Option<Keystroke> {
        if !event.is_key() {
            return None;
        }

        let index = self.table.position(event.code)?;
        let rule = self.table.rules()[index];
        let pressed = &mut self.pressed[index];

        match event.value {
            KEY_PRESSED => {
                if !*pressed {
                    trace!("{:?} pressed", rule.button);
                    *pressed = true;
                }
                None
            }
            KEY_RELEASED if *pressed => {
                trace!("{:?} released", rule.button);
                *pressed = false;
                Some(Keystroke::new(rule.modifiers, rule.key))
            }
            _ => {
                // Autorepeat, or a release we never saw pressed
                None
            }
        }
    }

    /// Whether the translator currently considers `button` held.
    #[must_use]
    pub fn is_pressed(&self, button: Key) -> bool {
        self.table
            .position(button.code())
            .map(|index| self.pressed[index])
            .unwrap_or(false)
    }
}
