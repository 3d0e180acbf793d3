//! # Mapping Table Module
//!
//! The ordered set of button-to-key rules driving the translator.
//!
//! ## Default Assignments (Steam Deck)
//!
//! | Button | Key |
//! |--------|-----|
//! | D-Pad Up | 1 |
//! | D-Pad Left | 2 |
//! | D-Pad Down | 3 |
//! | D-Pad Right | 4 |
//! | Y | 5 |
//! | X | 6 |
//! | A | 7 |
//! | B | 8 |
//! | L1 | 9 |
//! | R1 | 0 |
//! | L2 | Backspace |
//! | R2 | Enter |
//!
//! ## Modifiers
//!
//! A rule may hold modifier keys around its target key. Bit `i` of a
//! [`ModifierMask`] selects entry `i` of [`MODIFIER_KEYS`]; both are fixed
//! for the lifetime of the process.

use evdev::Key;

use crate::error::{DeckbdError, Result};
use crate::keys::key_name;

/// Modifier keys in canonical order. Bit `i` of a mask selects entry `i`.
pub const MODIFIER_KEYS: [Key; 6] = [
    Key::KEY_LEFTSHIFT,
    Key::KEY_LEFTCTRL,
    Key::KEY_LEFTALT,
    Key::KEY_RIGHTSHIFT,
    Key::KEY_RIGHTCTRL,
    Key::KEY_RIGHTALT,
];

/// Names accepted for each modifier bit, in canonical order.
pub const MODIFIER_NAMES: [&str; 6] = [
    "LEFTSHIFT",
    "LEFTCTRL",
    "LEFTALT",
    "RIGHTSHIFT",
    "RIGHTCTRL",
    "RIGHTALT",
];

/// Set of modifier keys held while a target key is tapped.
///
/// # Examples
///
/// ```
/// use deckbd::controller::mapping::ModifierMask;
/// use evdev::Key;
///
/// let mask = ModifierMask::LEFT_SHIFT | ModifierMask::LEFT_CTRL;
/// assert_eq!(mask.count(), 2);
/// assert_eq!(mask.keys().collect::<Vec<_>>(), vec![Key::KEY_LEFTSHIFT, Key::KEY_LEFTCTRL]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierMask(u8);

impl ModifierMask {
    pub const NONE: Self = Self(0);
    pub const LEFT_SHIFT: Self = Self(1);
    pub const LEFT_CTRL: Self = Self(1 << 1);
    pub const LEFT_ALT: Self = Self(1 << 2);
    pub const RIGHT_SHIFT: Self = Self(1 << 3);
    pub const RIGHT_CTRL: Self = Self(1 << 4);
    pub const RIGHT_ALT: Self = Self(1 << 5);

    const VALID_BITS: u8 = (1 << MODIFIER_KEYS.len()) - 1;

    /// Builds a mask from raw bits. Bits beyond the modifier list are dropped.
    pub fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::VALID_BITS)
    }

    /// Builds a mask from modifier names (`"LEFTSHIFT"`, `"KEY_LEFTCTRL"`, ...).
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` for a name that is not one of the six modifiers.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut mask = Self::NONE;
        for name in names {
            let raw = name.as_ref().trim();
            let bare = raw
                .strip_prefix("KEY_")
                .or_else(|| raw.strip_prefix("key_"))
                .unwrap_or(raw);
            let bit = MODIFIER_NAMES
                .iter()
                .position(|known| known.eq_ignore_ascii_case(bare))
                .ok_or_else(|| DeckbdError::UnknownKey(raw.to_string()))?;
            mask.0 |= 1 << bit;
        }
        Ok(mask)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of modifiers in the mask.
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Modifier keys in the mask, in canonical list order.
    pub fn keys(self) -> impl Iterator<Item = Key> + Clone {
        MODIFIER_KEYS
            .into_iter()
            .enumerate()
            .filter(move |(bit, _)| self.0 & (1 << *bit) != 0)
            .map(|(_, key)| key)
    }
}

impl std::ops::BitOr for ModifierMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One button-to-key rule.
///
/// Rules are immutable. Whether a button is held is tracked by
/// [`crate::controller::translator::Translator`], per rule index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingRule {
    pub button: Key,
    pub modifiers: ModifierMask,
    pub key: Key,
}

impl MappingRule {
    pub fn new(button: Key, modifiers: ModifierMask, key: Key) -> Self {
        Self {
            button,
            modifiers,
            key,
        }
    }
}

/// Ordered, duplicate-free set of mapping rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    rules: Vec<MappingRule>,
}

impl Default for MappingTable {
    fn default() -> Self {
        Self::steam_deck()
    }
}

impl MappingTable {
    /// Builds a table from rules, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateButton` if two rules share a source button.
    pub fn new(rules: Vec<MappingRule>) -> Result<Self> {
        for (i, rule) in rules.iter().enumerate() {
            if rules[i + 1..].iter().any(|other| other.button == rule.button) {
                return Err(DeckbdError::DuplicateButton(key_name(rule.button)));
            }
        }

        Ok(Self { rules })
    }

    /// The built-in Steam Deck layout: D-pad and face buttons to digits,
    /// bumpers to 9 and 0, triggers to Backspace and Enter.
    pub fn steam_deck() -> Self {
        let plain = |button, key| MappingRule::new(button, ModifierMask::NONE, key);

        Self {
            rules: vec![
                plain(Key::BTN_DPAD_UP, Key::KEY_1),
                plain(Key::BTN_DPAD_LEFT, Key::KEY_2),
                plain(Key::BTN_DPAD_DOWN, Key::KEY_3),
                plain(Key::BTN_DPAD_RIGHT, Key::KEY_4),
                // Y, X, A, B
                plain(Key::BTN_WEST, Key::KEY_5),
                plain(Key::BTN_NORTH, Key::KEY_6),
                plain(Key::BTN_SOUTH, Key::KEY_7),
                plain(Key::BTN_EAST, Key::KEY_8),
                plain(Key::BTN_TL, Key::KEY_9),
                plain(Key::BTN_TR, Key::KEY_0),
                plain(Key::BTN_TL2, Key::KEY_BACKSPACE),
                plain(Key::BTN_TR2, Key::KEY_ENTER),
            ],
        }
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule for `code`, if any button maps it.
    pub fn rule_for(&self, code: u16) -> Option<&MappingRule> {
        self.rules.iter().find(|rule| rule.button.code() == code)
    }

    /// Index of the rule for `code` in [`MappingTable::rules`].
    pub fn position(&self, code: u16) -> Option<usize> {
        self.rules.iter().position(|rule| rule.button.code() == code)
    }

    /// Every key the virtual keyboard must be able to send: each target key
    /// plus each modifier used by any rule, without repeats.
    pub fn output_keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = Vec::new();
        for rule in &self.rules {
            for key in rule.modifiers.keys().chain(std::iter::once(rule.key)) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }
}
