//! # Key Names
//!
//! Resolves the kernel key/button names used in the configuration file
//! (`"KEY_1"`, `"BTN_DPAD_UP"`) to [`evdev::Key`] codes.
//!
//! Every name evdev knows is accepted. On top of that, the gamepad face
//! buttons also go by the letter aliases the kernel headers define (`BTN_A`),
//! which evdev does not list. Anything else can still be given as a raw code,
//! in decimal or `0x` hex.

use std::str::FromStr;

use evdev::Key;

use crate::error::{DeckbdError, Result};

/// Face button aliases from `input-event-codes.h`.
const FACE_BUTTON_ALIASES: &[(&str, Key)] = &[
    ("BTN_A", Key::BTN_SOUTH),
    ("BTN_B", Key::BTN_EAST),
    ("BTN_X", Key::BTN_NORTH),
    ("BTN_Y", Key::BTN_WEST),
];

/// Resolves a key or button name to its [`Key`].
///
/// Names are matched case-insensitively. Raw codes (`"304"`, `"0x130"`) are
/// accepted for keys without a name.
///
/// # Errors
///
/// Returns `UnknownKey` if the name is neither a known name nor a valid code.
///
/// # Examples
///
/// ```
/// use deckbd::keys::parse_key;
/// use evdev::Key;
///
/// assert_eq!(parse_key("BTN_DPAD_UP").unwrap(), Key::BTN_DPAD_UP);
/// assert_eq!(parse_key("btn_a").unwrap(), Key::BTN_SOUTH);
/// assert_eq!(parse_key("0x2").unwrap(), Key::KEY_1);
/// ```
pub fn parse_key(name: &str) -> Result<Key> {
    let upper = name.trim().to_ascii_uppercase();

    if let Ok(key) = Key::from_str(&upper) {
        return Ok(key);
    }

    if let Some((_, key)) = FACE_BUTTON_ALIASES.iter().find(|(alias, _)| *alias == upper) {
        return Ok(*key);
    }

    let code = match upper.strip_prefix("0X") {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => upper.parse::<u16>().ok(),
    };

    code.map(Key::new)
        .ok_or_else(|| DeckbdError::UnknownKey(name.to_string()))
}

/// Human-readable name of a key, for log lines.
///
/// Returns the kernel name for the code, or the hex code if it has none.
pub fn key_name(key: Key) -> String {
    let name = format!("{:?}", key);
    match Key::from_str(&name) {
        Ok(_) => name,
        Err(_) => format!("0x{:03x}", key.code()),
    }
}
