//! # Controller Module
//!
//! Steam Deck controller input handling.
//!
//! This module handles:
//! - Controller detection among the evdev nodes under `/dev/input`
//! - Reading raw button events
//! - The button-to-key mapping table
//! - Edge detection turning press/release cycles into keystrokes

pub mod locator;
pub mod mapping;
pub mod source;
pub mod translator;
