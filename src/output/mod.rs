//! # Output Module
//!
//! Synthetic keyboard output through a uinput virtual device.
//!
//! This module handles:
//! - Creating the virtual keyboard with the keys the mapping table needs
//! - Writing key events with explicit SYN markers
//! - Expanding a keystroke into its modifier/key event sequence

pub mod emitter;
pub mod sink;
