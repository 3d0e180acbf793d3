//! # deckbd Library
//!
//! Drive keyboard-only software with the Steam Deck controller.
//!
//! This library provides the core functionality for finding the controller's
//! evdev node, translating its button press/release cycles into key taps, and
//! emitting those taps through a uinput virtual keyboard.

pub mod config;
pub mod controller;
pub mod daemon;
pub mod error;
pub mod event;
pub mod keys;
pub mod output;
pub mod shutdown;
