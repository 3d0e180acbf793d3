//! # Error Types
//!
//! Custom error types for deckbd using `thiserror`.

use thiserror::Error;

/// Main error type for deckbd
#[derive(Debug, Error)]
pub enum DeckbdError {
    /// No input device matched the controller identity and signature button
    #[error("Controller not found")]
    ControllerNotFound,

    /// The input device directory could not be enumerated
    #[error("Cannot read device directory: {0}")]
    DeviceDirectory(String),

    /// The uinput virtual keyboard could not be created
    #[error("Virtual device error: {0}")]
    VirtualDevice(String),

    /// The physical controller stopped being readable mid-run
    #[error("Controller lost: {0}")]
    DeviceLost(String),

    /// Writing a synthetic event to the virtual keyboard failed
    #[error("Failed to emit key event: {0}")]
    Emit(String),

    /// Signal handlers could not be installed
    #[error("Signal handler error: {0}")]
    Signal(String),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Two mapping rules share the same source button
    #[error("Button {0} is mapped more than once")]
    DuplicateButton(String),

    /// A key or button name is not in the key table
    #[error("Unknown key name: {0}")]
    UnknownKey(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeckbdError {
    /// Process exit status for this error.
    ///
    /// Each startup-fatal kind gets its own status so supervisors can tell
    /// a missing controller apart from a permission problem on `/dev/uinput`.
    pub fn exit_code(&self) -> u8 {
        match self {
            DeckbdError::Config(_)
            | DeckbdError::DuplicateButton(_)
            | DeckbdError::UnknownKey(_) => 2,
            DeckbdError::ControllerNotFound => 3,
            DeckbdError::DeviceDirectory(_) => 4,
            DeckbdError::VirtualDevice(_) => 5,
            DeckbdError::Signal(_) => 6,
            DeckbdError::DeviceLost(_) | DeckbdError::Emit(_) => 7,
            DeckbdError::Io(_) => 1,
        }
    }
}

/// Result type alias for deckbd
pub type Result<T> = std::result::Result<T, DeckbdError>;
