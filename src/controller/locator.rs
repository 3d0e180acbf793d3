//! # Controller Locator Module
//!
//! Finds the controller among the input devices exposed by the kernel.
//!
//! ## Controller Detection
//!
//! The Steam Deck controller is identified by:
//! - Bus type: USB
//! - Vendor ID: 0x28de (Valve)
//! - Product ID: 0x1205 (Steam Deck)
//! - Advertising the `BTN_DPAD_UP` key
//!
//! The same USB chip exposes several logical HID endpoints with identical
//! IDs (the gamepad, a mouse, a keyboard), so the signature button is what
//! singles out the gamepad node.
//!
//! ## Scan Order
//!
//! Candidates are tried in directory enumeration order and the first match
//! wins. That order is defined by the kernel and filesystem, not by us: if two
//! nodes could both match, which one is picked is not guaranteed.

use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use evdev::{BusType, Device, Key};
use tracing::{debug, info};

use crate::error::{DeckbdError, Result};

/// Default directory holding `event*` device nodes.
pub const DEFAULT_DEVICE_DIR: &str = "/dev/input";

/// Valve vendor ID
pub const STEAM_DECK_VENDOR_ID: u16 = 0x28de;

/// Steam Deck built-in controller product ID
pub const STEAM_DECK_PRODUCT_ID: u16 = 0x1205;

/// Button only the gamepad endpoint of the Steam Deck advertises
pub const STEAM_DECK_SIGNATURE: Key = Key::BTN_DPAD_UP;

/// Bus, vendor and product of an input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub bus: BusType,
    pub vendor: u16,
    pub product: u16,
}

impl DeviceIdentity {
    pub fn new(bus: BusType, vendor: u16, product: u16) -> Self {
        Self {
            bus,
            vendor,
            product,
        }
    }
}

/// What a candidate must look like to be accepted as the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerMatcher {
    pub identity: DeviceIdentity,
    pub signature: Key,
}

impl Default for ControllerMatcher {
    fn default() -> Self {
        Self::steam_deck()
    }
}

impl ControllerMatcher {
    pub fn new(identity: DeviceIdentity, signature: Key) -> Self {
        Self {
            identity,
            signature,
        }
    }

    /// The Steam Deck's built-in controller.
    pub fn steam_deck() -> Self {
        Self::new(
            DeviceIdentity::new(BusType::BUS_USB, STEAM_DECK_VENDOR_ID, STEAM_DECK_PRODUCT_ID),
            STEAM_DECK_SIGNATURE,
        )
    }
}

/// Host capabilities the locator needs: list candidate nodes, open one,
/// query its identity and key capabilities.
///
/// Dropping a handle closes the device.
pub trait DeviceBackend {
    type Handle;

    /// Candidate device node paths, in enumeration order.
    fn list_nodes(&self) -> Result<Vec<PathBuf>>;

    /// Opens a node for reading.
    fn open(&self, path: &Path) -> io::Result<Self::Handle>;

    /// Bus, vendor and product of an opened device.
    fn identity(&self, handle: &Self::Handle) -> io::Result<DeviceIdentity>;

    /// Whether the device advertises `key` as an EV_KEY code.
    fn has_key(&self, handle: &Self::Handle, key: Key) -> bool;
}

/// A matched device and the path it was opened from.
#[derive(Debug)]
pub struct LocatedDevice<H> {
    pub path: PathBuf,
    pub handle: H,
}

/// Scans the backend's candidates and returns the first one matching
/// `matcher`, still open.
///
/// Candidates that cannot be opened or queried are skipped. Rejected
/// handles are closed before this returns.
///
/// # Errors
///
/// - `ControllerNotFound`: no candidate matched
/// - `DeviceDirectory`: the candidate list itself could not be read
///
/// # Examples
///
/// ```no_run
/// use deckbd::controller::locator::{find_controller, ControllerMatcher, EvdevBackend};
///
/// let backend = EvdevBackend::default();
/// let found = find_controller(&backend, &ControllerMatcher::steam_deck())?;
/// println!("Controller at: {}", found.path.display());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn find_controller<B: DeviceBackend>(
    backend: &B,
    matcher: &ControllerMatcher,
) -> Result<LocatedDevice<B::Handle>> {
    for path in backend.list_nodes()? {
        let handle = match backend.open(&path) {
            Ok(handle) => handle,
            Err(e) => {
                // Permission denied or other errors - skip device
                debug!("Could not open {}: {}", path.display(), e);
                continue;
            }
        };

        let identity = match backend.identity(&handle) {
            Ok(identity) => identity,
            Err(e) => {
                debug!("Failed to get device info of {}: {}", path.display(), e);
                continue;
            }
        };

        debug!(
            "Found input device: {} (bus: {:?}, vendor: 0x{:04x}, product: 0x{:04x})",
            path.display(),
            identity.bus,
            identity.vendor,
            identity.product
        );

        if identity != matcher.identity {
            continue;
        }

        if !backend.has_key(&handle, matcher.signature) {
            debug!(
                "{} matches the controller IDs but lacks {:?}, skipping",
                path.display(),
                matcher.signature
            );
            continue;
        }

        info!("Found controller: {}", path.display());
        return Ok(LocatedDevice { path, handle });
    }

    Err(DeckbdError::ControllerNotFound)
}

/// [`DeviceBackend`] over the kernel's evdev character devices.
#[derive(Debug, Clone)]
pub struct EvdevBackend {
    device_dir: PathBuf,
}

impl Default for EvdevBackend {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_DIR)
    }
}

impl EvdevBackend {
    pub fn new<P: Into<PathBuf>>(device_dir: P) -> Self {
        Self {
            device_dir: device_dir.into(),
        }
    }

    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }
}

impl DeviceBackend for EvdevBackend {
    type Handle = Device;

    fn list_nodes(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.device_dir).map_err(|e| {
            DeckbdError::DeviceDirectory(format!("{}: {}", self.device_dir.display(), e))
        })?;

        let mut nodes = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            // Only check event* devices
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with("event") {
                continue;
            }

            match entry.file_type() {
                Ok(file_type) if file_type.is_char_device() => {
                    nodes.push(self.device_dir.join(&name));
                }
                _ => continue,
            }
        }

        Ok(nodes)
    }

    /// Opens the node through evdev, which tries read-write first and falls
    /// back to read-only. Nothing here writes to the controller, so a
    /// read-only node is enough. Identity and capabilities are queried
    /// during the open, so an ioctl failure surfaces as an open error.
    fn open(&self, path: &Path) -> io::Result<Device> {
        Device::open(path)
    }

    fn identity(&self, device: &Device) -> io::Result<DeviceIdentity> {
        let id = device.input_id();
        Ok(DeviceIdentity::new(id.bus_type(), id.vendor(), id.product()))
    }

    fn has_key(&self, device: &Device, key: Key) -> bool {
        device
            .supported_keys()
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }
}
