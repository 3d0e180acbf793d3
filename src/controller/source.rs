//! Trait abstraction for reading controller events to enable testing

use async_trait::async_trait;
use evdev::{Device, EventStream};
use std::io;
use std::path::{Path, PathBuf};

use crate::event::RawEvent;

/// Trait for the read-next-event capability of the physical controller.
///
/// `next_event` must be cancel-safe: the run loop drops the future when a
/// shutdown request arrives while it is pending.
#[async_trait]
pub trait EventSource: Send {
    /// Waits for the next event from the device.
    async fn next_event(&mut self) -> io::Result<RawEvent>;
}

/// Whether a read error means the device is gone rather than a hiccup.
///
/// Unplugging (or the kernel tearing down the node) surfaces as `ENODEV`.
pub fn is_device_lost(error: &io::Error) -> bool {
    matches!(error.raw_os_error(), Some(libc::ENODEV) | Some(libc::ENXIO))
        || error.kind() == io::ErrorKind::UnexpectedEof
}

/// The controller's evdev node, read through tokio's reactor.
pub struct ControllerEvents {
    stream: EventStream,
    device_path: PathBuf,
}

impl std::fmt::Debug for ControllerEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerEvents")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ControllerEvents {
    /// Switches `device` to non-blocking mode and registers it with the
    /// runtime. Must be called from within a tokio runtime.
    pub fn new(device: Device, device_path: PathBuf) -> io::Result<Self> {
        let stream = device.into_event_stream()?;
        Ok(Self {
            stream,
            device_path,
        })
    }

    /// The `/dev/input/eventX` path the controller was opened from.
    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    /// Controller name as reported by the kernel.
    pub fn name(&self) -> Option<&str> {
        self.stream.device().name()
    }
}

#[async_trait]
impl EventSource for ControllerEvents {
    async fn next_event(&mut self) -> io::Result<RawEvent> {
        self.stream.next_event().await.map(RawEvent::from)
    }
}
