//! Trait abstraction for the virtual keyboard to enable testing

use std::io;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, InputEvent, Key};
use tracing::{debug, info};

use crate::error::{DeckbdError, Result};
use crate::event::RawEvent;

/// Default name of the virtual keyboard
pub const DEFAULT_DEVICE_NAME: &str = "deckbd";

/// Trait for the write-one-event capability of the virtual keyboard
#[cfg_attr(test, mockall::automock)]
pub trait KeySink {
    /// Writes one event. A SYN event marks the end of a batch.
    fn write_event(&mut self, event: RawEvent) -> io::Result<()>;
}

/// Collects non-SYN events and hands them over as one batch per SYN marker.
///
/// `VirtualDevice::emit` appends its own SYN_REPORT to every batch, so one
/// flush per marker keeps the markers and the reports one-to-one.
#[derive(Debug, Default)]
pub struct SyncBatcher {
    pending: Vec<InputEvent>,
}

impl SyncBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `event`, or passes the queued batch to `flush` if it is a SYN.
    ///
    /// The queue is cleared before `flush` runs, so a failed flush drops
    /// its batch.
    pub fn push<F>(&mut self, event: RawEvent, flush: F) -> io::Result<()>
    where
        F: FnOnce(&[InputEvent]) -> io::Result<()>,
    {
        if !event.is_sync() {
            self.pending.push(event.into());
            return Ok(());
        }

        let batch = std::mem::take(&mut self.pending);
        flush(&batch)
    }

    /// Number of events waiting for a SYN.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// uinput keyboard that implements [`KeySink`].
///
/// KEY writes go through a [`SyncBatcher`], so each marker written here
/// becomes exactly one SYN_REPORT.
pub struct VirtualKeyboard {
    device: VirtualDevice,
    batcher: SyncBatcher,
    name: String,
}

impl std::fmt::Debug for VirtualKeyboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualKeyboard")
            .field("name", &self.name)
            .field("pending", &self.batcher.pending())
            .finish_non_exhaustive()
    }
}

impl VirtualKeyboard {
    /// Creates a virtual keyboard able to send `keys`.
    ///
    /// # Errors
    ///
    /// Returns `VirtualDevice` if `/dev/uinput` cannot be opened (usually a
    /// permission problem) or the kernel rejects the device.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use deckbd::output::sink::VirtualKeyboard;
    /// use evdev::Key;
    ///
    /// let keyboard = VirtualKeyboard::create("deckbd", &[Key::KEY_1, Key::KEY_ENTER])?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn create(name: &str, keys: &[Key]) -> Result<Self> {
        let mut key_set = AttributeSet::<Key>::new();
        for key in keys {
            key_set.insert(*key);
        }

        let device = VirtualDeviceBuilder::new()
            .and_then(|builder| builder.name(name).with_keys(&key_set))
            .and_then(|builder| builder.build())
            .map_err(|e| DeckbdError::VirtualDevice(format!("Failed to create uinput device: {}", e)))?;

        info!("Created virtual keyboard '{}' with {} keys", name, keys.len());

        Ok(Self {
            device,
            batcher: SyncBatcher::new(),
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl KeySink for VirtualKeyboard {
    fn write_event(&mut self, event: RawEvent) -> io::Result<()> {
        let device = &mut self.device;
        self.batcher.push(event, |batch| device.emit(batch))
    }
}

impl Drop for VirtualKeyboard {
    fn drop(&mut self) {
        debug!("Destroying virtual keyboard '{}'", self.name);
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Recording sink for testing
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub written: Arc<Mutex<Vec<RawEvent>>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<RawEvent> {
            self.written.lock().unwrap().clone()
        }
    }

    impl KeySink for RecordingSink {
        fn write_event(&mut self, event: RawEvent) -> io::Result<()> {
            self.written.lock().unwrap().push(event);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::mapping::ModifierMask;
    use crate::controller::translator::Keystroke;
    use crate::event::{KEY_PRESSED, KEY_RELEASED};
    use crate::output::emitter::key_sequence;

    #[test]
    fn test_default_device_name() {
        assert_eq!(DEFAULT_DEVICE_NAME, "deckbd");
    }

    #[test]
    fn test_mock_sink_reports_failure() {
        let mut sink = MockKeySink::new();
        sink.expect_write_event()
            .times(1)
            .returning(|_| Err(io::Error::new(io::ErrorKind::BrokenPipe, "Mock write error")));

        let result = sink.write_event(RawEvent::sync());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }

    fn record_flushes(events: &[RawEvent]) -> (SyncBatcher, Vec<Vec<RawEvent>>) {
        let mut batcher = SyncBatcher::new();
        let mut flushes: Vec<Vec<RawEvent>> = Vec::new();
        for event in events {
            batcher
                .push(*event, |batch| {
                    flushes.push(batch.iter().map(|e| RawEvent::from(*e)).collect());
                    Ok(())
                })
                .unwrap();
        }
        (batcher, flushes)
    }

    #[test]
    fn test_batcher_flushes_once_per_sync() {
        let keystroke = Keystroke::new(
            ModifierMask::LEFT_SHIFT | ModifierMask::LEFT_CTRL,
            Key::KEY_5,
        );
        let sequence = key_sequence(keystroke);

        let (batcher, flushes) = record_flushes(&sequence);

        assert_eq!(flushes.len(), 6);
        for batch in &flushes {
            assert_eq!(batch.len(), 1, "Each batch carries exactly one KEY event");
            assert!(batch[0].is_key());
        }
        assert_eq!(flushes[0][0], RawEvent::key(Key::KEY_LEFTSHIFT, KEY_PRESSED));
        assert_eq!(flushes[2][0], RawEvent::key(Key::KEY_5, KEY_PRESSED));
        assert_eq!(flushes[5][0], RawEvent::key(Key::KEY_LEFTCTRL, KEY_RELEASED));
        assert_eq!(batcher.pending(), 0);
    }

    #[test]
    fn test_batcher_holds_events_until_first_sync() {
        let (batcher, flushes) = record_flushes(&[
            RawEvent::key(Key::KEY_1, KEY_PRESSED),
            RawEvent::key(Key::KEY_2, KEY_PRESSED),
        ]);

        assert!(flushes.is_empty());
        assert_eq!(batcher.pending(), 2);
    }

    #[test]
    fn test_batcher_drops_batch_on_failed_flush() {
        let mut batcher = SyncBatcher::new();
        batcher.push(RawEvent::key(Key::KEY_1, KEY_PRESSED), |_| Ok(())).unwrap();

        let result = batcher.push(RawEvent::sync(), |_| {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "uinput closed"))
        });

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(batcher.pending(), 0);
    }

    // Integration test - requires write access to /dev/uinput
    #[test]
    #[ignore]
    fn test_create_with_real_uinput() {
        let mut keyboard = VirtualKeyboard::create("deckbd-test", &[Key::KEY_1]).unwrap();
        assert_eq!(keyboard.name(), "deckbd-test");

        keyboard.write_event(RawEvent::key(Key::KEY_1, 1)).unwrap();
        keyboard.write_event(RawEvent::sync()).unwrap();
        keyboard.write_event(RawEvent::key(Key::KEY_1, 0)).unwrap();
        keyboard.write_event(RawEvent::sync()).unwrap();
    }
}
