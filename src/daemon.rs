//! # Daemon Module
//!
//! The run loop: reads controller events, feeds them to the translator and
//! sends the resulting keystrokes to the virtual keyboard until shutdown.
//!
//! ## Loop Exit
//!
//! - Shutdown token cancelled: clean exit. A read already in flight is
//!   abandoned, so at most one read is started after the request.
//! - Controller gone (`ENODEV`): `DeviceLost`.
//! - Virtual keyboard write failure: `Emit`.
//!
//! Any other read error is logged and the loop carries on.

use tracing::{debug, info, warn};

use crate::controller::source::{is_device_lost, EventSource};
use crate::controller::translator::Translator;
use crate::error::{DeckbdError, Result};
use crate::output::emitter::KeyEmitter;
use crate::output::sink::KeySink;
use crate::shutdown::ShutdownToken;

/// Counters collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub events_read: u64,
    pub keystrokes_emitted: u64,
    pub read_errors: u64,
}

/// Owns both device ends and the translator for the lifetime of a run.
pub struct Remapper<E: EventSource, S: KeySink> {
    source: E,
    translator: Translator,
    emitter: KeyEmitter<S>,
    shutdown: ShutdownToken,
    stats: RunStats,
}

impl<E: EventSource, S: KeySink> Remapper<E, S> {
    pub fn new(source: E, translator: Translator, sink: S, shutdown: ShutdownToken) -> Self {
        Self {
            source,
            translator,
            emitter: KeyEmitter::new(sink),
            shutdown,
            stats: RunStats::default(),
        }
    }

    /// Runs until shutdown is requested or a fatal device error occurs.
    ///
    /// # Errors
    ///
    /// - `DeviceLost`: the controller disappeared
    /// - `Emit`: the virtual keyboard rejected a write
    pub async fn run(&mut self) -> Result<RunStats> {
        info!("Listening...");

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                result = self.source.next_event() => result,
            };

            match result {
                Ok(event) => {
                    self.stats.events_read += 1;
                    if !event.is_key() {
                        continue;
                    }

                    debug!(
                        "event type: {:x}, code: {:x}, value: {:x}",
                        event.kind.raw(),
                        event.code,
                        event.value
                    );

                    if let Some(keystroke) = self.translator.process_event(&event) {
                        self.emitter.emit(keystroke)?;
                        self.stats.keystrokes_emitted += 1;
                    }
                }
                Err(e) if is_device_lost(&e) => {
                    return Err(DeckbdError::DeviceLost(e.to_string()));
                }
                Err(e) => {
                    self.stats.read_errors += 1;
                    warn!("Failed to read controller event: {}", e);
                }
            }
        }

        Ok(self.stats)
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Releases the devices: virtual keyboard first, then the controller.
    pub fn close(self) {
        let Self {
            source, emitter, ..
        } = self;

        drop(emitter.into_sink());
        debug!("Virtual keyboard closed");

        drop(source);
        debug!("Controller closed");
    }
}
