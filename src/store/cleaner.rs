//! Background snapshot cleaner
//!
//! A dedicated thread that waits for a clean request, lets further commits
//! accumulate for `cleanup_delay`, then runs one clean pass at the current
//! floor. It holds only a weak reference to the store and exits when the
//! store is dropped or closed.

use std::io;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::memory_store::StoreInner;
use crate::observability::{log_event, log_event_with_fields, Event, Logger};

#[derive(Debug, Default)]
struct SignalState {
    requested: bool,
    shutdown: bool,
}

/// Request/shutdown signal shared by committers and the cleaner thread.
#[derive(Debug, Default)]
pub(crate) struct CleanupSignal {
    state: Mutex<SignalState>,
    condvar: Condvar,
}

impl CleanupSignal {
    /// Ask for a clean pass. Returns false if one is already pending.
    pub(crate) fn request(&self) -> bool {
        let mut state = self.state.lock();
        if state.requested || state.shutdown {
            return false;
        }
        state.requested = true;
        self.condvar.notify_all();
        true
    }

    pub(crate) fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.condvar.notify_all();
    }

    /// Block until a pass is requested. Returns false on shutdown.
    fn wait_for_request(&self) -> bool {
        let mut state = self.state.lock();
        while !state.requested && !state.shutdown {
            self.condvar.wait(&mut state);
        }
        !state.shutdown
    }

    /// Sleep up to `delay`, waking early on shutdown. Returns true on
    /// shutdown.
    fn wait_delay(&self, delay: Duration) -> bool {
        let mut state = self.state.lock();
        if !state.shutdown && !delay.is_zero() {
            self.condvar.wait_while_for(&mut state, |s| !s.shutdown, delay);
        }
        state.shutdown
    }

    fn take_request(&self) -> bool {
        std::mem::take(&mut self.state.lock().requested)
    }
}

/// Handle to the cleaner thread. Stops and joins it on drop.
#[derive(Debug)]
pub(crate) struct SnapshotCleaner {
    signal: Arc<CleanupSignal>,
    handle: Option<JoinHandle<()>>,
}

impl SnapshotCleaner {
    pub(crate) fn start(
        store: Weak<StoreInner>,
        signal: Arc<CleanupSignal>,
        delay: Duration,
    ) -> io::Result<Self> {
        let thread_signal = Arc::clone(&signal);
        let handle = std::thread::Builder::new()
            .name("aerordf-cleaner".into())
            .spawn(move || {
                log_event_with_fields(
                    Event::CleanerStart,
                    &[("delay_ms", &delay.as_millis().to_string())],
                );
                while thread_signal.wait_for_request() {
                    if thread_signal.wait_delay(delay) {
                        break;
                    }
                    if !thread_signal.take_request() {
                        continue;
                    }
                    let Some(store) = store.upgrade() else {
                        break;
                    };
                    if let Err(e) = store.clean_to_floor() {
                        Logger::error(
                            Event::CleanComplete.as_str(),
                            &[("code", e.code()), ("error", &e.to_string())],
                        );
                    }
                }
                log_event(Event::CleanerStop);
            })?;

        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }

    /// Signal the thread to stop and wait for it to finish.
    pub(crate) fn stop(&mut self) {
        self.signal.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SnapshotCleaner {
    fn drop(&mut self) {
        self.stop();
    }
}
