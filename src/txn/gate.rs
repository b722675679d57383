//! Writer gate
//!
//! At most one transaction holds write rights at a time. Acquisition blocks
//! on a condition variable and wakes periodically to honor interruption and
//! the configured timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::store::{StoreError, StoreResult};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Exclusive write rights for one transaction at a time.
#[derive(Debug, Default)]
pub struct WriterGate {
    holder: Mutex<Option<u64>>,
    released: Condvar,
}

impl WriterGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `tx_id` holds the gate.
    ///
    /// Re-acquiring by the current holder succeeds immediately. Fails with
    /// `Interrupted` if `cancel` is raised or `timeout` elapses; a raised
    /// `cancel` flag is consumed.
    pub fn acquire(&self, tx_id: u64, timeout: Duration, cancel: &AtomicBool) -> StoreResult<()> {
        let deadline = Instant::now() + timeout;
        let mut holder = self.holder.lock();
        loop {
            match *holder {
                None => {
                    *holder = Some(tx_id);
                    return Ok(());
                }
                Some(current) if current == tx_id => return Ok(()),
                Some(_) => {}
            }

            if cancel.swap(false, Ordering::AcqRel) {
                return Err(StoreError::Interrupted(format!(
                    "transaction {} interrupted while waiting for write access",
                    tx_id
                )));
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(StoreError::Interrupted(format!(
                    "transaction {} timed out after {:?} waiting for write access",
                    tx_id, timeout
                )));
            }
            let wait = POLL_INTERVAL.min(deadline - now);
            self.released.wait_for(&mut holder, wait);
        }
    }

    /// Release the gate if `tx_id` holds it. Returns true if released.
    pub fn release(&self, tx_id: u64) -> bool {
        let mut holder = self.holder.lock();
        if *holder == Some(tx_id) {
            *holder = None;
            drop(holder);
            self.released.notify_one();
            true
        } else {
            false
        }
    }

    pub fn holder(&self) -> Option<u64> {
        *self.holder.lock()
    }
}
