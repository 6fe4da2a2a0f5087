use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

/// Lifecycle of the record passed through a [`Handoff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage<T> {
    /// Nothing published; the producer may start a new record.
    Idle,
    /// A record is published and not yet taken.
    Ready(T),
    /// The consumer took the record and has not released it yet.
    Taken,
}

/// Single-producer, single-consumer handoff of one record at a time.
///
/// The producer publishes only from [`Stage::Idle`] and then waits for the
/// consumer to go through take and release; the consumer never waits.
#[derive(Debug)]
pub struct Handoff<T> {
    stage: Arc<Mutex<Stage<T>>>,
    idle: Arc<Notify>,
}

impl<T> Clone for Handoff<T> {
    fn clone(&self) -> Self {
        Self {
            stage: Arc::clone(&self.stage),
            idle: Arc::clone(&self.idle),
        }
    }
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Handoff<T> {
    pub fn new() -> Self {
        Self {
            stage: Arc::new(Mutex::new(Stage::Idle)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Function that publishes `record`, handing it back if the previous one is
    /// still outstanding.
    pub fn publish(&self, record: T) -> Result<(), T> {
        let mut stage = self.stage.lock();
        match *stage {
            Stage::Idle => {
                *stage = Stage::Ready(record);
                Ok(())
            }
            _ => Err(record),
        }
    }

    /// Function that takes the published record, if any, without waiting.
    pub fn try_take(&self) -> Option<T> {
        let mut stage = self.stage.lock();
        match std::mem::replace(&mut *stage, Stage::Taken) {
            Stage::Ready(record) => Some(record),
            previous => {
                *stage = previous;
                None
            }
        }
    }

    /// Function that ends the cycle of a taken record and wakes the producer.
    pub fn release(&self) {
        let mut stage = self.stage.lock();
        if matches!(*stage, Stage::Taken) {
            *stage = Stage::Idle;
            self.idle.notify_one();
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(*self.stage.lock(), Stage::Idle)
    }

    /// Function that waits until the producer may publish again.
    pub async fn idle(&self) {
        while !self.is_idle() {
            self.idle.notified().await;
        }
    }
}
