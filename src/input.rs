use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Unbounded FIFO of pending input bytes shared between a driver and the engine.
///
/// Clones share the same queue. The driver appends at any time; the engine
/// pops one byte per `,` instruction.
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    inner: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    bytes: Mutex<VecDeque<u8>>,
    available: Condvar,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.lock().extend(bytes.iter().copied());
        self.inner.available.notify_all();
    }

    /// Enqueue the UTF-8 bytes of `text`.
    pub fn push_str(&self, text: &str) {
        self.push_bytes(text.as_bytes());
    }

    pub fn pop(&self) -> Option<u8> {
        self.lock().pop_front()
    }

    /// Pop a byte, waiting up to `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<u8> {
        let guard = self.lock();
        let (mut guard, _) = self
            .inner
            .available
            .wait_timeout_while(guard, timeout, |q| q.is_empty())
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.pop_front()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a VecDeque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<u8>> {
        self.inner.bytes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
