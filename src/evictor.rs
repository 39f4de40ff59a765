//! Background eviction thread.

use crate::cache::CacheCore;
use crossbeam::channel::{bounded, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

enum Signal {
    Run,
    Shutdown,
}

/// A dedicated thread that runs eviction passes in response to "usage
/// exceeded" signals, so admissions never pay eviction latency.
///
/// The channel is bounded to one slot: a signal raised while a pass is
/// already pending coalesces into it.
#[derive(Debug)]
pub(crate) struct EvictionThread {
    tx: Sender<Signal>,
    handle: Option<JoinHandle<()>>,
}

impl EvictionThread {
    /// Spawns the thread. It holds its own reference to the core and runs
    /// until `shutdown`.
    pub fn spawn(core: Arc<CacheCore>) -> Self {
        let (tx, rx) = bounded(1);
        let handle = std::thread::Builder::new()
            .name("blockcache-evictor".to_string())
            .spawn(move || {
                while let Ok(Signal::Run) = rx.recv() {
                    core.evict();
                }
                log::debug!("eviction thread exiting");
            })
            .expect("failed to spawn eviction thread");
        Self { tx, handle: Some(handle) }
    }

    /// Requests an eviction pass. Never blocks; a full queue means a pass
    /// is already pending and this signal coalesces into it.
    pub fn trigger(&self) {
        let _ = self.tx.try_send(Signal::Run);
    }

    /// Stops the thread and waits for any in-flight pass to finish.
    pub fn shutdown(&mut self) {
        let _ = self.tx.send(Signal::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EvictionThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}
