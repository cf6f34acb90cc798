//! Shared access to one protocol instance.
//!
//! Writers are serialized behind a single lock, so concurrent callers see the
//! same strictly sequential history a single caller would. Readers may run
//! alongside each other but never alongside a writer.
//!
//! The protocol keeps every committed event until it is drained. A handle
//! that lives for a whole session should call [`ProtocolHandle::take_events`]
//! after each batch of writes, or memory grows with the event history.

use crate::protocol::Protocol;
use moneta_core::Event;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ProtocolHandle {
    inner: Arc<RwLock<Protocol>>,
}

impl ProtocolHandle {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            inner: Arc::new(RwLock::new(protocol)),
        }
    }

    /// Run one or more operations under the write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut Protocol) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn read<R>(&self, f: impl FnOnce(&Protocol) -> R) -> R {
        f(&self.inner.read())
    }

    /// Drain committed events; later calls only see newer events.
    pub fn take_events(&self) -> Vec<Event> {
        self.inner.write().take_events()
    }
}
