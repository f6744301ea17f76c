//! Sample routing
//!
//! The [`SampleRouter`] sits between the SDK's delivery thread and the
//! node's output routes. Each callback names the SDK channel object that
//! produced the value; the router resolves it to a slot by identity and
//! forwards the value to that slot's route.
//!
//! Bindings and routes share one lock, so a callback never observes a slot
//! while the host thread is binding, unbinding or destroying it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bridge_sdk::{ChangeHandler, ChannelId};
use tracing::{debug, trace};

use crate::route::OutputRoute;

struct RouteTable {
    bindings: Vec<Option<ChannelId>>,
    routes: Vec<Option<Box<dyn OutputRoute>>>,
    forwarded: Vec<u64>,
    dropped: u64,
}

/// Forwards samples from SDK channel objects to per-slot output routes
pub struct SampleRouter {
    table: Mutex<RouteTable>,
}

impl SampleRouter {
    /// Create a router owning one route per slot
    pub fn new(routes: Vec<Box<dyn OutputRoute>>) -> Self {
        let slots = routes.len();
        Self {
            table: Mutex::new(RouteTable {
                bindings: vec![None; slots],
                routes: routes.into_iter().map(Some).collect(),
                forwarded: vec![0; slots],
                dropped: 0,
            }),
        }
    }

    fn table(&self) -> MutexGuard<'_, RouteTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.table().routes.len()
    }

    /// Check if there are no slots; never true for a constructed router
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Associate an SDK channel object with a slot
    pub fn bind(&self, index: usize, id: ChannelId) {
        let mut table = self.table();
        if let Some(slot) = table.bindings.get_mut(index) {
            *slot = Some(id);
            debug!("Slot {} bound to {:?}", index, id);
        }
    }

    /// Remove a slot's binding; later samples from that object are dropped
    pub fn unbind(&self, index: usize) -> Option<ChannelId> {
        self.table().bindings.get_mut(index).and_then(Option::take)
    }

    /// Slot currently bound to an SDK channel object
    pub fn slot_of(&self, id: ChannelId) -> Option<usize> {
        self.table().bindings.iter().position(|b| *b == Some(id))
    }

    /// Forward one sample
    ///
    /// Returns the slot it was delivered to, or `None` if the source is not
    /// bound or the slot's route is gone. Unmatched samples are not retried.
    pub fn route(&self, source: ChannelId, value: f64) -> Option<usize> {
        let mut table = self.table();
        let Some(index) = table.bindings.iter().position(|b| *b == Some(source)) else {
            table.dropped += 1;
            debug!("Dropping sample from unbound {:?}", source);
            return None;
        };

        let delivered = match &table.routes[index] {
            Some(route) => {
                route.emit(value);
                true
            }
            None => false,
        };

        if delivered {
            table.forwarded[index] += 1;
            trace!("Slot {} <- {}", index, value);
            Some(index)
        } else {
            table.dropped += 1;
            debug!("Dropping sample for destroyed outlet {}", index);
            None
        }
    }

    /// Destroy every remaining route in slot order, returning how many were destroyed
    pub fn destroy_routes(&self) -> usize {
        let mut table = self.table();
        table.bindings.iter_mut().for_each(|b| *b = None);

        let mut destroyed = 0;
        for route in table.routes.iter_mut() {
            if let Some(route) = route.take() {
                route.destroy();
                destroyed += 1;
            }
        }
        destroyed
    }

    /// Number of samples forwarded to a slot
    pub fn forwarded(&self, index: usize) -> u64 {
        self.table().forwarded.get(index).copied().unwrap_or(0)
    }

    /// Number of samples that matched no live slot
    pub fn dropped(&self) -> u64 {
        self.table().dropped
    }

    /// Build the SDK callback for this router
    ///
    /// The callback holds only a weak reference: once the router is gone,
    /// late samples are discarded.
    pub fn handler(self: &Arc<Self>) -> ChangeHandler {
        let router = Arc::downgrade(self);
        Arc::new(move |source, value| {
            if let Some(router) = router.upgrade() {
                router.route(source, value);
            }
        })
    }
}
