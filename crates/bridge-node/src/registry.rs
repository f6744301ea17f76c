//! Channel registry
//!
//! Fixed-capacity, ordered set of channel handles owned by one node, with
//! the output route of each slot held by the node's [`SampleRouter`].
//! Slot `i` of the handles always corresponds to route `i`.

use std::sync::Arc;

use bridge_sdk::{ChannelId, MAX_CHANNELS};

use crate::channel::{ChannelHandle, ChannelState};
use crate::error::NodeError;
use crate::route::RouteFactory;
use crate::router::SampleRouter;

/// Ordered channel slots of a node
pub struct ChannelRegistry {
    channels: Vec<ChannelHandle>,
    router: Arc<SampleRouter>,
}

impl ChannelRegistry {
    /// Allocate `count` unconfigured slots and one route per slot
    pub fn new(count: usize, routes: &dyn RouteFactory) -> Result<Self, NodeError> {
        if !(1..=MAX_CHANNELS).contains(&count) {
            return Err(NodeError::InvalidArgument(format!(
                "channel count must be between 1 and {}, got {}",
                MAX_CHANNELS, count
            )));
        }

        let channels = (0..count).map(ChannelHandle::new).collect();
        let routes = (0..count).map(|i| routes.create_route(i)).collect();

        Ok(Self {
            channels,
            router: Arc::new(SampleRouter::new(routes)),
        })
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Check if there are no slots; never true once constructed
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Handle in a slot
    pub fn get(&self, index: usize) -> Option<&ChannelHandle> {
        self.channels.get(index)
    }

    /// Mutable handle in a slot
    pub fn get_mut(&mut self, index: usize) -> Option<&mut ChannelHandle> {
        self.channels.get_mut(index)
    }

    /// Iterate over handles in slot order
    pub fn iter(&self) -> impl Iterator<Item = &ChannelHandle> {
        self.channels.iter()
    }

    /// Iterate mutably over handles in slot order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChannelHandle> {
        self.channels.iter_mut()
    }

    /// The router holding this registry's output routes
    pub fn router(&self) -> &Arc<SampleRouter> {
        &self.router
    }

    /// Slot owning an SDK channel object
    pub fn slot_of(&self, id: ChannelId) -> Option<usize> {
        self.channels.iter().position(|c| c.hardware() == Some(id))
    }

    /// Per-slot states
    pub fn states(&self) -> Vec<ChannelState> {
        self.channels.iter().map(|c| c.state()).collect()
    }

    /// Number of attached slots
    pub fn attached_count(&self) -> usize {
        self.channels.iter().filter(|c| c.is_attached()).count()
    }
}
