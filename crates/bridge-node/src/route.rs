//! Output routes
//!
//! An output route is the host-side destination of one channel's samples
//! (an outlet, in dataflow terms). Routes are created when the node is
//! constructed and destroyed when it is torn down, whether or not their
//! channel ever attached.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::trace;

/// A sample delivered to a host outlet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Slot index of the producing channel
    pub channel: usize,
    /// Voltage ratio reported by the device
    pub value: f64,
}

/// Destination of one channel's samples
pub trait OutputRoute: Send {
    /// Forward one value; must not block
    fn emit(&self, value: f64);

    /// Release the route. Consumes it, so it runs at most once.
    fn destroy(self: Box<Self>) {}
}

/// Creates the output routes of a node, one per slot
pub trait RouteFactory: Send + Sync {
    fn create_route(&self, index: usize) -> Box<dyn OutputRoute>;
}

/// Output route backed by an unbounded tokio channel
///
/// Destroying the route drops the sender, so the receiving side observes
/// the outlet closing.
pub struct ChannelRoute {
    channel: usize,
    tx: mpsc::UnboundedSender<Sample>,
}

impl ChannelRoute {
    /// Create a route and the receiver for its samples
    pub fn new(channel: usize) -> (Self, mpsc::UnboundedReceiver<Sample>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { channel, tx }, rx)
    }
}

impl OutputRoute for ChannelRoute {
    fn emit(&self, value: f64) {
        let sample = Sample {
            channel: self.channel,
            value,
        };
        if self.tx.send(sample).is_err() {
            trace!("Outlet {} has no receiver, sample dropped", self.channel);
        }
    }
}

/// Factory producing [`ChannelRoute`]s and keeping their receivers
///
/// The host collects each outlet's receiver with [`take_receiver`](Self::take_receiver)
/// after constructing the node.
#[derive(Default)]
pub struct ChannelRouteFactory {
    receivers: Mutex<HashMap<usize, mpsc::UnboundedReceiver<Sample>>>,
}

impl ChannelRouteFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the receiver of an outlet
    pub fn take_receiver(&self, index: usize) -> Option<mpsc::UnboundedReceiver<Sample>> {
        self.receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&index)
    }

    /// Take every pending receiver, ordered by outlet index
    pub fn take_receivers(&self) -> Vec<(usize, mpsc::UnboundedReceiver<Sample>)> {
        let mut receivers: Vec<_> = self
            .receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        receivers.sort_by_key(|(index, _)| *index);
        receivers
    }
}

impl RouteFactory for ChannelRouteFactory {
    fn create_route(&self, index: usize) -> Box<dyn OutputRoute> {
        let (route, rx) = ChannelRoute::new(index);
        self.receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index, rx);
        Box::new(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_route_delivers_in_order() {
        let (route, mut rx) = ChannelRoute::new(2);
        route.emit(0.1);
        route.emit(0.2);

        assert_eq!(rx.try_recv().unwrap(), Sample { channel: 2, value: 0.1 });
        assert_eq!(rx.try_recv().unwrap(), Sample { channel: 2, value: 0.2 });
    }

    #[test]
    fn test_destroy_closes_outlet() {
        let factory = ChannelRouteFactory::new();
        let route = factory.create_route(0);
        let mut rx = factory.take_receiver(0).unwrap();

        route.emit(1.0);
        route.destroy();

        assert_eq!(rx.try_recv().unwrap().value, 1.0);
        assert_eq!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        );
    }

    #[test]
    fn test_take_receivers_sorted() {
        let factory = ChannelRouteFactory::new();
        let _routes: Vec<_> = (0..3).rev().map(|i| factory.create_route(i)).collect();

        let indices: Vec<usize> = factory.take_receivers().into_iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(factory.take_receiver(1).is_none());
    }
}
