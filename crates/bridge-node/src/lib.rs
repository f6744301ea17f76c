//! Voltage-Ratio Sensor Node
//!
//! This crate provides the channel lifecycle manager that sits between a
//! voltage-ratio acquisition device and a dataflow host.
//!
//! # Architecture
//!
//! A [`SensorNode`] owns a [`ChannelRegistry`] of 1 to 4 [`ChannelHandle`]s
//! plus one output route per slot. Control flows from the host through the
//! node into the SDK; data flows back from the SDK's delivery thread through
//! the [`SampleRouter`] to the slot's route:
//!
//! - **Configure** creates, binds, registers and opens every slot, isolating
//!   per-channel failures
//! - **SetBridgeEnabled / SetGain** reconfigure live channels without
//!   restarting them
//! - **TearDown** releases every SDK object exactly once and destroys every
//!   route exactly once
//!
//! Hosts that instantiate objects from text use the [`ClassTable`], which
//! maps the `vratio` class name to its constructor.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use bridge_node::{ChannelRouteFactory, SensorNode};
//! use bridge_sim::SimulatedSdk;
//!
//! let sim = Arc::new(SimulatedSdk::new());
//! let outlets = ChannelRouteFactory::new();
//! let mut node = SensorNode::new(sim.clone(), 2, &outlets).unwrap();
//! let mut out0 = outlets.take_receiver(0).unwrap();
//!
//! node.configure().unwrap();
//! let ch0 = node.channel(0).and_then(|c| c.hardware()).unwrap();
//! sim.inject(ch0, 0.35);
//!
//! assert_eq!(out0.try_recv().unwrap().value, 0.35);
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod node;
pub mod registry;
pub mod route;
pub mod router;

pub use channel::{ChannelHandle, ChannelState};
pub use config::NodeConfig;
pub use error::NodeError;
pub use events::NodeEvent;
pub use host::{
    parse_atoms, Atom, ClassContext, ClassTable, Constructor, HostObject, ObjectClass,
    SensorObject, SENSOR_CLASS,
};
pub use node::{ChannelReport, NodeState, SensorNode};
pub use registry::ChannelRegistry;
pub use route::{ChannelRoute, ChannelRouteFactory, OutputRoute, RouteFactory, Sample};
pub use router::SampleRouter;
