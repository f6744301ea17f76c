//! Sensor node
//!
//! The single point through which a host drives the acquisition device.
//! A node owns a [`ChannelRegistry`], configures each slot's channel,
//! switches bridge excitation and gain, and releases everything on
//! teardown. Per-channel failures never stop the remaining channels from
//! being processed.

use std::sync::Arc;

use bridge_sdk::{BridgeGain, VoltageRatioSdk};
use tracing::{debug, error, info, warn};

use crate::channel::{ChannelHandle, ChannelState};
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::events::NodeEvent;
use crate::registry::ChannelRegistry;
use crate::route::RouteFactory;
use crate::router::SampleRouter;

/// Lifecycle state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Slots and routes allocated, no hardware touched
    Constructed,
    /// Configuration in progress
    Configuring,
    /// Every channel attached
    Ready,
    /// Some channels failed to attach
    PartiallyReady,
    /// Bridge enabled on at least one attached channel
    Streaming,
    /// All channels released and routes destroyed
    TornDown,
}

impl NodeState {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Constructed => "Constructed",
            Self::Configuring => "Configuring",
            Self::Ready => "Ready",
            Self::PartiallyReady => "Partially ready",
            Self::Streaming => "Streaming",
            Self::TornDown => "Torn down",
        }
    }
}

/// Per-channel outcome of an operation applied to every slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelReport {
    /// One entry per attempted slot, in slot order
    pub outcomes: Vec<(usize, Result<(), NodeError>)>,
}

impl ChannelReport {
    /// Number of slots attempted
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Check whether every slot succeeded
    pub fn is_ok(&self) -> bool {
        self.outcomes.iter().all(|(_, r)| r.is_ok())
    }

    /// Errors, in slot order
    pub fn errors(&self) -> impl Iterator<Item = &NodeError> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().err())
    }

    /// Slots that failed
    pub fn failed_channels(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(c, _)| *c)
            .collect()
    }

    /// Error reported for a slot
    pub fn error_for(&self, channel: usize) -> Option<&NodeError> {
        self.outcomes
            .iter()
            .find(|(c, _)| *c == channel)
            .and_then(|(_, r)| r.as_ref().err())
    }
}

/// A voltage-ratio sensor node with 1 to 4 inputs
pub struct SensorNode {
    sdk: Arc<dyn VoltageRatioSdk>,
    config: NodeConfig,
    registry: ChannelRegistry,
    num_inputs: usize,
    state: NodeState,
    event_buffer: Vec<NodeEvent>,
}

impl SensorNode {
    /// Construct a node with default configuration
    pub fn new(
        sdk: Arc<dyn VoltageRatioSdk>,
        requested: i64,
        routes: &dyn RouteFactory,
    ) -> Result<Self, NodeError> {
        Self::with_config(sdk, requested, routes, NodeConfig::default())
    }

    /// Construct a node
    ///
    /// Validates the channel count and allocates the slots and their
    /// output routes. No SDK call is made.
    pub fn with_config(
        sdk: Arc<dyn VoltageRatioSdk>,
        requested: i64,
        routes: &dyn RouteFactory,
        config: NodeConfig,
    ) -> Result<Self, NodeError> {
        let count = usize::try_from(requested).map_err(|_| {
            NodeError::InvalidArgument(format!("channel count must be positive, got {}", requested))
        })?;
        let registry = ChannelRegistry::new(count, routes)?;

        info!("Sensor node constructed with {} input(s)", count);
        Ok(Self {
            sdk,
            config,
            registry,
            num_inputs: count,
            state: NodeState::Constructed,
            event_buffer: Vec::new(),
        })
    }

    /// Number of inputs, fixed at construction
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// Current lifecycle state
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Node configuration
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Handle in a slot
    pub fn channel(&self, index: usize) -> Option<&ChannelHandle> {
        self.registry.get(index)
    }

    /// State of a slot's channel
    pub fn channel_state(&self, index: usize) -> Option<ChannelState> {
        self.registry.get(index).map(|c| c.state())
    }

    /// The channel registry
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// The router feeding this node's outlets
    pub fn router(&self) -> &Arc<SampleRouter> {
        self.registry.router()
    }

    /// Drain pending events
    pub fn drain_events(&mut self) -> Vec<NodeEvent> {
        std::mem::take(&mut self.event_buffer)
    }

    fn transition(&mut self, to: NodeState) {
        let from = self.state;
        if from != to {
            self.state = to;
            debug!("Node state {} -> {}", from.name(), to.name());
            self.event_buffer.push(NodeEvent::StateChanged { from, to });
        }
    }

    fn ensure_live(&self) -> Result<(), NodeError> {
        if self.state == NodeState::TornDown {
            Err(NodeError::TornDown)
        } else {
            Ok(())
        }
    }

    /// State implied by the channels' attach and bridge states
    fn settled_state(&self) -> NodeState {
        let streaming = self
            .registry
            .iter()
            .any(|c| c.is_attached() && c.bridge_enabled());

        if streaming {
            NodeState::Streaming
        } else if self.registry.attached_count() == self.num_inputs {
            NodeState::Ready
        } else {
            NodeState::PartiallyReady
        }
    }

    /// Configure every slot in increasing order
    ///
    /// Each slot is created, bound to the device input with its own index,
    /// registered with the router, given the change handler and opened. A
    /// failing slot is reported and the next one is still attempted.
    ///
    /// Running it again is allowed: attached slots are left alone, slots
    /// that failed to attach are opened again on their existing object, and
    /// slots whose creation failed are created again.
    pub fn configure(&mut self) -> Result<ChannelReport, NodeError> {
        self.ensure_live()?;
        self.transition(NodeState::Configuring);

        let mut report = ChannelReport::default();
        for index in 0..self.num_inputs {
            let result = self.configure_channel(index);
            match &result {
                Ok(()) => {}
                Err(e) => {
                    error!("Configure failed: {}", e);
                    self.event_buffer.push(NodeEvent::ChannelFailed {
                        channel: index,
                        error: e.clone(),
                    });
                }
            }
            report.outcomes.push((index, result));
        }

        let attached = self.registry.attached_count();
        info!(
            "Configuration finished: {}/{} channel(s) attached",
            attached, self.num_inputs
        );
        let settled = self.settled_state();
        self.transition(settled);
        Ok(report)
    }

    fn configure_channel(&mut self, index: usize) -> Result<(), NodeError> {
        let sdk = self.sdk.clone();
        let sdk = sdk.as_ref();
        let router = self.registry.router().clone();
        let timeout = self.config.attach_timeout();
        let num_inputs = self.num_inputs;
        let Some(handle) = self.registry.get_mut(index) else {
            return Err(NodeError::InvalidChannel {
                channel: index as i64,
                num_inputs,
            });
        };

        match handle.state() {
            ChannelState::Attached => {
                debug!("Channel {} already attached, skipping", index);
                return Ok(());
            }
            ChannelState::Closed => return Err(NodeError::TornDown),
            _ => {}
        }

        let id = handle.create(sdk)?;
        if handle.state() == ChannelState::Created {
            handle.bind_channel_number(sdk, index as i32)?;
            // Bind before installing so no sample arrives for an unknown slot
            router.bind(index, id);
            handle.install_change_handler(sdk, router.handler())?;
        }
        handle.open(sdk, timeout)?;

        self.event_buffer
            .push(NodeEvent::ChannelAttached { channel: index, id });
        self.apply_attach_settings(index);
        Ok(())
    }

    /// Apply the configured gain and excitation to a freshly attached
    /// channel. Failures are reported as `CommandFailed` events and leave
    /// the channel attached.
    fn apply_attach_settings(&mut self, index: usize) {
        if let Some(gain) = self.config.initial_gain {
            let _ = self.apply_gain(index, gain);
        }
        if self.config.enable_on_attach {
            let _ = self.apply_bridge_enabled(index, true);
        }
    }

    fn apply_bridge_enabled(&mut self, index: usize, on: bool) -> Result<(), NodeError> {
        let sdk = self.sdk.clone();
        let result = match self.registry.get_mut(index) {
            Some(handle) => handle.set_bridge_enabled(sdk.as_ref(), on),
            None => return Ok(()),
        };

        match &result {
            Ok(()) => self.event_buffer.push(NodeEvent::BridgeEnabled {
                channel: index,
                enabled: on,
            }),
            Err(e) => {
                warn!("{}", e);
                self.event_buffer.push(NodeEvent::CommandFailed {
                    channel: index,
                    error: e.clone(),
                });
            }
        }
        result
    }

    fn apply_gain(&mut self, index: usize, gain: BridgeGain) -> Result<(), NodeError> {
        let sdk = self.sdk.clone();
        let result = match self.registry.get_mut(index) {
            Some(handle) => handle.set_gain(sdk.as_ref(), gain),
            None => return Ok(()),
        };

        match &result {
            Ok(()) => {
                info!("Channel {} gain set to {}", index, gain);
                self.event_buffer
                    .push(NodeEvent::GainApplied { channel: index, gain });
            }
            Err(e) => {
                warn!("{}", e);
                self.event_buffer.push(NodeEvent::CommandFailed {
                    channel: index,
                    error: e.clone(),
                });
            }
        }
        result
    }

    /// Switch bridge excitation on every slot, attached or not
    ///
    /// Per-channel failures (including `NotAttached`) are reported in the
    /// returned report; the call itself only fails after teardown.
    pub fn set_bridge_enabled(&mut self, on: bool) -> Result<ChannelReport, NodeError> {
        self.ensure_live()?;

        let mut report = ChannelReport::default();
        for index in 0..self.num_inputs {
            let result = self.apply_bridge_enabled(index, on);
            report.outcomes.push((index, result));
        }

        info!(
            "Bridge {} on {}/{} channel(s)",
            if on { "enabled" } else { "disabled" },
            report.attempted() - report.failed_channels().len(),
            self.num_inputs
        );
        if self.state != NodeState::Constructed {
            let settled = self.settled_state();
            self.transition(settled);
        }
        Ok(report)
    }

    /// Apply a gain level to one channel
    ///
    /// The channel index and gain level are validated before any SDK call.
    pub fn set_gain(&mut self, channel: i64, level: i64) -> Result<(), NodeError> {
        self.ensure_live()?;

        let index = usize::try_from(channel)
            .ok()
            .filter(|c| *c < self.num_inputs)
            .ok_or(NodeError::InvalidChannel {
                channel,
                num_inputs: self.num_inputs,
            })?;
        let gain = BridgeGain::from_level(level)?;

        self.apply_gain(index, gain)
    }

    /// Diagnostic trigger; no hardware effect
    pub fn signal(&mut self) {
        info!(
            "Sensor node alive: {} input(s), {}",
            self.num_inputs,
            self.state.name()
        );
        self.event_buffer.push(NodeEvent::Heartbeat);
    }

    /// Release every channel and destroy every route
    ///
    /// Channels are released in slot order whatever their state, then the
    /// routes are destroyed in slot order. Errors are collected and
    /// returned; they never stop the teardown. A second call does nothing.
    pub fn tear_down(&mut self) -> Vec<NodeError> {
        if self.state == NodeState::TornDown {
            return Vec::new();
        }

        let sdk = self.sdk.clone();
        let router = self.registry.router().clone();
        let mut errors = Vec::new();

        for handle in self.registry.iter_mut() {
            let index = handle.index();
            let had_hardware = handle.hardware().is_some();
            router.unbind(index);
            errors.extend(handle.teardown(sdk.as_ref()));
            if had_hardware {
                self.event_buffer
                    .push(NodeEvent::ChannelClosed { channel: index });
            }
        }

        let destroyed = router.destroy_routes();
        if errors.is_empty() {
            info!("Sensor node torn down ({} outlet(s) destroyed)", destroyed);
        } else {
            warn!(
                "Sensor node torn down with {} error(s) ({} outlet(s) destroyed)",
                errors.len(),
                destroyed
            );
        }

        self.transition(NodeState::TornDown);
        errors
    }
}

impl Drop for SensorNode {
    fn drop(&mut self) {
        if self.state != NodeState::TornDown {
            let errors = self.tear_down();
            if !errors.is_empty() {
                warn!("{} error(s) while dropping sensor node", errors.len());
            }
        }
    }
}

impl std::fmt::Debug for SensorNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorNode")
            .field("num_inputs", &self.num_inputs)
            .field("state", &self.state)
            .field("channels", &self.registry.states())
            .field("sdk", &"<sdk>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::ChannelRouteFactory;
    use bridge_sim::{SimulatedSdk, SimulationConfig};

    fn node(sim: &Arc<SimulatedSdk>, count: i64) -> SensorNode {
        SensorNode::new(sim.clone(), count, &ChannelRouteFactory::new()).unwrap()
    }

    #[test]
    fn test_construct_touches_no_hardware() {
        let sim = Arc::new(SimulatedSdk::new());
        let node = node(&sim, 3);
        assert_eq!(node.num_inputs(), 3);
        assert_eq!(node.state(), NodeState::Constructed);
        assert!(sim.calls().is_empty());
    }

    #[test]
    fn test_construct_rejects_bad_count() {
        let sim = Arc::new(SimulatedSdk::new());
        for count in [-1, 0, 5, 100] {
            let result = SensorNode::new(sim.clone(), count, &ChannelRouteFactory::new());
            assert!(matches!(result, Err(NodeError::InvalidArgument(_))));
        }
        assert!(sim.calls().is_empty());
    }

    #[test]
    fn test_configure_all_attached() {
        let sim = Arc::new(SimulatedSdk::new());
        let mut node = node(&sim, 2);

        let report = node.configure().unwrap();
        assert!(report.is_ok());
        assert_eq!(node.state(), NodeState::Ready);

        let events = node.drain_events();
        assert_eq!(
            events.first(),
            Some(&NodeEvent::StateChanged {
                from: NodeState::Constructed,
                to: NodeState::Configuring
            })
        );
        assert_eq!(
            events.last(),
            Some(&NodeEvent::StateChanged {
                from: NodeState::Configuring,
                to: NodeState::Ready
            })
        );
    }

    #[test]
    fn test_streaming_transitions() {
        let sim = Arc::new(SimulatedSdk::new());
        let mut node = node(&sim, 1);
        node.configure().unwrap();

        assert!(node.set_bridge_enabled(true).unwrap().is_ok());
        assert_eq!(node.state(), NodeState::Streaming);

        assert!(node.set_bridge_enabled(false).unwrap().is_ok());
        assert_eq!(node.state(), NodeState::Ready);
    }

    #[test]
    fn test_enable_before_configure_reports_not_attached() {
        let sim = Arc::new(SimulatedSdk::new());
        let mut node = node(&sim, 2);

        let report = node.set_bridge_enabled(true).unwrap();
        assert_eq!(report.failed_channels(), vec![0, 1]);
        assert_eq!(node.state(), NodeState::Constructed);
        assert!(sim.calls().is_empty());
    }

    #[test]
    fn test_attach_settings_applied() {
        let sim = Arc::new(SimulatedSdk::new());
        let config = NodeConfig {
            initial_gain: Some(BridgeGain::X64),
            enable_on_attach: true,
            ..Default::default()
        };
        let mut node =
            SensorNode::with_config(sim.clone(), 2, &ChannelRouteFactory::new(), config).unwrap();

        node.configure().unwrap();
        assert_eq!(node.state(), NodeState::Streaming);
        for channel in node.registry().iter() {
            assert_eq!(channel.gain(), Some(BridgeGain::X64));
            assert!(channel.bridge_enabled());
        }
    }

    #[test]
    fn test_attach_settings_failure_keeps_channel_configured() {
        let sim = Arc::new(SimulatedSdk::with_config(SimulationConfig {
            command_failures: vec![(1, 0x09)],
            ..Default::default()
        }));
        let config = NodeConfig {
            initial_gain: Some(BridgeGain::X8),
            ..Default::default()
        };
        let mut node =
            SensorNode::with_config(sim.clone(), 2, &ChannelRouteFactory::new(), config).unwrap();

        let report = node.configure().unwrap();
        assert!(report.is_ok());
        assert_eq!(node.state(), NodeState::Ready);
        assert_eq!(node.channel_state(1), Some(ChannelState::Attached));
        assert_eq!(node.channel(0).unwrap().gain(), Some(BridgeGain::X8));
        assert_eq!(node.channel(1).unwrap().gain(), None);

        let failures: Vec<_> = node
            .drain_events()
            .into_iter()
            .filter(NodeEvent::is_error)
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0],
            NodeEvent::CommandFailed {
                channel: 1,
                error: NodeError::HardwareCommand { code: 0x09, .. }
            }
        ));
    }

    #[test]
    fn test_set_gain_applies() {
        let sim = Arc::new(SimulatedSdk::new());
        let mut node = node(&sim, 2);
        node.configure().unwrap();

        node.set_gain(1, 8).unwrap();
        assert_eq!(node.channel(1).unwrap().gain(), Some(BridgeGain::X128));
        assert_eq!(node.channel(0).unwrap().gain(), None);
    }

    #[test]
    fn test_signal_has_no_hardware_effect() {
        let sim = Arc::new(SimulatedSdk::new());
        let mut node = node(&sim, 1);
        node.signal();
        assert!(sim.calls().is_empty());
        assert_eq!(node.drain_events(), vec![NodeEvent::Heartbeat]);
    }

    #[test]
    fn test_operations_after_teardown() {
        let sim = Arc::new(SimulatedSdk::new());
        let mut node = node(&sim, 1);
        node.configure().unwrap();
        assert!(node.tear_down().is_empty());

        assert_eq!(node.configure(), Err(NodeError::TornDown));
        assert_eq!(node.set_bridge_enabled(true), Err(NodeError::TornDown));
        assert_eq!(node.set_gain(0, 1), Err(NodeError::TornDown));
        assert!(node.tear_down().is_empty());
    }

    #[test]
    fn test_drop_releases_hardware() {
        let sim = Arc::new(SimulatedSdk::with_config(SimulationConfig {
            timeout_channels: vec![1],
            ..Default::default()
        }));
        {
            let mut node = node(&sim, 2);
            node.configure().unwrap();
        }

        for id in sim.created() {
            assert_eq!(sim.close_count(id), 1);
            assert_eq!(sim.delete_count(id), 1);
        }
    }
}
