//! Simulated acquisition SDK
//!
//! Keeps every channel object in memory, answers SDK calls the way the
//! device library does, and records each call so tests can assert on the
//! exact sequence of hardware commands.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bridge_sdk::{BridgeGain, ChangeHandler, ChannelId, ErrorCode, SdkResult, VoltageRatioSdk};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Fault injection settings for a simulated device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Channel numbers whose open always times out
    #[serde(default)]
    pub timeout_channels: Vec<i32>,
    /// Creation attempts (0-based, counted across the whole SDK) that fail
    #[serde(default)]
    pub failed_creations: Vec<usize>,
    /// Channel numbers whose enable/gain commands fail with the given code
    #[serde(default)]
    pub command_failures: Vec<(i32, u32)>,
    /// Channel numbers whose close call fails
    #[serde(default)]
    pub close_failures: Vec<i32>,
}

/// A single recorded SDK call
#[derive(Debug, Clone, PartialEq)]
pub enum SdkCall {
    Create(Option<ChannelId>),
    SetChannel { id: ChannelId, channel: i32 },
    SetHandler { id: ChannelId, installed: bool },
    Open { id: ChannelId, timeout: Duration },
    SetBridgeEnabled { id: ChannelId, enabled: bool },
    SetBridgeGain { id: ChannelId, gain: BridgeGain },
    Close(ChannelId),
    Delete(ChannelId),
}

impl SdkCall {
    /// Channel object the call targeted, if any
    pub fn channel_id(&self) -> Option<ChannelId> {
        match self {
            SdkCall::Create(id) => *id,
            SdkCall::SetChannel { id, .. }
            | SdkCall::SetHandler { id, .. }
            | SdkCall::Open { id, .. }
            | SdkCall::SetBridgeEnabled { id, .. }
            | SdkCall::SetBridgeGain { id, .. } => Some(*id),
            SdkCall::Close(id) | SdkCall::Delete(id) => Some(*id),
        }
    }

    /// Check if this call sends a command to the device hardware
    pub fn is_hardware_command(&self) -> bool {
        matches!(
            self,
            SdkCall::Open { .. }
                | SdkCall::SetBridgeEnabled { .. }
                | SdkCall::SetBridgeGain { .. }
                | SdkCall::Close(_)
        )
    }
}

#[derive(Default)]
struct SimChannel {
    channel: Option<i32>,
    handler: Option<ChangeHandler>,
    attached: bool,
    bridge_enabled: bool,
    gain: Option<BridgeGain>,
    deleted: bool,
}

struct SimState {
    config: SimulationConfig,
    next_id: u64,
    creations: usize,
    channels: HashMap<ChannelId, SimChannel>,
    calls: Vec<SdkCall>,
}

/// In-memory voltage-ratio SDK
pub struct SimulatedSdk {
    state: Mutex<SimState>,
}

impl SimulatedSdk {
    /// Create a simulator where every channel attaches
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    /// Create a simulator with fault injection
    pub fn with_config(config: SimulationConfig) -> Self {
        Self {
            state: Mutex::new(SimState {
                config,
                next_id: 1,
                creations: 0,
                channels: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the fault injection settings
    pub fn set_config(&self, config: SimulationConfig) {
        self.state().config = config;
    }

    /// Snapshot of every call made so far
    pub fn calls(&self) -> Vec<SdkCall> {
        self.state().calls.clone()
    }

    /// Forget the recorded calls
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Number of recorded calls that sent a hardware command
    pub fn hardware_command_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.is_hardware_command())
            .count()
    }

    /// Channel objects successfully created so far, in creation order
    pub fn created(&self) -> Vec<ChannelId> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                SdkCall::Create(Some(id)) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Number of close calls issued for a channel object
    pub fn close_count(&self, id: ChannelId) -> usize {
        self.count(|c| *c == SdkCall::Close(id))
    }

    /// Number of delete calls issued for a channel object
    pub fn delete_count(&self, id: ChannelId) -> usize {
        self.count(|c| *c == SdkCall::Delete(id))
    }

    fn count(&self, pred: impl Fn(&SdkCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    /// Channel object currently bound to a physical channel number
    pub fn channel_for(&self, channel: i32) -> Option<ChannelId> {
        self.state()
            .channels
            .iter()
            .find(|(_, ch)| !ch.deleted && ch.channel == Some(channel))
            .map(|(id, _)| *id)
    }

    /// Check whether a channel object is attached
    pub fn is_attached(&self, id: ChannelId) -> bool {
        self.state()
            .channels
            .get(&id)
            .is_some_and(|ch| ch.attached)
    }

    /// Check whether a channel object has a change handler installed
    pub fn has_handler(&self, id: ChannelId) -> bool {
        self.state()
            .channels
            .get(&id)
            .is_some_and(|ch| ch.handler.is_some())
    }

    /// Bridge enable state of a channel object
    pub fn bridge_enabled(&self, id: ChannelId) -> bool {
        self.state()
            .channels
            .get(&id)
            .is_some_and(|ch| ch.bridge_enabled)
    }

    /// Gain last applied to a channel object
    pub fn gain(&self, id: ChannelId) -> Option<BridgeGain> {
        self.state().channels.get(&id).and_then(|ch| ch.gain)
    }

    /// Attached channels with bridge excitation on, with their gain
    pub fn streaming_channels(&self) -> Vec<(ChannelId, i32, BridgeGain)> {
        let state = self.state();
        let mut out: Vec<_> = state
            .channels
            .iter()
            .filter(|(_, ch)| ch.attached && ch.bridge_enabled && !ch.deleted)
            .map(|(id, ch)| {
                (
                    *id,
                    ch.channel.unwrap_or(0),
                    ch.gain.unwrap_or(BridgeGain::X1),
                )
            })
            .collect();
        out.sort_by_key(|(_, channel, _)| *channel);
        out
    }

    /// Deliver a sample as the device would, on the calling thread
    ///
    /// Returns false when the channel object has no handler or is not
    /// attached. The handler runs without the simulator lock held.
    pub fn inject(&self, id: ChannelId, value: f64) -> bool {
        let handler = {
            let state = self.state();
            match state.channels.get(&id) {
                Some(ch) if ch.attached && !ch.deleted => ch.handler.clone(),
                _ => None,
            }
        };

        match handler {
            Some(handler) => {
                trace!("Delivering {} on {:?}", value, id);
                handler(id, value);
                true
            }
            None => false,
        }
    }

    /// Deliver a sample on whichever object is bound to a channel number
    pub fn inject_channel(&self, channel: i32, value: f64) -> bool {
        match self.channel_for(channel) {
            Some(id) => self.inject(id, value),
            None => false,
        }
    }

    fn live<'a>(state: &'a mut SimState, id: ChannelId) -> SdkResult<&'a mut SimChannel> {
        match state.channels.get_mut(&id) {
            Some(ch) if !ch.deleted => Ok(ch),
            Some(_) => Err(ErrorCode::CLOSED),
            None => Err(ErrorCode::INVALIDARG),
        }
    }

    fn command_failure(config: &SimulationConfig, channel: Option<i32>) -> Option<ErrorCode> {
        let channel = channel?;
        config
            .command_failures
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, code)| ErrorCode(*code))
    }
}

impl Default for SimulatedSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl VoltageRatioSdk for SimulatedSdk {
    fn create(&self) -> SdkResult<ChannelId> {
        let mut state = self.state();
        let attempt = state.creations;
        state.creations += 1;

        if state.config.failed_creations.contains(&attempt) {
            state.calls.push(SdkCall::Create(None));
            debug!("Simulated creation failure on attempt {}", attempt);
            return Err(ErrorCode::NOMEMORY);
        }

        let id = ChannelId(state.next_id);
        state.next_id += 1;
        state.channels.insert(id, SimChannel::default());
        state.calls.push(SdkCall::Create(Some(id)));
        Ok(id)
    }

    fn set_channel(&self, id: ChannelId, channel: i32) -> SdkResult<()> {
        let mut state = self.state();
        state.calls.push(SdkCall::SetChannel { id, channel });
        let ch = Self::live(&mut state, id)?;
        if ch.attached {
            return Err(ErrorCode::BUSY);
        }
        ch.channel = Some(channel);
        Ok(())
    }

    fn set_on_change_handler(
        &self,
        id: ChannelId,
        handler: Option<ChangeHandler>,
    ) -> SdkResult<()> {
        let mut state = self.state();
        state.calls.push(SdkCall::SetHandler {
            id,
            installed: handler.is_some(),
        });
        Self::live(&mut state, id)?.handler = handler;
        Ok(())
    }

    fn open_wait_for_attachment(&self, id: ChannelId, timeout: Duration) -> SdkResult<()> {
        let mut state = self.state();
        state.calls.push(SdkCall::Open { id, timeout });
        let timeouts: HashSet<i32> = state.config.timeout_channels.iter().copied().collect();
        let ch = Self::live(&mut state, id)?;

        if ch.channel.is_some_and(|c| timeouts.contains(&c)) {
            debug!("Simulated attach timeout on {:?}", id);
            return Err(ErrorCode::TIMEOUT);
        }
        ch.attached = true;
        Ok(())
    }

    fn set_bridge_enabled(&self, id: ChannelId, enabled: bool) -> SdkResult<()> {
        let mut state = self.state();
        state.calls.push(SdkCall::SetBridgeEnabled { id, enabled });
        let config = state.config.clone();
        let ch = Self::live(&mut state, id)?;
        if !ch.attached {
            return Err(ErrorCode::NOTATTACHED);
        }
        if let Some(code) = Self::command_failure(&config, ch.channel) {
            return Err(code);
        }
        ch.bridge_enabled = enabled;
        Ok(())
    }

    fn set_bridge_gain(&self, id: ChannelId, gain: BridgeGain) -> SdkResult<()> {
        let mut state = self.state();
        state.calls.push(SdkCall::SetBridgeGain { id, gain });
        let config = state.config.clone();
        let ch = Self::live(&mut state, id)?;
        if !ch.attached {
            return Err(ErrorCode::NOTATTACHED);
        }
        if let Some(code) = Self::command_failure(&config, ch.channel) {
            return Err(code);
        }
        ch.gain = Some(gain);
        Ok(())
    }

    fn close(&self, id: ChannelId) -> SdkResult<()> {
        let mut state = self.state();
        state.calls.push(SdkCall::Close(id));
        let close_failures = state.config.close_failures.clone();
        let ch = Self::live(&mut state, id)?;
        ch.attached = false;
        ch.bridge_enabled = false;
        if ch.channel.is_some_and(|c| close_failures.contains(&c)) {
            return Err(ErrorCode::IO);
        }
        Ok(())
    }

    fn delete(&self, id: ChannelId) -> SdkResult<()> {
        let mut state = self.state();
        state.calls.push(SdkCall::Delete(id));
        let ch = Self::live(&mut state, id)?;
        ch.deleted = true;
        ch.attached = false;
        ch.handler = None;
        Ok(())
    }
}
