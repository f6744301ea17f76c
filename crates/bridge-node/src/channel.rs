//! Channel handles
//!
//! A [`ChannelHandle`] wraps one hardware input: its slot index, the SDK
//! channel object it exclusively owns, its attach state and the last
//! parameters successfully applied to it.

use std::time::Duration;

use bridge_sdk::{BridgeGain, ChangeHandler, ChannelId, ErrorCode, VoltageRatioSdk};
use tracing::{debug, info, warn};

use crate::error::NodeError;

/// Lifecycle state of a channel handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// No SDK object exists for this slot
    #[default]
    Unconfigured,
    /// SDK object allocated, not opened yet
    Created,
    /// Waiting for the device to report attachment
    Opening,
    /// Device confirmed the channel
    Attached,
    /// Open timed out or failed; the object still exists
    FailedToAttach,
    /// Object closed and deleted
    Closed,
}

impl ChannelState {
    /// Check whether an SDK object exists in this state
    pub fn holds_hardware(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Opening | Self::Attached | Self::FailedToAttach
        )
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unconfigured => "Unconfigured",
            Self::Created => "Created",
            Self::Opening => "Opening",
            Self::Attached => "Attached",
            Self::FailedToAttach => "Failed to attach",
            Self::Closed => "Closed",
        }
    }
}

/// One hardware input channel
#[derive(Debug)]
pub struct ChannelHandle {
    index: usize,
    hardware: Option<ChannelId>,
    state: ChannelState,
    gain: Option<BridgeGain>,
    bridge_enabled: bool,
}

impl ChannelHandle {
    /// Create an unconfigured handle for a slot
    pub fn new(index: usize) -> Self {
        Self {
            index,
            hardware: None,
            state: ChannelState::Unconfigured,
            gain: None,
            bridge_enabled: false,
        }
    }

    /// Slot index
    pub fn index(&self) -> usize {
        self.index
    }

    /// SDK channel object, while one exists
    pub fn hardware(&self) -> Option<ChannelId> {
        self.hardware
    }

    /// Current state
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Last successfully applied gain
    pub fn gain(&self) -> Option<BridgeGain> {
        self.gain
    }

    /// Last successfully applied bridge enable state
    pub fn bridge_enabled(&self) -> bool {
        self.bridge_enabled
    }

    /// Check whether the device confirmed this channel
    pub fn is_attached(&self) -> bool {
        self.state == ChannelState::Attached
    }

    fn require_hardware(&self) -> Result<ChannelId, NodeError> {
        self.hardware
            .ok_or(NodeError::NotAttached { channel: self.index })
    }

    fn require_attached(&self) -> Result<ChannelId, NodeError> {
        match self.hardware {
            Some(id) if self.is_attached() => Ok(id),
            _ => Err(NodeError::NotAttached { channel: self.index }),
        }
    }

    /// Allocate the SDK channel object
    ///
    /// A handle that already owns an object keeps it and returns it without
    /// calling the SDK, so a slot never holds two objects.
    pub fn create(&mut self, sdk: &dyn VoltageRatioSdk) -> Result<ChannelId, NodeError> {
        if let Some(id) = self.hardware {
            debug!("Channel {} already owns {:?}", self.index, id);
            return Ok(id);
        }

        match sdk.create() {
            Ok(id) => {
                self.hardware = Some(id);
                self.state = ChannelState::Created;
                Ok(id)
            }
            Err(code) => Err(NodeError::Creation {
                channel: self.index,
                code: code.as_u32(),
                description: sdk.error_description(code),
            }),
        }
    }

    /// Bind the object to a physical input number on the device
    pub fn bind_channel_number(
        &mut self,
        sdk: &dyn VoltageRatioSdk,
        channel: i32,
    ) -> Result<(), NodeError> {
        let id = self.require_hardware()?;
        sdk.set_channel(id, channel)
            .map_err(|code| NodeError::hardware(sdk, "setChannel", self.index, code))
    }

    /// Register the sample-delivery callback
    pub fn install_change_handler(
        &mut self,
        sdk: &dyn VoltageRatioSdk,
        handler: ChangeHandler,
    ) -> Result<(), NodeError> {
        let id = self.require_hardware()?;
        sdk.set_on_change_handler(id, Some(handler))
            .map_err(|code| NodeError::hardware(sdk, "setOnVoltageRatioChangeHandler", self.index, code))
    }

    /// Deregister the sample-delivery callback
    pub fn clear_change_handler(&mut self, sdk: &dyn VoltageRatioSdk) -> Result<(), NodeError> {
        let id = self.require_hardware()?;
        sdk.set_on_change_handler(id, None)
            .map_err(|code| NodeError::hardware(sdk, "clearOnVoltageRatioChangeHandler", self.index, code))
    }

    /// Open the channel, blocking until attached or `timeout` elapses
    pub fn open(&mut self, sdk: &dyn VoltageRatioSdk, timeout: Duration) -> Result<(), NodeError> {
        let id = self.require_hardware()?;
        self.state = ChannelState::Opening;

        match sdk.open_wait_for_attachment(id, timeout) {
            Ok(()) => {
                self.state = ChannelState::Attached;
                info!("Channel {} attached", self.index);
                Ok(())
            }
            Err(code) => {
                self.state = ChannelState::FailedToAttach;
                if code == ErrorCode::TIMEOUT {
                    Err(NodeError::AttachmentTimeout {
                        channel: self.index,
                        timeout_ms: timeout.as_millis() as u64,
                        code: code.0,
                        description: sdk.error_description(code),
                    })
                } else {
                    Err(NodeError::hardware(sdk, "openWaitForAttachment", self.index, code))
                }
            }
        }
    }

    /// Enable or disable bridge excitation
    pub fn set_bridge_enabled(
        &mut self,
        sdk: &dyn VoltageRatioSdk,
        on: bool,
    ) -> Result<(), NodeError> {
        let id = self.require_attached()?;
        sdk.set_bridge_enabled(id, on)
            .map_err(|code| NodeError::hardware(sdk, "setBridgeEnabled", self.index, code))?;
        self.bridge_enabled = on;
        Ok(())
    }

    /// Apply a bridge gain
    pub fn set_gain(&mut self, sdk: &dyn VoltageRatioSdk, gain: BridgeGain) -> Result<(), NodeError> {
        let id = self.require_attached()?;
        sdk.set_bridge_gain(id, gain)
            .map_err(|code| NodeError::hardware(sdk, "setBridgeGain", self.index, code))?;
        self.gain = Some(gain);
        Ok(())
    }

    /// Release the SDK object
    ///
    /// Clears the handler, closes, then deletes. Every step is attempted
    /// even if an earlier one failed; the errors are returned. Does nothing
    /// when no object was ever created.
    pub fn teardown(&mut self, sdk: &dyn VoltageRatioSdk) -> Vec<NodeError> {
        let mut errors = Vec::new();
        let Some(id) = self.hardware else {
            return errors;
        };

        if let Err(e) = self.clear_change_handler(sdk) {
            warn!("{}", e);
            errors.push(e);
        }
        if let Err(code) = sdk.close(id) {
            let e = NodeError::hardware(sdk, "close", self.index, code);
            warn!("{}", e);
            errors.push(e);
        }
        if let Err(code) = sdk.delete(id) {
            let e = NodeError::hardware(sdk, "delete", self.index, code);
            warn!("{}", e);
            errors.push(e);
        }

        self.hardware = None;
        self.state = ChannelState::Closed;
        self.bridge_enabled = false;
        debug!("Channel {} closed", self.index);
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_sim::{SdkCall, SimulatedSdk, SimulationConfig};
    use std::sync::Arc;

    const TIMEOUT: Duration = Duration::from_millis(5000);

    fn noop_handler() -> ChangeHandler {
        Arc::new(|_, _| {})
    }

    #[test]
    fn test_create_sets_state() {
        let sdk = SimulatedSdk::new();
        let mut handle = ChannelHandle::new(0);
        assert_eq!(handle.state(), ChannelState::Unconfigured);

        let id = handle.create(&sdk).unwrap();
        assert_eq!(handle.hardware(), Some(id));
        assert_eq!(handle.state(), ChannelState::Created);
        assert!(handle.state().holds_hardware());
    }

    #[test]
    fn test_failed_create_leaves_handle_unconfigured() {
        let sdk = SimulatedSdk::with_config(SimulationConfig {
            failed_creations: vec![0],
            ..Default::default()
        });
        let mut handle = ChannelHandle::new(1);

        let err = handle.create(&sdk).unwrap_err();
        assert!(matches!(err, NodeError::Creation { channel: 1, .. }));
        assert!(handle.hardware().is_none());
        assert_eq!(handle.state(), ChannelState::Unconfigured);
    }

    #[test]
    fn test_second_create_reuses_object() {
        let sdk = SimulatedSdk::new();
        let mut handle = ChannelHandle::new(0);
        let first = handle.create(&sdk).unwrap();
        let second = handle.create(&sdk).unwrap();
        assert_eq!(first, second);
        assert_eq!(sdk.created().len(), 1);
    }

    #[test]
    fn test_open_timeout_keeps_object() {
        let sdk = SimulatedSdk::with_config(SimulationConfig {
            timeout_channels: vec![0],
            ..Default::default()
        });
        let mut handle = ChannelHandle::new(0);
        handle.create(&sdk).unwrap();
        handle.bind_channel_number(&sdk, 0).unwrap();

        let err = handle.open(&sdk, TIMEOUT).unwrap_err();
        assert!(matches!(
            err,
            NodeError::AttachmentTimeout {
                channel: 0,
                timeout_ms: 5000,
                ..
            }
        ));
        assert_eq!(err.code(), Some(ErrorCode::TIMEOUT));
        assert_eq!(
            err.to_string(),
            "channel 0: openWaitForAttachment timed out after 5000ms, code 0x03: Timed Out"
        );
        assert_eq!(handle.state(), ChannelState::FailedToAttach);
        assert!(handle.hardware().is_some());
    }

    #[test]
    fn test_commands_require_attachment() {
        let sdk = SimulatedSdk::new();
        let mut handle = ChannelHandle::new(3);
        handle.create(&sdk).unwrap();
        sdk.clear_calls();

        assert_eq!(
            handle.set_bridge_enabled(&sdk, true),
            Err(NodeError::NotAttached { channel: 3 })
        );
        assert_eq!(
            handle.set_gain(&sdk, BridgeGain::X8),
            Err(NodeError::NotAttached { channel: 3 })
        );
        assert!(sdk.calls().is_empty());
        assert!(!handle.bridge_enabled());
        assert!(handle.gain().is_none());
    }

    #[test]
    fn test_attached_commands_record_parameters() {
        let sdk = SimulatedSdk::new();
        let mut handle = ChannelHandle::new(0);
        handle.create(&sdk).unwrap();
        handle.bind_channel_number(&sdk, 0).unwrap();
        handle.install_change_handler(&sdk, noop_handler()).unwrap();
        handle.open(&sdk, TIMEOUT).unwrap();

        handle.set_gain(&sdk, BridgeGain::X128).unwrap();
        handle.set_bridge_enabled(&sdk, true).unwrap();
        assert_eq!(handle.gain(), Some(BridgeGain::X128));
        assert!(handle.bridge_enabled());
    }

    #[test]
    fn test_teardown_order_and_idempotence() {
        let sdk = SimulatedSdk::new();
        let mut handle = ChannelHandle::new(0);
        let id = handle.create(&sdk).unwrap();
        handle.install_change_handler(&sdk, noop_handler()).unwrap();
        sdk.clear_calls();

        assert!(handle.teardown(&sdk).is_empty());
        assert_eq!(
            sdk.calls(),
            vec![
                SdkCall::SetHandler {
                    id,
                    installed: false
                },
                SdkCall::Close(id),
                SdkCall::Delete(id),
            ]
        );
        assert_eq!(handle.state(), ChannelState::Closed);
        assert!(handle.hardware().is_none());

        assert!(handle.teardown(&sdk).is_empty());
        assert_eq!(sdk.close_count(id), 1);
        assert_eq!(sdk.delete_count(id), 1);
    }

    #[test]
    fn test_teardown_continues_after_close_failure() {
        let sdk = SimulatedSdk::with_config(SimulationConfig {
            close_failures: vec![2],
            ..Default::default()
        });
        let mut handle = ChannelHandle::new(2);
        let id = handle.create(&sdk).unwrap();
        handle.bind_channel_number(&sdk, 2).unwrap();

        let errors = handle.teardown(&sdk);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            NodeError::HardwareCommand {
                operation: "close",
                ..
            }
        ));
        assert_eq!(sdk.delete_count(id), 1);
    }

    #[test]
    fn test_teardown_without_object_is_noop() {
        let sdk = SimulatedSdk::new();
        let mut handle = ChannelHandle::new(0);
        assert!(handle.teardown(&sdk).is_empty());
        assert_eq!(handle.state(), ChannelState::Unconfigured);
        assert!(sdk.calls().is_empty());
    }
}
