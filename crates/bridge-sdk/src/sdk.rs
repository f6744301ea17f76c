//! Primitive operations of the acquisition SDK

use std::sync::Arc;
use std::time::Duration;

use crate::error::{ErrorCode, SdkResult};
use crate::gain::BridgeGain;

/// Largest number of bridge inputs on one acquisition device
pub const MAX_CHANNELS: usize = 4;

/// Bounded wait used when opening a channel
pub const DEFAULT_ATTACH_TIMEOUT: Duration = Duration::from_millis(5000);

/// Opaque handle to an SDK channel object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

impl ChannelId {
    /// Get the raw handle value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Value-change callback
///
/// Invoked on the SDK's delivery thread with the channel that produced the
/// sample and the new voltage ratio.
pub type ChangeHandler = Arc<dyn Fn(ChannelId, f64) + Send + Sync>;

/// Voltage-ratio input channel API of the acquisition SDK
///
/// Every call returns the SDK's numeric code on failure. Implementations
/// must be callable from the host thread while the delivery thread is
/// running handlers.
pub trait VoltageRatioSdk: Send + Sync {
    /// Allocate a new voltage-ratio input channel object
    fn create(&self) -> SdkResult<ChannelId>;

    /// Bind the channel object to a physical input on the device
    fn set_channel(&self, id: ChannelId, channel: i32) -> SdkResult<()>;

    /// Install or clear (`None`) the value-change handler
    fn set_on_change_handler(&self, id: ChannelId, handler: Option<ChangeHandler>)
        -> SdkResult<()>;

    /// Open the channel and block until attached or until `timeout` elapses
    fn open_wait_for_attachment(&self, id: ChannelId, timeout: Duration) -> SdkResult<()>;

    /// Enable or disable bridge excitation and sampling
    fn set_bridge_enabled(&self, id: ChannelId, enabled: bool) -> SdkResult<()>;

    /// Select the bridge gain
    fn set_bridge_gain(&self, id: ChannelId, gain: BridgeGain) -> SdkResult<()>;

    /// Close the channel
    fn close(&self, id: ChannelId) -> SdkResult<()>;

    /// Release the channel object
    fn delete(&self, id: ChannelId) -> SdkResult<()>;

    /// Human-readable description for a return code
    fn error_description(&self, code: ErrorCode) -> String {
        code.description().to_string()
    }
}
