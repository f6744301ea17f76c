//! Error types for the sensor node

use bridge_sdk::{ErrorCode, GainOutOfRange, VoltageRatioSdk};
use thiserror::Error;

/// Errors that can occur in the sensor node
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NodeError {
    /// Bad construction or message arguments
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The SDK could not allocate a channel object
    #[error("channel {channel}: create failed, code 0x{code:02X}: {description}")]
    Creation {
        channel: usize,
        code: u32,
        description: String,
    },

    /// Open did not complete within the attach timeout
    #[error(
        "channel {channel}: openWaitForAttachment timed out after {timeout_ms}ms, code 0x{code:02X}: {description}"
    )]
    AttachmentTimeout {
        channel: usize,
        timeout_ms: u64,
        code: u32,
        description: String,
    },

    /// Command issued to a channel that is not attached
    #[error("channel {channel}: not attached")]
    NotAttached { channel: usize },

    /// Channel index outside the configured range
    #[error("invalid channel {channel}: node has {num_inputs} input(s)")]
    InvalidChannel { channel: i64, num_inputs: usize },

    /// Gain level outside the supported scale
    #[error("invalid gain: {0}")]
    InvalidGain(#[from] GainOutOfRange),

    /// Any other non-OK result from the SDK
    #[error("channel {channel}: {operation} failed, code 0x{code:02X}: {description}")]
    HardwareCommand {
        operation: &'static str,
        channel: usize,
        code: u32,
        description: String,
    },

    /// Lifecycle call on a node that was already torn down
    #[error("node has been torn down")]
    TornDown,
}

impl NodeError {
    /// Build a hardware command error with the SDK's own description
    pub fn hardware(
        sdk: &dyn VoltageRatioSdk,
        operation: &'static str,
        channel: usize,
        code: ErrorCode,
    ) -> Self {
        NodeError::HardwareCommand {
            operation,
            channel,
            code: code.as_u32(),
            description: sdk.error_description(code),
        }
    }

    /// Channel the error concerns, if any
    pub fn channel(&self) -> Option<usize> {
        match self {
            NodeError::Creation { channel, .. }
            | NodeError::AttachmentTimeout { channel, .. }
            | NodeError::NotAttached { channel }
            | NodeError::HardwareCommand { channel, .. } => Some(*channel),
            _ => None,
        }
    }

    /// SDK return code carried by the error, if any
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            NodeError::Creation { code, .. }
            | NodeError::AttachmentTimeout { code, .. }
            | NodeError::HardwareCommand { code, .. } => Some(ErrorCode(*code)),
            NodeError::NotAttached { .. } => Some(ErrorCode::NOTATTACHED),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_sim::SimulatedSdk;

    #[test]
    fn test_hardware_report_combines_operation_code_and_description() {
        let sdk = SimulatedSdk::new();
        let err = NodeError::hardware(&sdk, "setBridgeEnabled", 2, ErrorCode::BUSY);
        assert_eq!(
            err.to_string(),
            "channel 2: setBridgeEnabled failed, code 0x09: Resource Busy"
        );
        assert_eq!(err.channel(), Some(2));
        assert_eq!(err.code(), Some(ErrorCode::BUSY));
    }

    #[test]
    fn test_invalid_gain_from_scale_error() {
        let err: NodeError = GainOutOfRange(12).into();
        assert_eq!(
            err.to_string(),
            "invalid gain: gain level 12 is outside the supported scale 1..=8"
        );
        assert_eq!(err.channel(), None);
    }
}
