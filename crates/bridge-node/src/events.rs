//! Node event stream
//!
//! Lifecycle outcomes and per-channel failures are buffered as events so
//! the host can surface them to the operator after each operation.

use bridge_sdk::{BridgeGain, ChannelId};

use crate::error::NodeError;
use crate::node::NodeState;

/// Event emitted by a sensor node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// The node moved to a new lifecycle state
    StateChanged { from: NodeState, to: NodeState },

    /// A channel attached
    ChannelAttached { channel: usize, id: ChannelId },

    /// A channel failed during configuration
    ChannelFailed { channel: usize, error: NodeError },

    /// Bridge excitation was switched on a channel
    BridgeEnabled { channel: usize, enabled: bool },

    /// A gain was applied to a channel
    GainApplied { channel: usize, gain: BridgeGain },

    /// A hardware command failed outside configuration
    CommandFailed { channel: usize, error: NodeError },

    /// A channel's SDK object was released
    ChannelClosed { channel: usize },

    /// Diagnostic trigger from the host
    Heartbeat,
}

impl NodeEvent {
    /// Check if this event reports a failure
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            NodeEvent::ChannelFailed { .. } | NodeEvent::CommandFailed { .. }
        )
    }

    /// Get the channel if this event concerns a specific one
    pub fn channel(&self) -> Option<usize> {
        match self {
            NodeEvent::ChannelAttached { channel, .. }
            | NodeEvent::ChannelFailed { channel, .. }
            | NodeEvent::BridgeEnabled { channel, .. }
            | NodeEvent::GainApplied { channel, .. }
            | NodeEvent::CommandFailed { channel, .. }
            | NodeEvent::ChannelClosed { channel } => Some(*channel),
            NodeEvent::StateChanged { .. } | NodeEvent::Heartbeat => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let failed = NodeEvent::ChannelFailed {
            channel: 1,
            error: NodeError::NotAttached { channel: 1 },
        };
        assert!(failed.is_error());
        assert_eq!(failed.channel(), Some(1));

        let attached = NodeEvent::ChannelAttached {
            channel: 0,
            id: ChannelId(3),
        };
        assert!(!attached.is_error());
        assert_eq!(NodeEvent::Heartbeat.channel(), None);
    }
}
