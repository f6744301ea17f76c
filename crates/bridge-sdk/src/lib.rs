//! Voltage-Ratio Bridge SDK Boundary
//!
//! This crate describes the acquisition SDK that sits underneath a sensor
//! node: the primitive operations on a voltage-ratio input channel, the
//! discrete bridge gain scale, and the SDK's numeric error codes with their
//! human-readable descriptions.
//!
//! The SDK itself (USB transport, driver, delivery thread) lives elsewhere.
//! Anything implementing [`VoltageRatioSdk`] can back a sensor node: the
//! vendor library through a thin binding, or the simulator in `bridge-sim`.
//!
//! # Example
//!
//! ```rust
//! use bridge_sdk::{BridgeGain, ErrorCode};
//!
//! let gain = BridgeGain::from_level(4).unwrap();
//! assert_eq!(gain.factor(), 8);
//!
//! assert_eq!(ErrorCode::TIMEOUT.description(), "Timed Out");
//! ```

pub mod error;
pub mod gain;
pub mod sdk;

pub use error::{ErrorCode, SdkResult};
pub use gain::{BridgeGain, GainOutOfRange};
pub use sdk::{ChangeHandler, ChannelId, VoltageRatioSdk, DEFAULT_ATTACH_TIMEOUT, MAX_CHANNELS};
