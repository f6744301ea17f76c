//! Voltage-Ratio SDK Simulation Library
//!
//! This crate provides a simulation layer for exercising sensor nodes
//! without a physical acquisition device. It includes:
//!
//! - **SimulatedSdk**: an in-memory [`VoltageRatioSdk`](bridge_sdk::VoltageRatioSdk)
//!   that records every call and supports fault injection
//! - **SampleGenerator**: a background thread standing in for the SDK's
//!   delivery thread, emitting samples on enabled channels
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use bridge_sdk::VoltageRatioSdk;
//! use bridge_sim::{SimulatedSdk, SimulationConfig};
//!
//! let sdk = SimulatedSdk::with_config(SimulationConfig {
//!     timeout_channels: vec![1],
//!     ..Default::default()
//! });
//!
//! let ch = sdk.create().unwrap();
//! sdk.set_channel(ch, 1).unwrap();
//! assert!(sdk.open_wait_for_attachment(ch, Duration::from_millis(5000)).is_err());
//! ```

pub mod error;
pub mod generator;
pub mod sdk;

pub use error::SimError;
pub use generator::SampleGenerator;
pub use sdk::{SdkCall, SimulatedSdk, SimulationConfig};
