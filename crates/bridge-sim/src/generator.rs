//! Background sample generator
//!
//! Stands in for the SDK's delivery thread: every tick it emits one sample
//! on each attached channel whose bridge is enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::SimError;
use crate::sdk::SimulatedSdk;

/// Running generator thread
pub struct SampleGenerator {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<u64>>,
}

impl SampleGenerator {
    /// Start emitting samples every `interval`
    pub fn spawn(sdk: Arc<SimulatedSdk>, interval: Duration) -> Result<Self, SimError> {
        if interval.is_zero() {
            return Err(SimError::ZeroInterval);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let thread = std::thread::Builder::new()
            .name("bridge-sim-delivery".into())
            .spawn(move || {
                let started = Instant::now();
                let mut delivered = 0u64;
                while !flag.load(Ordering::Relaxed) {
                    let t = started.elapsed().as_secs_f64();
                    for (id, channel, gain) in sdk.streaming_channels() {
                        if sdk.inject(id, sample_at(t, channel, gain.factor())) {
                            delivered += 1;
                        }
                    }
                    std::thread::sleep(interval);
                }
                delivered
            })?;

        info!("Sample generator started ({}ms interval)", interval.as_millis());
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Stop the thread and wait for it, returning the number of samples delivered
    pub fn stop(mut self) -> Result<u64, SimError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<u64, SimError> {
        self.stop.store(true, Ordering::Relaxed);
        match self.thread.take() {
            Some(thread) => {
                let delivered = thread.join().map_err(|_| SimError::GeneratorPanicked)?;
                debug!("Sample generator stopped after {} samples", delivered);
                Ok(delivered)
            }
            None => Ok(0),
        }
    }
}

impl Drop for SampleGenerator {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Simulated bridge output: a slow sine per channel, scaled by gain
fn sample_at(t: f64, channel: i32, gain: u32) -> f64 {
    let phase = f64::from(channel) * std::f64::consts::FRAC_PI_2;
    (t * 0.5 * std::f64::consts::TAU + phase).sin() * 1.0e-4 * f64::from(gain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_sdk::VoltageRatioSdk;
    use std::sync::Mutex;

    #[test]
    fn test_zero_interval_rejected() {
        let sdk = Arc::new(SimulatedSdk::new());
        assert!(matches!(
            SampleGenerator::spawn(sdk, Duration::ZERO),
            Err(SimError::ZeroInterval)
        ));
    }

    #[test]
    fn test_only_enabled_channels_receive_samples() {
        let sdk = Arc::new(SimulatedSdk::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut ids = Vec::new();
        for channel in 0..2 {
            let id = sdk.create().unwrap();
            sdk.set_channel(id, channel).unwrap();
            let log = seen.clone();
            sdk.set_on_change_handler(
                id,
                Some(Arc::new(move |id, _| log.lock().unwrap().push(id))),
            )
            .unwrap();
            sdk.open_wait_for_attachment(id, Duration::from_millis(5000))
                .unwrap();
            ids.push(id);
        }
        sdk.set_bridge_enabled(ids[1], true).unwrap();

        let generator = SampleGenerator::spawn(sdk.clone(), Duration::from_millis(1)).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        let delivered = generator.stop().unwrap();

        let seen = seen.lock().unwrap();
        assert!(delivered > 0);
        assert_eq!(seen.len() as u64, delivered);
        assert!(seen.iter().all(|id| *id == ids[1]));
    }

    #[test]
    fn test_sample_scales_with_gain() {
        let low = sample_at(0.3, 0, 1).abs();
        let high = sample_at(0.3, 0, 128).abs();
        assert!(high > low);
        assert!(high <= 128.0e-4);
    }
}
