//! Bridge gain scale

use std::fmt;

use thiserror::Error;

/// Raw gain level outside the supported scale
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("gain level {0} is outside the supported scale 1..=8")]
pub struct GainOutOfRange(pub i64);

/// Amplification applied to a bridge input before digitization
///
/// Ordered from smallest to largest factor. The level number of each
/// variant matches the SDK's enumeration code for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BridgeGain {
    X1,
    X2,
    X4,
    X8,
    X16,
    X32,
    X64,
    X128,
}

impl BridgeGain {
    /// Every supported gain, smallest first
    pub const ALL: [BridgeGain; 8] = [
        BridgeGain::X1,
        BridgeGain::X2,
        BridgeGain::X4,
        BridgeGain::X8,
        BridgeGain::X16,
        BridgeGain::X32,
        BridgeGain::X64,
        BridgeGain::X128,
    ];

    /// Parse a level number (1 = x1 ... 8 = x128)
    pub fn from_level(level: i64) -> Result<Self, GainOutOfRange> {
        usize::try_from(level)
            .ok()
            .and_then(|l| l.checked_sub(1))
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(GainOutOfRange(level))
    }

    /// Look up a gain by its amplification factor
    pub fn from_factor(factor: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|g| g.factor() == factor)
    }

    /// Level number of this gain, as used on the wire
    pub fn level(&self) -> u8 {
        *self as u8 + 1
    }

    /// Amplification factor
    pub fn factor(&self) -> u32 {
        1 << (*self as u32)
    }
}

impl fmt::Display for BridgeGain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.factor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scale_is_ordered() {
        let factors: Vec<u32> = BridgeGain::ALL.iter().map(|g| g.factor()).collect();
        assert_eq!(factors, vec![1, 2, 4, 8, 16, 32, 64, 128]);
        assert!(BridgeGain::X1 < BridgeGain::X128);
    }

    #[test]
    fn test_level_bounds() {
        assert_eq!(BridgeGain::from_level(1), Ok(BridgeGain::X1));
        assert_eq!(BridgeGain::from_level(8), Ok(BridgeGain::X128));
        assert_eq!(BridgeGain::from_level(0), Err(GainOutOfRange(0)));
        assert_eq!(BridgeGain::from_level(9), Err(GainOutOfRange(9)));
        assert_eq!(BridgeGain::from_level(-3), Err(GainOutOfRange(-3)));
    }

    #[test]
    fn test_from_factor() {
        assert_eq!(BridgeGain::from_factor(64), Some(BridgeGain::X64));
        assert_eq!(BridgeGain::from_factor(3), None);
        assert_eq!(BridgeGain::X16.to_string(), "x16");
    }

    proptest! {
        #[test]
        fn level_matches_position(level in 1i64..=8) {
            let gain = BridgeGain::from_level(level).unwrap();
            prop_assert_eq!(i64::from(gain.level()), level);
        }

        #[test]
        fn out_of_scale_rejected(level in prop_oneof![i64::MIN..1i64, 9i64..i64::MAX]) {
            prop_assert!(BridgeGain::from_level(level).is_err());
        }
    }
}
