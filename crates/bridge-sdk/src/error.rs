//! SDK return codes

use std::fmt;

/// Result of a primitive SDK call
pub type SdkResult<T> = Result<T, ErrorCode>;

/// Numeric return code of an SDK call
///
/// Codes follow the acquisition library's own numbering so that reports
/// can be cross-referenced with the vendor documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    pub const OK: Self = Self(0x00);
    pub const PERM: Self = Self(0x01);
    pub const NOENT: Self = Self(0x02);
    pub const TIMEOUT: Self = Self(0x03);
    pub const INTERRUPTED: Self = Self(0x04);
    pub const IO: Self = Self(0x05);
    pub const NOMEMORY: Self = Self(0x06);
    pub const ACCESS: Self = Self(0x07);
    pub const FAULT: Self = Self(0x08);
    pub const BUSY: Self = Self(0x09);
    pub const EXIST: Self = Self(0x0A);
    pub const INVALID: Self = Self(0x0D);
    pub const UNSUPPORTED: Self = Self(0x14);
    pub const INVALIDARG: Self = Self(0x15);
    pub const UNEXPECTED: Self = Self(0x1C);
    pub const WRONGDEVICE: Self = Self(0x32);
    pub const UNKNOWNVAL: Self = Self(0x33);
    pub const NOTATTACHED: Self = Self(0x34);
    pub const CLOSED: Self = Self(0x38);

    /// Get the raw code value
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Check whether this code reports success
    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }

    /// Human-readable description, as the SDK reports it
    pub fn description(&self) -> &'static str {
        match *self {
            Self::OK => "Success",
            Self::PERM => "Not Permitted",
            Self::NOENT => "No Such Entity",
            Self::TIMEOUT => "Timed Out",
            Self::INTERRUPTED => "Op Interrupted",
            Self::IO => "IO Issue",
            Self::NOMEMORY => "Memory Issue",
            Self::ACCESS => "Access (Permission) Issue",
            Self::FAULT => "Address Issue",
            Self::BUSY => "Resource Busy",
            Self::EXIST => "Object Exists",
            Self::INVALID => "Invalid",
            Self::UNSUPPORTED => "Not Supported",
            Self::INVALIDARG => "Invalid Argument",
            Self::UNEXPECTED => "Unexpected Error",
            Self::WRONGDEVICE => "Wrong Device",
            Self::UNKNOWNVAL => "Unknown or Invalid Value",
            Self::NOTATTACHED => "Device not Attached",
            Self::CLOSED => "Closed",
            _ => "Unknown Error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} ({})", self.0, self.description())
    }
}

impl std::error::Error for ErrorCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_descriptions() {
        assert_eq!(ErrorCode::OK.description(), "Success");
        assert_eq!(ErrorCode::NOTATTACHED.description(), "Device not Attached");
        assert_eq!(ErrorCode::INVALIDARG.description(), "Invalid Argument");
    }

    #[test]
    fn test_unknown_code_still_described() {
        assert_eq!(ErrorCode(0xEE).description(), "Unknown Error");
    }

    #[test]
    fn test_display_carries_code_and_description() {
        assert_eq!(ErrorCode::TIMEOUT.to_string(), "0x03 (Timed Out)");
        assert!(ErrorCode::OK.is_ok());
        assert!(!ErrorCode::BUSY.is_ok());
    }
}
