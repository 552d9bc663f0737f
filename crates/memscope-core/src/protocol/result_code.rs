//! Packed agent result codes.
//!
//! Most responses end with a 32-bit *result word*.  The agent packs two fields
//! into it:
//!
//! ```text
//!  31            22 21                      9 8            0
//! ┌────────────────┬─────────────────────────┬──────────────┐
//! │    unused      │   description (13 bit)  │ module (9 b) │
//! └────────────────┴─────────────────────────┴──────────────┘
//! ```
//!
//! A result is a success exactly when both fields are zero.  Bits above 21 are
//! ignored when decoding.

use std::fmt;

use serde::Serialize;

const MODULE_MASK: u32 = 0x1FF;
const DESCRIPTION_SHIFT: u32 = 9;
const DESCRIPTION_MASK: u32 = 0x1FFF;

/// A decoded result word.
///
/// Only ever built by [`ResultCode::from_raw`] from bytes the agent sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ResultCode {
    module: u16,
    description: u16,
}

impl ResultCode {
    /// Decodes a raw 32-bit result word.
    pub fn from_raw(raw: u32) -> Self {
        Self {
            module: (raw & MODULE_MASK) as u16,
            description: ((raw >> DESCRIPTION_SHIFT) & DESCRIPTION_MASK) as u16,
        }
    }

    pub fn module(self) -> u16 {
        self.module
    }

    pub fn description(self) -> u16 {
        self.description
    }

    pub fn succeeded(self) -> bool {
        self.module == 0 && self.description == 0
    }

    pub fn failed(self) -> bool {
        !self.succeeded()
    }

    /// Conventional `2MMM-DDDD` rendering used by the target's error viewer.
    pub fn error_code(self) -> String {
        format!("{:04}-{:04}", 2000 + u32::from(self.module), self.description)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Result(mod={}, desc={})", self.module, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_success() {
        let code = ResultCode::from_raw(0);
        assert!(code.succeeded());
        assert!(!code.failed());
    }

    #[test]
    fn test_module_and_description_are_unpacked() {
        // Arrange: module 2, description 0x10 → raw = 2 | (0x10 << 9)
        let raw = 2 | (0x10 << 9);

        // Act
        let code = ResultCode::from_raw(raw);

        // Assert
        assert_eq!(code.module(), 2);
        assert_eq!(code.description(), 0x10);
        assert!(code.failed());
    }

    #[test]
    fn test_bits_above_description_are_ignored() {
        let code = ResultCode::from_raw(0xFFC0_0000);
        assert!(code.succeeded(), "bits 22..31 carry no status");
    }

    #[test]
    fn test_success_predicate_matches_bit_definition() {
        let samples = [
            0u32,
            1,
            0x1FF,
            0x200,
            0x3FFE00,
            0x3FFFFF,
            0x0040_0000,
            0xDEAD_BEEF,
            0x0001_0000,
        ];
        for raw in samples {
            let expected = (raw & 0x1FF == 0) && ((raw >> 9) & 0x1FFF == 0);
            assert_eq!(ResultCode::from_raw(raw).succeeded(), expected, "raw = {raw:#x}");
        }
    }

    #[test]
    fn test_display_and_error_code() {
        let code = ResultCode::from_raw(1 | (0x1F << 9));
        assert_eq!(code.to_string(), "Result(mod=1, desc=31)");
        assert_eq!(code.error_code(), "2001-0031");
    }
}
