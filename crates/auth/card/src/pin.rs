//! PIN handling
//!
//! A [`Pin`] is always six ASCII digits. Its memory is wiped on drop and it
//! never prints its digits.

use std::fmt;

use rand::Rng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{PIN_FIELD_LENGTH, PIN_LENGTH};

const MAX_PIN_NUMBER: u32 = 1_000_000;

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The input was not the expected length
    #[error("Input has incorrect length: expected {expected}, got {actual}")]
    IncorrectLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// The input contained invalid characters
    #[error("Input contains invalid characters")]
    InvalidCharacters,
}

/// A card PIN
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Pin(String);

impl Pin {
    /// Validate and wrap a PIN
    ///
    /// A valid PIN is exactly 6 digits long.
    pub fn new(pin: &str) -> Result<Self, ValidationError> {
        if pin.len() != PIN_LENGTH {
            return Err(ValidationError::IncorrectLength {
                expected: PIN_LENGTH,
                actual: pin.len(),
            });
        }
        if !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidCharacters);
        }
        Ok(Self(pin.to_string()))
    }

    /// Generate a random PIN
    pub fn generate() -> Self {
        let pin = rand::rng().random_range(0..MAX_PIN_NUMBER);
        Self(format!("{pin:06}"))
    }

    /// The PIN digits
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The PIN as sent in VERIFY, padded with `0xFF`
    pub fn to_field(&self) -> [u8; PIN_FIELD_LENGTH] {
        let mut field = [0xFF; PIN_FIELD_LENGTH];
        field[..PIN_LENGTH].copy_from_slice(self.0.as_bytes());
        field
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(******)")
    }
}

impl std::str::FromStr for Pin {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(Pin::new("123456").is_ok());
        assert_eq!(
            Pin::new("12345"),
            Err(ValidationError::IncorrectLength {
                expected: 6,
                actual: 5
            })
        );
        assert_eq!(Pin::new("12345a"), Err(ValidationError::InvalidCharacters));
    }

    #[test]
    fn test_generate_is_valid() {
        for _ in 0..100 {
            let pin = Pin::generate();
            assert!(Pin::new(pin.as_str()).is_ok());
        }
    }

    #[test]
    fn test_field_padding() {
        let pin = Pin::new("012345").unwrap();
        assert_eq!(pin.to_field(), *b"012345\xFF\xFF");
    }

    #[test]
    fn test_debug_hides_digits() {
        let pin = Pin::new("999999").unwrap();
        assert!(!format!("{pin:?}").contains("999999"));
    }
}
