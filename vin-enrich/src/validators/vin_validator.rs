//! VIN Validator
//!
//! Structural validation of the 17-character Vehicle Identification Number.
//! Pure and total: no I/O, runs before any stage that touches the network.
//!
//! # Rules
//! - Exactly 17 characters, counted on the input as given
//! - Alphabet `[A-HJ-NPR-Z0-9]` (I, O and Q are never used in a VIN)
//! - Case-insensitive; the validated code is stored uppercase
//!
//! The check digit (position 9) is not verified: it is mandatory only for
//! North American VINs and the registry accepts VINs without a valid one.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Required VIN length
pub const VIN_LENGTH: usize = 17;

/// Position-10 model year codes, in cycle order (1980 + index or 2010 + index)
const MODEL_YEAR_CODES: &str = "ABCDEFGHJKLMNPRSTVWXY123456789";

fn is_vin_char(c: char) -> bool {
    matches!(c, 'A'..='H' | 'J'..='N' | 'P' | 'R'..='Z' | '0'..='9')
}

/// Validate a raw VIN string
///
/// # Errors
/// - `InvalidLength` when the input is not 17 characters
/// - `InvalidCharacter` for the first character outside the VIN alphabet
///   (position is 1-based, letters reported uppercase)
///
/// Only ASCII letters are case-folded: a full Unicode uppercase can change
/// the character count (`ß` becomes `SS`).
pub fn validate(raw: &str) -> Result<VinCode, ValidationError> {
    let length = raw.chars().count();
    if length != VIN_LENGTH {
        return Err(ValidationError::InvalidLength { length });
    }

    let mut normalized = String::with_capacity(VIN_LENGTH);
    for (index, c) in raw.chars().enumerate() {
        let character = c.to_ascii_uppercase();
        if !is_vin_char(character) {
            return Err(ValidationError::InvalidCharacter {
                character,
                position: index + 1,
            });
        }
        normalized.push(character);
    }

    Ok(VinCode(normalized))
}

/// A validated, uppercase, 17-character VIN
///
/// Only constructible through [`validate`]; deserialization re-validates so
/// artifacts read from disk uphold the same invariant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VinCode(String);

impl VinCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// World Manufacturer Identifier (positions 1-3)
    pub fn wmi(&self) -> &str {
        &self.0[..3]
    }

    /// Positional breakdown of this VIN
    pub fn components(&self) -> VinComponents {
        // ASCII-only after validation, so byte slicing is safe
        let v = &self.0;
        VinComponents {
            wmi: v[..3].to_string(),
            vds: v[3..9].to_string(),
            check_digit: v[8..9].to_string(),
            model_year_code: v[9..10].to_string(),
            plant_code: v[10..11].to_string(),
            vis: v[9..].to_string(),
            serial: v[11..].to_string(),
            decoded_model_year: self.decoded_model_year(),
        }
    }

    /// Model year implied by position 10
    ///
    /// Uses the 30-year code cycle; position 7 selects the cycle (numeric →
    /// 1980-2009, alphabetic → 2010-2039). This is the North American
    /// convention and only a hint for other markets. Returns `None` when
    /// position 10 is not a year code (e.g. `0`, `U`, `Z`).
    pub fn decoded_model_year(&self) -> Option<i32> {
        let bytes = self.0.as_bytes();
        let code = bytes[9] as char;
        let index = MODEL_YEAR_CODES.find(code)? as i32;

        let base = if (bytes[6] as char).is_ascii_digit() {
            1980
        } else {
            2010
        };
        Some(base + index)
    }
}

impl fmt::Display for VinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VinCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate(&value)
    }
}

impl From<VinCode> for String {
    fn from(vin: VinCode) -> Self {
        vin.0
    }
}

impl AsRef<str> for VinCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// VIN sections (WMI, VDS, VIS) and the single-character codes inside them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VinComponents {
    /// World Manufacturer Identifier (1-3)
    pub wmi: String,
    /// Vehicle Descriptor Section (4-9)
    pub vds: String,
    /// Check digit (9)
    pub check_digit: String,
    /// Model year code (10)
    pub model_year_code: String,
    /// Plant code (11)
    pub plant_code: String,
    /// Vehicle Identifier Section (10-17)
    pub vis: String,
    /// Production serial number (12-17)
    pub serial: String,
    /// Model year implied by the year code, if any
    pub decoded_model_year: Option<i32>,
}
