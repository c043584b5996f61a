//! Brazilian postal code (CEP) type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PostalCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PostalCodeError {
    /// The input does not match `NNNNN-NNN` or `NNNNNNNN`.
    #[error("postal code must be in the format XXXXX-XXX or XXXXXXXX")]
    InvalidFormat,
}

/// A CEP, stored exactly as entered.
///
/// Accepts five digits, an optional hyphen, then three digits.
///
/// ```
/// use cadastro_core::PostalCode;
///
/// assert!(PostalCode::parse("01310-100").is_ok());
/// assert!(PostalCode::parse("01310100").is_ok());
/// assert!(PostalCode::parse("0131-0100").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PostalCode(String);

impl PostalCode {
    /// Parse a `PostalCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns `PostalCodeError::InvalidFormat` unless the input is five
    /// ASCII digits, an optional `-`, and three ASCII digits.
    pub fn parse(s: &str) -> Result<Self, PostalCodeError> {
        let bytes = s.as_bytes();
        let valid = match bytes.len() {
            8 => bytes.iter().all(u8::is_ascii_digit),
            9 => bytes
                .iter()
                .enumerate()
                .all(|(i, b)| if i == 5 { *b == b'-' } else { b.is_ascii_digit() }),
            _ => false,
        };

        if !valid {
            return Err(PostalCodeError::InvalidFormat);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the postal code as entered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PostalCode {
    type Err = PostalCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
