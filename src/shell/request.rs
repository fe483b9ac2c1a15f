//! Peek Request Parsing
//!
//! Accepts configuration strings of the form `<hex-address>[:<hex-length>]`
//! and validates them before they can replace the pending request.
//!
//! # Security Checks
//! 1. Input is truncated to [`MAX_CONFIG_LEN`] characters
//! 2. Both fields must be plain hexadecimal (optional `0x` prefix)
//! 3. Values must fit their types; the length must be at least one word

use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;

use crate::mm::address::word_span;
use crate::mm::PhysAddr;

/// Longest configuration string considered; the rest is ignored.
pub const MAX_CONFIG_LEN: usize = 256;

/// Field of a configuration string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestField {
    /// The physical address.
    Address,
    /// The word count.
    Length,
}

impl fmt::Display for RequestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => write!(f, "address"),
            Self::Length => write!(f, "length"),
        }
    }
}

/// Error type for malformed configuration strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigParseError {
    /// Nothing but whitespace was given.
    #[error("empty request")]
    Empty,
    /// A field is not a hexadecimal number.
    #[error("{field} is not a hexadecimal number: {text:?}")]
    NotHex {
        /// Offending field.
        field: RequestField,
        /// Text that failed to parse.
        text: String,
    },
    /// A field does not fit its type.
    #[error("{field} is out of range")]
    OutOfRange {
        /// Offending field.
        field: RequestField,
    },
    /// The length was zero.
    #[error("length must be at least one word")]
    ZeroLength,
}

/// The single pending peek: where to read and how many words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeekRequest {
    address: PhysAddr,
    words: usize,
}

impl PeekRequest {
    /// Create a request for `words` words at `address`.
    ///
    /// Returns `None` for a zero-length request.
    pub const fn new(address: PhysAddr, words: usize) -> Option<Self> {
        if words == 0 {
            return None;
        }
        Some(Self { address, words })
    }

    /// Parse a configuration string, truncating over-long input first.
    pub fn parse(input: &str) -> Result<Self, ConfigParseError> {
        let input = match input.char_indices().nth(MAX_CONFIG_LEN) {
            Some((cut, _)) => {
                log::warn!(
                    "request truncated to {} characters (was {} bytes)",
                    MAX_CONFIG_LEN,
                    input.len()
                );
                &input[..cut]
            }
            None => input,
        };
        input.parse()
    }

    /// First physical address to read.
    #[inline]
    pub const fn address(&self) -> PhysAddr {
        self.address
    }

    /// Number of words to read.
    #[inline]
    pub const fn words(&self) -> usize {
        self.words
    }

    /// Address of the `index`th word.
    ///
    /// Returns `None` if the address would not fit the address width.
    pub fn word_address(&self, index: usize) -> Option<PhysAddr> {
        self.address.checked_add(word_span(index)?)
    }
}

impl Default for PeekRequest {
    fn default() -> Self {
        Self {
            address: PhysAddr::new(0),
            words: 1,
        }
    }
}

impl FromStr for PeekRequest {
    type Err = ConfigParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigParseError::Empty);
        }

        let (address, length) = match s.split_once(':') {
            Some((address, length)) => (address, Some(length)),
            None => (s, None),
        };

        let address = PhysAddr::new(parse_hex(address, RequestField::Address)?);
        let words = match length {
            Some(length) => {
                let words = parse_hex(length, RequestField::Length)?;
                usize::try_from(words).map_err(|_| ConfigParseError::OutOfRange {
                    field: RequestField::Length,
                })?
            }
            None => 1,
        };

        Self::new(address, words).ok_or(ConfigParseError::ZeroLength)
    }
}

fn parse_hex(text: &str, field: RequestField) -> Result<u64, ConfigParseError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConfigParseError::NotHex {
            field,
            text: text.to_string(),
        });
    }

    u64::from_str_radix(digits, 16).map_err(|_| ConfigParseError::OutOfRange { field })
}
