//! Instance identity.

use std::fmt;
use std::str::FromStr;

use crate::error::{RbxError, Result};

/// An opaque 128-bit instance identifier.
///
/// Referents are only compared, hashed and converted between their two external
/// forms: a 32-digit lowercase hex string and 16 big-endian bytes. Wire referents
/// are signed 32-bit integers; they are sign-extended, so the wire value `-1`
/// becomes [`Referent::ROOT`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Referent(u128);

impl Referent {
    /// The synthetic top-level container. Never declared by an instance chunk.
    pub const ROOT: Self = Self(u128::MAX);

    /// Wraps a raw 128-bit value.
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Returns the raw numeric value.
    pub const fn as_u128(&self) -> u128 {
        self.0
    }

    /// Returns true for the root sentinel.
    pub const fn is_root(&self) -> bool {
        self.0 == u128::MAX
    }

    /// Builds a referent from a decoded wire integer.
    pub const fn from_wire(value: i32) -> Self {
        Self(value as i128 as u128)
    }

    /// The wire integer for this referent, if it fits in a sign-extended `i32`.
    pub fn to_wire(&self) -> Option<i32> {
        i32::try_from(self.0 as i128).ok()
    }

    /// Parses up to 32 hex digits.
    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.is_empty() || hex.len() > 32 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RbxError::InvalidReferent(hex.to_owned()));
        }
        u128::from_str_radix(hex, 16)
            .map(Self)
            .map_err(|_| RbxError::InvalidReferent(hex.to_owned()))
    }

    /// Formats as exactly 32 lowercase hex digits, zero-padded.
    pub fn to_hex(&self) -> String {
        format!("{:032x}", self.0)
    }

    /// Reads 16 big-endian bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_be_bytes(bytes))
    }

    /// The 16 big-endian bytes.
    pub const fn to_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for Referent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "Referent(ROOT)")
        } else {
            write!(f, "Referent({})", self.to_hex())
        }
    }
}

impl fmt::Display for Referent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl FromStr for Referent {
    type Err = RbxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<u128> for Referent {
    fn from(value: u128) -> Self {
        Self(value)
    }
}
