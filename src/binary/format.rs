//! MaxMind DB format constants and structures.

use crate::{Error, Result};

/// Marker that precedes the metadata map at the end of the file.
pub const METADATA_START_MARKER: &[u8; 14] = b"\xAB\xCD\xEFMaxMind.com";

/// Size of the zeroed separator between the search tree and the data section.
pub const DATA_SECTION_SEPARATOR_SIZE: usize = 16;

/// Binary format major version written to the metadata.
pub const FORMAT_MAJOR_VERSION: u16 = 2;

/// Binary format minor version written to the metadata.
pub const FORMAT_MINOR_VERSION: u16 = 0;

/// Largest payload size expressible by a control byte and its extension.
pub const MAX_ENCODED_SIZE: usize = 65_821 + 0x00FF_FFFF;

/// Data-section type tags.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Pointer = 1,
    String = 2,
    Double = 3,
    Bytes = 4,
    Uint16 = 5,
    Uint32 = 6,
    Map = 7,
    Int32 = 8,
    Uint64 = 9,
    Uint128 = 10,
    Array = 11,
    Container = 12,
    EndMarker = 13,
    Bool = 14,
    Float = 15,
}

impl DataType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Pointer),
            2 => Some(Self::String),
            3 => Some(Self::Double),
            4 => Some(Self::Bytes),
            5 => Some(Self::Uint16),
            6 => Some(Self::Uint32),
            7 => Some(Self::Map),
            8 => Some(Self::Int32),
            9 => Some(Self::Uint64),
            10 => Some(Self::Uint128),
            11 => Some(Self::Array),
            12 => Some(Self::Container),
            13 => Some(Self::EndMarker),
            14 => Some(Self::Bool),
            15 => Some(Self::Float),
            _ => None,
        }
    }
}

/// Width in bits of each record (child pointer) of a search tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordSize {
    #[default]
    Bits24,
    Bits28,
    Bits32,
}

impl RecordSize {
    /// Parse from a bit count.
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            24 => Some(Self::Bits24),
            28 => Some(Self::Bits28),
            32 => Some(Self::Bits32),
            _ => None,
        }
    }

    /// Record width in bits.
    pub fn bits(self) -> u16 {
        match self {
            Self::Bits24 => 24,
            Self::Bits28 => 28,
            Self::Bits32 => 32,
        }
    }

    /// Bytes used by one node (two records).
    pub fn node_bytes(self) -> usize {
        self.bits() as usize * 2 / 8
    }

    /// Largest record value that fits.
    pub fn max_value(self) -> u64 {
        (1u64 << self.bits()) - 1
    }

    /// Append one node holding `left` and `right` records.
    pub fn write_node(self, buf: &mut Vec<u8>, left: u64, right: u64) -> Result<()> {
        for value in [left, right] {
            if value > self.max_value() {
                return Err(Error::RecordOverflow {
                    value,
                    record_size: self.bits(),
                });
            }
        }

        let (left, right) = (left as u32, right as u32);
        match self {
            Self::Bits24 => {
                buf.extend_from_slice(&left.to_be_bytes()[1..]);
                buf.extend_from_slice(&right.to_be_bytes()[1..]);
            }
            Self::Bits28 => {
                // The middle byte carries the high nibble of each record.
                buf.extend_from_slice(&left.to_be_bytes()[1..]);
                buf.push((((left >> 24) & 0x0F) << 4) as u8 | ((right >> 24) & 0x0F) as u8);
                buf.extend_from_slice(&right.to_be_bytes()[1..]);
            }
            Self::Bits32 => {
                buf.extend_from_slice(&left.to_be_bytes());
                buf.extend_from_slice(&right.to_be_bytes());
            }
        }
        Ok(())
    }
}

/// IP version declared in the metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpVersion {
    V4,
    #[default]
    V6,
}

impl IpVersion {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::V4 => 4,
            Self::V6 => 6,
        }
    }

    /// Number of address bits the search tree is keyed on.
    pub fn tree_depth(self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }
}
