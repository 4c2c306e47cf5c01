//! Property-channel message layout.
//!
//! The driver only ever issues single-register PoE HAT requests, so every
//! message has the same nine-word shape:
//!
//! | word | content                                  |
//! |------|------------------------------------------|
//! | 0    | total size in bytes (36)                 |
//! | 1    | request code (0 = process request)       |
//! | 2    | property tag                             |
//! | 3    | tag value buffer size in bytes (12)      |
//! | 4    | tag request/response indicator           |
//! | 5    | register                                 |
//! | 6    | value (ignored by GET requests)          |
//! | 7, 8 | zero                                     |
//!
//! All words are little-endian on the wire.

use bitfield_struct::bitfield;
use core::fmt;

/// Words in one property message.
pub const PROPERTY_WORDS: usize = 9;

/// Byte size of one property message.
#[allow(clippy::cast_possible_truncation)]
pub const PROPERTY_BUFFER_SIZE: u32 = (PROPERTY_WORDS * size_of::<u32>()) as u32;

/// Byte size of the tag value buffer (register, value, padding).
#[allow(clippy::cast_possible_truncation)]
pub const TAG_VALUE_SIZE: u32 = (3 * size_of::<u32>()) as u32;

/// Request code asking the firmware to process the buffer.
pub const PROCESS_REQUEST: u32 = 0;

/// PoE HAT register holding the current fan duty (0..=255).
pub const POE_DUTY_REG: u32 = 0;

/// Word indices within a property message.
pub mod word {
    pub const SIZE: usize = 0;
    pub const CODE: usize = 1;
    pub const TAG: usize = 2;
    pub const VALUE_SIZE: usize = 3;
    pub const STATUS: usize = 4;
    pub const REG: usize = 5;
    pub const VALUE: usize = 6;
}

/// Firmware property tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PropertyTag(u32);

impl PropertyTag {
    pub const GET_POE_HAT_VALUE: Self = Self(0x0003_0049);
    pub const SET_POE_HAT_VALUE: Self = Self(0x0003_8049);

    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Set tags differ from their get counterpart by bit 15.
    #[must_use]
    pub const fn is_set(self) -> bool {
        self.0 & 0x8000 != 0
    }
}

impl fmt::Display for PropertyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Tag request/response indicator (word 4).
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct TagStatus {
    /// Bits 0–30: length of the response value in bytes.
    #[bits(31)]
    pub length: u32,
    /// Bit 31: set by the firmware once it processed the tag.
    pub is_response: bool,
}

/// One single-register property request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PropertyRequest {
    pub tag: PropertyTag,
    pub reg: u32,
    pub value: u32,
}

impl PropertyRequest {
    /// Host-order words of the request; the indicator is always "request".
    #[must_use]
    pub const fn encode(&self) -> [u32; PROPERTY_WORDS] {
        let mut words = [0; PROPERTY_WORDS];
        words[word::SIZE] = PROPERTY_BUFFER_SIZE;
        words[word::CODE] = PROCESS_REQUEST;
        words[word::TAG] = self.tag.as_u32();
        words[word::VALUE_SIZE] = TAG_VALUE_SIZE;
        words[word::STATUS] = TagStatus::new().into_bits();
        words[word::REG] = self.reg;
        words[word::VALUE] = self.value;
        words
    }
}
