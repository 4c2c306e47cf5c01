use crate::{MAX_CHANNELS, MailboxError};
use bitfield_struct::bitfield;
use core::fmt;

/// Index of one of the multiplexed mailbox channels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Channel reserved for firmware property transactions (ARM → VC).
    pub const FIRMWARE: Self = Self(8);

    /// Returns `None` for indices that do not fit the 4-bit channel field.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < MAX_CHANNELS {
            Some(Self(index))
        } else {
            None
        }
    }

    /// For indices already checked against the channel table.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_index(index: usize) -> Self {
        debug_assert!(index < MAX_CHANNELS);
        Self(index as u8)
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// One 32-bit mailbox word.
///
/// The low nibble selects the channel; the upper 28 bits carry the payload,
/// which for property transactions is a 16-byte aligned bus address.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct MailboxMessage {
    /// Bits 0–3: channel selector.
    #[bits(4)]
    pub channel: u8,

    /// Bits 4–31: payload, i.e. the address shifted right by four.
    #[bits(28)]
    pub data: u32,
}

impl MailboxMessage {
    /// Combines a channel and a payload address into one word.
    ///
    /// # Errors
    /// [`MailboxError::MisalignedPayload`] if the low four bits of
    /// `address` are set, since they are taken by the channel selector.
    pub const fn compose(channel: ChannelId, address: u32) -> Result<Self, MailboxError> {
        if address & 0xf != 0 {
            return Err(MailboxError::MisalignedPayload(address));
        }
        Ok(Self::new()
            .with_channel(channel.as_u8())
            .with_data(address >> 4))
    }

    /// The payload as the address it was composed from.
    #[must_use]
    pub const fn payload_address(self) -> u32 {
        self.data() << 4
    }
}
