use crate::regs::{MailboxConfig, MailboxRegisters, MailboxStatus, Register};
use crate::{ChannelId, MAX_CHANNELS, MailboxError, MailboxMessage};
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};
use kernel_sync::{Completion, SpinLock};
use log::{error, info, trace};

/// Receiver side of a bound channel.
pub trait MailboxClient: Send + Sync {
    /// Runs on the interrupt path for every word addressed to the client's
    /// channel. Must not block.
    fn rx_callback(&self, channel: ChannelId, message: MailboxMessage);

    /// Transmit-only clients return `false`; words for their channel are
    /// then dropped like words for an unbound channel.
    fn accepts_rx(&self) -> bool {
        true
    }
}

/// Outcome of one interrupt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IrqReturn {
    /// Nothing was delivered.
    None,
    /// At least one word reached a client.
    Handled,
}

type Slot = Option<Arc<dyn MailboxClient>>;

/// Channel registry and transport over one hardware mailbox.
///
/// The controller is shared by every driver that talks to the firmware; hand
/// out clones of an `Arc<Mailbox<_>>` instead of keeping a global.
///
/// Two locks are involved and never nest the wrong way round:
/// * the register lock, held for exactly one register access;
/// * the channel table lock, held while a slot is inspected or changed.
pub struct Mailbox<R> {
    regs: SpinLock<R>,
    channels: SpinLock<[Slot; MAX_CHANNELS]>,
    completions: [Completion; MAX_CHANNELS],
    num_channels: usize,
    ready: AtomicBool,
}

impl<R: MailboxRegisters> Mailbox<R> {
    /// Controller with all sixteen channels.
    #[must_use]
    pub fn new(regs: R) -> Self {
        Self::with_channels(regs, MAX_CHANNELS)
    }

    /// Controller exposing only the first `num_channels` channels.
    #[must_use]
    pub fn with_channels(regs: R, num_channels: usize) -> Self {
        Self {
            regs: SpinLock::new(regs),
            channels: SpinLock::new([const { None }; MAX_CHANNELS]),
            completions: [const { Completion::new() }; MAX_CHANNELS],
            num_channels: num_channels.min(MAX_CHANNELS),
            ready: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn num_channels(&self) -> usize {
        self.num_channels
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Enables the receive interrupt and opens the registry for requests.
    pub fn startup(&self) {
        let config = MailboxConfig::new().with_data_irq_enable(true);
        self.regs
            .with_lock(|regs| regs.write(Register::Mail0Config, config.into_bits()));
        self.ready.store(true, Ordering::Release);
        info!("mailbox: started with {} channels", self.num_channels);
    }

    /// Disables the receive interrupt. Bindings survive; requests fail until
    /// the next [`Mailbox::startup`].
    pub fn shutdown(&self) {
        self.ready.store(false, Ordering::Release);
        self.regs
            .with_lock(|regs| regs.write(Register::Mail0Config, 0));
        info!("mailbox: shut down");
    }

    fn bind(&self, slot: &mut Slot, index: usize, client: Arc<dyn MailboxClient>) -> ChannelId {
        *slot = Some(client);
        self.completions[index].reinit();
        ChannelId::from_index(index)
    }

    /// Binds `client` to the first free channel other than the firmware
    /// channel.
    ///
    /// # Errors
    /// [`MailboxError::NotReady`] before [`Mailbox::startup`],
    /// [`MailboxError::Busy`] if every channel is bound.
    pub fn request_channel(
        &self,
        client: Arc<dyn MailboxClient>,
    ) -> Result<ChannelId, MailboxError> {
        if !self.is_ready() {
            error!("mailbox: channel requested before startup");
            return Err(MailboxError::NotReady);
        }

        let mut table = self.channels.lock();
        let free = table[..self.num_channels]
            .iter()
            .enumerate()
            .position(|(i, slot)| i != ChannelId::FIRMWARE.index() && slot.is_none());

        let Some(index) = free else {
            error!("mailbox: no free channel available");
            return Err(MailboxError::Busy);
        };

        let id = self.bind(&mut table[index], index, client);
        trace!("mailbox: bound {id}");
        Ok(id)
    }

    /// Binds `client` to the reserved firmware channel.
    ///
    /// # Errors
    /// [`MailboxError::NotReady`] before [`Mailbox::startup`],
    /// [`MailboxError::InvalidArgument`] if the controller has too few
    /// channels, [`MailboxError::AlreadyBound`] if somebody holds it.
    pub fn request_firmware_channel(
        &self,
        client: Arc<dyn MailboxClient>,
    ) -> Result<ChannelId, MailboxError> {
        if !self.is_ready() {
            error!("mailbox: firmware channel requested before startup");
            return Err(MailboxError::NotReady);
        }

        let index = ChannelId::FIRMWARE.index();
        if index >= self.num_channels {
            error!("mailbox: firmware channel index out of range");
            return Err(MailboxError::InvalidArgument);
        }

        let mut table = self.channels.lock();
        if table[index].is_some() {
            error!("mailbox: firmware channel already bound");
            return Err(MailboxError::AlreadyBound(ChannelId::FIRMWARE));
        }

        Ok(self.bind(&mut table[index], index, client))
    }

    /// Unbinds whatever client holds `channel`.
    ///
    /// # Errors
    /// [`MailboxError::ChannelOutOfRange`] or [`MailboxError::NotBound`].
    pub fn free_channel(&self, channel: ChannelId) -> Result<(), MailboxError> {
        let index = self.checked_index(channel)?;
        if self.channels.lock()[index].take().is_none() {
            error!("mailbox: {channel} not bound or already unbound");
            return Err(MailboxError::NotBound(channel));
        }
        trace!("mailbox: freed {channel}");
        Ok(())
    }

    /// Whether a client currently holds `channel`.
    #[must_use]
    pub fn is_bound(&self, channel: ChannelId) -> bool {
        self.checked_index(channel)
            .is_ok_and(|index| self.channels.lock()[index].is_some())
    }

    /// Completion raised whenever a word for `channel` was delivered.
    ///
    /// # Errors
    /// [`MailboxError::ChannelOutOfRange`].
    pub fn completion(&self, channel: ChannelId) -> Result<&Completion, MailboxError> {
        let index = self.checked_index(channel)?;
        Ok(&self.completions[index])
    }

    /// Pushes one word into the outbound mailbox.
    ///
    /// # Errors
    /// [`MailboxError::InvalidArgument`] for a null payload or a word whose
    /// channel selector is not `channel`, [`MailboxError::NotBound`] if no
    /// client holds `channel`.
    pub fn send(&self, channel: ChannelId, message: MailboxMessage) -> Result<(), MailboxError> {
        if message.payload_address() == 0 || message.channel() != channel.as_u8() {
            error!("mailbox: invalid message {:#010x} for {channel}", message.into_bits());
            return Err(MailboxError::InvalidArgument);
        }
        if !self.is_bound(channel) {
            return Err(MailboxError::NotBound(channel));
        }

        self.regs
            .with_lock(|regs| regs.write(Register::Mail1Write, message.into_bits()));
        trace!("mailbox: sent {:#010x} on {channel}", message.into_bits());
        Ok(())
    }

    /// Whether the outbound mailbox has room, i.e. the last word was taken.
    ///
    /// The hardware does not signal transmit completion, so senders that
    /// care poll this.
    #[must_use]
    pub fn poll_tx_ready(&self) -> bool {
        let status = self.regs.with_lock(|regs| regs.read(Register::Mail1Status));
        !MailboxStatus::from_bits(status).full()
    }

    /// Drains the inbound mailbox and dispatches every word.
    ///
    /// Words for channels that are out of range or have no receiving client
    /// are logged and dropped; draining always continues so that one bad
    /// word never hides the ones queued behind it. The line is level
    /// triggered, hence nothing is left in the FIFO on return.
    pub fn handle_irq(&self) -> IrqReturn {
        let mut handled = IrqReturn::None;

        while let Some(word) = self.pop_inbound() {
            let message = MailboxMessage::from_bits(word);
            let index = usize::from(message.channel());

            if index >= self.num_channels {
                error!("mailbox: invalid channel index {index} in message {word:#010x}");
                continue;
            }

            let client = self.channels.lock()[index].clone();
            let Some(client) = client.filter(|c| c.accepts_rx()) else {
                error!("mailbox: unbound channel {index} (message {word:#010x}), dropped");
                continue;
            };

            client.rx_callback(ChannelId::from_index(index), message);
            self.completions[index].complete();
            handled = IrqReturn::Handled;
        }

        handled
    }

    fn pop_inbound(&self) -> Option<u32> {
        let mut regs = self.regs.lock();
        let status = MailboxStatus::from_bits(regs.read(Register::Mail0Status));
        if status.empty() {
            None
        } else {
            Some(regs.read(Register::Mail0Read))
        }
    }

    fn checked_index(&self, channel: ChannelId) -> Result<usize, MailboxError> {
        let index = channel.index();
        if index < self.num_channels {
            Ok(index)
        } else {
            Err(MailboxError::ChannelOutOfRange(channel.as_u8()))
        }
    }
}
