use crate::dma::{CoherentAllocator, CoherentBuffer};
use crate::property::{
    POE_DUTY_REG, PROPERTY_BUFFER_SIZE, PropertyRequest, PropertyTag, TagStatus, word,
};
use crate::{FirmwareConfig, FirmwareError};
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use kernel_mailbox::{ChannelId, Mailbox, MailboxClient, MailboxMessage, MailboxRegisters};
use kernel_sync::{Monotonic, TicketLock};
use log::{debug, error, info, trace, warn};

/// Synchronous property requests against the VideoCore firmware.
///
/// The GET/SET helpers are provided on top of [`PropertyInterface::transact`]
/// and are what the PWM driver consumes; tests substitute the whole trait.
pub trait PropertyInterface: Send + Sync {
    /// Runs one request/response round-trip.
    ///
    /// Returns the response value for `is_get` requests and `None` otherwise.
    ///
    /// # Errors
    /// See [`FirmwareError`].
    fn transact(
        &self,
        tag: PropertyTag,
        reg: u32,
        value: u32,
        is_get: bool,
    ) -> Result<Option<u32>, FirmwareError>;

    /// # Errors
    /// See [`PropertyInterface::transact`].
    fn get_poe_hat_value(&self, reg: u32) -> Result<u32, FirmwareError> {
        self.transact(PropertyTag::GET_POE_HAT_VALUE, reg, 0, true)
            .map(Option::unwrap_or_default)
    }

    /// # Errors
    /// See [`PropertyInterface::transact`].
    fn set_poe_hat_value(&self, reg: u32, value: u32) -> Result<(), FirmwareError> {
        self.transact(PropertyTag::SET_POE_HAT_VALUE, reg, value, false)
            .map(drop)
    }

    /// Current fan duty on the 0..=255 scale.
    ///
    /// # Errors
    /// See [`PropertyInterface::transact`].
    fn get_duty(&self) -> Result<u32, FirmwareError> {
        self.get_poe_hat_value(POE_DUTY_REG)
    }

    /// # Errors
    /// See [`PropertyInterface::transact`].
    fn set_duty(&self, duty: u8) -> Result<(), FirmwareError> {
        self.set_poe_hat_value(POE_DUTY_REG, u32::from(duty))
    }
}

impl<P: PropertyInterface + ?Sized> PropertyInterface for Arc<P> {
    fn transact(
        &self,
        tag: PropertyTag,
        reg: u32,
        value: u32,
        is_get: bool,
    ) -> Result<Option<u32>, FirmwareError> {
        (**self).transact(tag, reg, value, is_get)
    }
}

/// Receiver bound to the firmware channel.
///
/// The firmware echoes the request word, so the echo is the only thing that
/// ties a response to the transaction waiting for it. Words left over from a
/// timed-out transaction still raise the channel completion and are told
/// apart here.
#[derive(Default)]
struct ResponseListener {
    expected: AtomicU32,
    answered: AtomicBool,
}

impl ResponseListener {
    /// Arms the listener for `message`; must happen before it is sent.
    fn expect(&self, message: MailboxMessage) {
        self.answered.store(false, Ordering::Relaxed);
        self.expected.store(message.into_bits(), Ordering::Release);
    }

    fn is_answered(&self) -> bool {
        self.answered.load(Ordering::Acquire)
    }
}

impl MailboxClient for ResponseListener {
    fn rx_callback(&self, channel: ChannelId, message: MailboxMessage) {
        let bits = message.into_bits();
        if bits == self.expected.load(Ordering::Acquire) {
            trace!("firmware: response {bits:#010x} on {channel}");
            self.answered.store(true, Ordering::Release);
        } else {
            warn!("firmware: dropping stale response {bits:#010x} on {channel}");
        }
    }
}

/// Property transaction engine over the firmware mailbox channel.
///
/// Owns the firmware channel for its whole lifetime, so there is at most one
/// engine per mailbox. Every PWM device shares it through an `Arc`, which
/// makes its transaction lock global across all of them: the firmware keeps
/// a single request in flight and cannot tell interleaved ones apart.
pub struct Firmware<R, A, C>
where
    R: MailboxRegisters,
    A: CoherentAllocator,
    C: Monotonic + Send + Sync,
{
    mailbox: Arc<Mailbox<R>>,
    allocator: A,
    clock: C,
    config: FirmwareConfig,
    channel: ChannelId,
    listener: Arc<ResponseListener>,
    transaction: TicketLock<()>,
}

impl<R, A, C> Firmware<R, A, C>
where
    R: MailboxRegisters,
    A: CoherentAllocator,
    C: Monotonic + Send + Sync,
{
    /// Binds the firmware channel of `mailbox`.
    ///
    /// # Errors
    /// [`FirmwareError::Mailbox`] if the channel cannot be bound, e.g. the
    /// controller is not started or another engine holds the channel.
    pub fn new(
        mailbox: Arc<Mailbox<R>>,
        allocator: A,
        clock: C,
        config: FirmwareConfig,
    ) -> Result<Self, FirmwareError> {
        let listener = Arc::new(ResponseListener::default());
        let channel = mailbox
            .request_firmware_channel(listener.clone())
            .inspect_err(|e| error!("firmware: failed to request mailbox channel: {e}"))?;
        info!("firmware: bound {channel}, timeout {:?}", config.timeout);

        Ok(Self {
            mailbox,
            allocator,
            clock,
            config,
            channel,
            listener,
            transaction: TicketLock::new(()),
        })
    }

    #[must_use]
    pub const fn channel(&self) -> ChannelId {
        self.channel
    }

    #[must_use]
    pub const fn config(&self) -> &FirmwareConfig {
        &self.config
    }

    /// Whether a transaction currently holds the transaction lock.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.transaction.is_locked()
    }

    fn round_trip(
        &self,
        request: &PropertyRequest,
        is_get: bool,
    ) -> Result<Option<u32>, FirmwareError> {
        let tag = request.tag;
        let buffer = CoherentBuffer::new(&self.allocator, PROPERTY_BUFFER_SIZE as usize)
            .inspect_err(|_| error!("firmware: failed to allocate property buffer"))?;

        for (index, value) in request.encode().into_iter().enumerate() {
            buffer.write(index, value);
        }
        debug!(
            "firmware: sending tag {tag} reg {:#010x} val {}",
            buffer.read(word::REG),
            buffer.read(word::VALUE)
        );

        let message = MailboxMessage::compose(self.channel, buffer.bus_address())?;
        let completion = self.mailbox.completion(self.channel)?;

        // Declared after `buffer`, so released before it is freed.
        let _serialized = self.transaction.lock();
        self.listener.expect(message);
        completion.reinit();

        self.mailbox
            .send(self.channel, message)
            .inspect_err(|e| error!("firmware: failed to send message: {e}"))?;

        // Stale responses wake the waiter too; the deadline still counts
        // from the send.
        let start = self.clock.now();
        loop {
            let elapsed = self.clock.now().saturating_sub(start);
            let remaining = self.config.timeout.saturating_sub(elapsed);
            if !completion.wait_timeout(&self.clock, remaining) {
                error!("firmware: timeout waiting for response to tag {tag}");
                return Err(FirmwareError::Timeout);
            }
            if self.listener.is_answered() {
                break;
            }
        }

        let status = TagStatus::from_bits(buffer.read(word::STATUS));
        if !status.is_response() {
            error!("firmware: tag {tag} not acknowledged");
            return Err(FirmwareError::Io { tag });
        }

        Ok(is_get.then(|| buffer.read(word::VALUE)))
    }
}

impl<R, A, C> PropertyInterface for Firmware<R, A, C>
where
    R: MailboxRegisters,
    A: CoherentAllocator,
    C: Monotonic + Send + Sync,
{
    fn transact(
        &self,
        tag: PropertyTag,
        reg: u32,
        value: u32,
        is_get: bool,
    ) -> Result<Option<u32>, FirmwareError> {
        self.round_trip(&PropertyRequest { tag, reg, value }, is_get)
    }
}

impl<R, A, C> Drop for Firmware<R, A, C>
where
    R: MailboxRegisters,
    A: CoherentAllocator,
    C: Monotonic + Send + Sync,
{
    fn drop(&mut self) {
        if let Err(e) = self.mailbox.free_channel(self.channel) {
            warn!("firmware: failed to release {}: {e}", self.channel);
        }
    }
}
