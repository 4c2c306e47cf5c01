use kernel_firmware::dma::PAGE_SIZE;
use kernel_firmware::property::{PROPERTY_WORDS, word};
use kernel_firmware::{
    CoherentAllocator, DmaRegion, Firmware, FirmwareConfig, FirmwareError, PropertyInterface,
    PropertyTag,
};
use kernel_mailbox::{ChannelId, Mailbox, MailboxError, MailboxRegisters, Register};
use kernel_sync::StdClock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Behaviour {
    Ack,
    Nak,
    Silent,
    /// Acks one request after the given delay, then goes back to `Ack`.
    Late(Duration),
}

#[derive(Clone)]
struct SimRegion {
    bus: u32,
    words: Arc<[AtomicU32]>,
}

impl DmaRegion for SimRegion {
    fn bus_address(&self) -> u32 {
        self.bus
    }

    fn read_word(&self, index: usize) -> u32 {
        self.words[index].load(Ordering::SeqCst)
    }

    fn write_word(&self, index: usize, value: u32) {
        self.words[index].store(value, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Memory {
    next_page: u32,
    misalign: u32,
    exhausted: bool,
    live: HashMap<u32, SimRegion>,
    freed: Vec<(u32, usize)>,
}

/// Coherent memory the simulated firmware can resolve by bus address.
#[derive(Clone, Default)]
struct SimAllocator(Arc<Mutex<Memory>>);

impl SimAllocator {
    fn resolve(&self, bus: u32) -> Option<SimRegion> {
        self.0.lock().unwrap().live.get(&bus).cloned()
    }

    fn freed(&self) -> Vec<(u32, usize)> {
        self.0.lock().unwrap().freed.clone()
    }

    fn live(&self) -> usize {
        self.0.lock().unwrap().live.len()
    }
}

impl CoherentAllocator for SimAllocator {
    type Region = SimRegion;

    fn alloc_coherent(&self, size: usize) -> Option<SimRegion> {
        let mut mem = self.0.lock().unwrap();
        if mem.exhausted {
            return None;
        }
        mem.next_page += 1;
        let bus = 0x3b00_0000 + mem.next_page * PAGE_SIZE as u32 + mem.misalign;
        let words: Arc<[AtomicU32]> = (0..size / 4).map(|_| AtomicU32::new(0xdead_beef)).collect();
        let region = SimRegion { bus, words };
        mem.live.insert(bus, region.clone());
        Some(region)
    }

    fn free_coherent(&self, region: SimRegion, size: usize) {
        let mut mem = self.0.lock().unwrap();
        mem.live.remove(&region.bus);
        mem.freed.push((region.bus, size));
    }
}

/// Register file whose outbound mailbox feeds the simulated firmware.
struct SimRegs {
    inbound: Arc<Mutex<VecDeque<u32>>>,
    outbound: Sender<u32>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MailboxRegisters for SimRegs {
    fn read(&mut self, reg: Register) -> u32 {
        let mut inbound = self.inbound.lock().unwrap();
        match reg {
            Register::Mail0Read => inbound.pop_front().unwrap_or(0),
            Register::Mail0Status if inbound.is_empty() => 0x4000_0000,
            _ => 0,
        }
    }

    fn write(&mut self, reg: Register, value: u32) {
        if reg == Register::Mail1Write {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.outbound.send(value).unwrap();
        }
    }
}

struct SimFirmware {
    mailbox: Arc<Mailbox<SimRegs>>,
    allocator: SimAllocator,
    behaviour: Arc<Mutex<Behaviour>>,
    poe_reg: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<[u32; PROPERTY_WORDS]>>>,
    max_in_flight: Arc<AtomicUsize>,
}

impl SimFirmware {
    fn start() -> Self {
        let (tx, rx) = channel();
        let inbound = Arc::new(Mutex::new(VecDeque::new()));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let mailbox = Arc::new(Mailbox::new(SimRegs {
            inbound: inbound.clone(),
            outbound: tx,
            in_flight: in_flight.clone(),
            max_in_flight: max_in_flight.clone(),
        }));
        mailbox.startup();

        let sim = Self {
            mailbox,
            allocator: SimAllocator::default(),
            behaviour: Arc::new(Mutex::new(Behaviour::Ack)),
            poe_reg: Arc::new(AtomicU32::new(0)),
            requests: Arc::default(),
            max_in_flight,
        };

        let worker = Worker {
            mailbox: Arc::downgrade(&sim.mailbox),
            allocator: sim.allocator.clone(),
            behaviour: sim.behaviour.clone(),
            poe_reg: sim.poe_reg.clone(),
            requests: sim.requests.clone(),
            inbound,
            in_flight,
        };
        thread::spawn(move || worker.run(&rx));
        sim
    }

    fn set_behaviour(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    fn engine(&self, timeout: Duration) -> Firmware<SimRegs, SimAllocator, StdClock> {
        Firmware::new(
            self.mailbox.clone(),
            self.allocator.clone(),
            StdClock::new(),
            FirmwareConfig { timeout },
        )
        .unwrap()
    }

    fn requests(&self) -> Vec<[u32; PROPERTY_WORDS]> {
        self.requests.lock().unwrap().clone()
    }
}

struct Worker {
    mailbox: Weak<Mailbox<SimRegs>>,
    allocator: SimAllocator,
    behaviour: Arc<Mutex<Behaviour>>,
    poe_reg: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<[u32; PROPERTY_WORDS]>>>,
    inbound: Arc<Mutex<VecDeque<u32>>>,
    in_flight: Arc<AtomicUsize>,
}

impl Worker {
    fn ack(&self, region: &SimRegion, request: &[u32; PROPERTY_WORDS]) {
        let tag = PropertyTag::new(request[word::TAG]);
        if tag.is_set() {
            self.poe_reg.store(request[word::VALUE], Ordering::SeqCst);
        } else {
            let value = self.poe_reg.load(Ordering::SeqCst);
            region.write_word(word::VALUE, value.to_le());
        }
        region.write_word(word::STATUS, 0x8000_0004u32.to_le());
    }

    fn run(self, rx: &Receiver<u32>) {
        while let Ok(message) = rx.recv() {
            let behaviour = *self.behaviour.lock().unwrap();
            let region = self.allocator.resolve(message & !0xf);
            let region = region.expect("firmware handed an unknown bus address");

            let request: [u32; PROPERTY_WORDS] =
                std::array::from_fn(|i| u32::from_le(region.read_word(i)));
            self.requests.lock().unwrap().push(request);

            thread::sleep(Duration::from_millis(2));
            match behaviour {
                Behaviour::Silent => continue,
                Behaviour::Nak => {}
                Behaviour::Ack => self.ack(&region, &request),
                Behaviour::Late(delay) => {
                    *self.behaviour.lock().unwrap() = Behaviour::Ack;
                    thread::sleep(delay);
                    self.ack(&region, &request);
                }
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inbound.lock().unwrap().push_back(message);
            match self.mailbox.upgrade() {
                Some(mailbox) => {
                    mailbox.handle_irq();
                }
                None => return,
            }
        }
    }
}

#[test]
fn set_request_matches_wire_format() {
    let sim = SimFirmware::start();
    let fw = sim.engine(Duration::from_secs(1));

    fw.set_duty(170).unwrap();

    assert_eq!(
        sim.requests(),
        vec![[36, 0, 0x0003_8049, 12, 0, 0, 170, 0, 0]]
    );
    assert_eq!(sim.poe_reg.load(Ordering::SeqCst), 170);
}

#[test]
fn get_returns_firmware_value() {
    let sim = SimFirmware::start();
    let fw = sim.engine(Duration::from_secs(1));
    sim.poe_reg.store(128, Ordering::SeqCst);

    assert_eq!(fw.get_duty(), Ok(128));
    assert_eq!(sim.requests()[0][word::TAG], 0x0003_0049);

    fw.set_poe_hat_value(0, 42).unwrap();
    assert_eq!(fw.get_poe_hat_value(0), Ok(42));
}

#[test]
fn set_returns_no_value() {
    let sim = SimFirmware::start();
    let fw = sim.engine(Duration::from_secs(1));
    assert_eq!(
        fw.transact(PropertyTag::SET_POE_HAT_VALUE, 0, 9, false),
        Ok(None)
    );
}

#[test]
fn unacknowledged_tag_is_io_error() {
    let sim = SimFirmware::start();
    let fw = sim.engine(Duration::from_secs(1));
    sim.set_behaviour(Behaviour::Nak);

    assert_eq!(
        fw.get_duty(),
        Err(FirmwareError::Io {
            tag: PropertyTag::GET_POE_HAT_VALUE
        })
    );
    assert!(!fw.is_busy());
}

#[test]
fn silent_firmware_times_out_and_releases_the_lock() {
    let sim = SimFirmware::start();
    let timeout = Duration::from_millis(50);
    let fw = sim.engine(timeout);
    sim.set_behaviour(Behaviour::Silent);

    let start = Instant::now();
    assert_eq!(fw.set_duty(1), Err(FirmwareError::Timeout));
    let elapsed = start.elapsed();
    assert!(elapsed >= timeout, "gave up after {elapsed:?}");
    assert!(elapsed < timeout * 20, "took {elapsed:?}");
    assert!(!fw.is_busy());

    sim.set_behaviour(Behaviour::Ack);
    assert_eq!(fw.set_duty(2), Ok(()));
}

#[test]
fn late_response_does_not_complete_the_next_request() {
    let sim = SimFirmware::start();
    let timeout = Duration::from_millis(200);
    let fw = sim.engine(timeout);
    sim.set_behaviour(Behaviour::Late(Duration::from_millis(250)));

    assert_eq!(fw.set_duty(1), Err(FirmwareError::Timeout));

    // Sent before the first response shows up, answered after it.
    assert_eq!(fw.set_duty(2), Ok(()));
    assert_eq!(sim.poe_reg.load(Ordering::SeqCst), 2);
    assert_eq!(fw.get_duty(), Ok(2));
    assert_eq!(sim.requests().len(), 3);
}

#[test]
fn buffers_are_freed_with_their_allocation_size() {
    let sim = SimFirmware::start();
    let fw = sim.engine(Duration::from_millis(50));

    fw.set_duty(10).unwrap();
    sim.set_behaviour(Behaviour::Nak);
    fw.set_duty(11).unwrap_err();
    sim.set_behaviour(Behaviour::Silent);
    fw.set_duty(12).unwrap_err();

    let freed = sim.allocator.freed();
    assert_eq!(freed.len(), 3);
    assert!(freed.iter().all(|&(_, size)| size == PAGE_SIZE));
    assert_eq!(sim.allocator.live(), 0);
}

#[test]
fn allocation_failure_sends_nothing() {
    let sim = SimFirmware::start();
    let fw = sim.engine(Duration::from_secs(1));
    sim.allocator.0.lock().unwrap().exhausted = true;

    assert_eq!(fw.set_duty(5), Err(FirmwareError::OutOfMemory));
    assert!(sim.requests().is_empty());
}

#[test]
fn misaligned_buffer_is_rejected_before_sending() {
    let sim = SimFirmware::start();
    let fw = sim.engine(Duration::from_secs(1));
    sim.allocator.0.lock().unwrap().misalign = 4;

    assert!(matches!(
        fw.set_duty(5),
        Err(FirmwareError::Mailbox(MailboxError::MisalignedPayload(_)))
    ));
    assert!(sim.requests().is_empty());
    assert_eq!(sim.allocator.live(), 0);
}

#[test]
fn transactions_are_serialized_across_threads() {
    let sim = SimFirmware::start();
    let fw = Arc::new(sim.engine(Duration::from_secs(1)));

    let handles: Vec<_> = (0..4u8)
        .map(|t| {
            let fw = fw.clone();
            thread::spawn(move || {
                for i in 0..5u8 {
                    fw.set_duty(t * 10 + i).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(sim.requests().len(), 20);
    assert_eq!(sim.max_in_flight.load(Ordering::SeqCst), 1);
}

#[test]
fn firmware_channel_has_a_single_engine() {
    let sim = SimFirmware::start();
    let fw = sim.engine(Duration::from_secs(1));
    assert_eq!(fw.channel(), ChannelId::FIRMWARE);

    let second = Firmware::new(
        sim.mailbox.clone(),
        sim.allocator.clone(),
        StdClock::new(),
        FirmwareConfig::default(),
    );
    assert!(matches!(
        second,
        Err(FirmwareError::Mailbox(MailboxError::AlreadyBound(_)))
    ));

    drop(fw);
    assert!(!sim.mailbox.is_bound(ChannelId::FIRMWARE));
    let _again = sim.engine(Duration::from_secs(1));
}

#[test]
fn engine_needs_a_started_mailbox() {
    let sim = SimFirmware::start();
    sim.mailbox.shutdown();

    let result = Firmware::new(
        sim.mailbox.clone(),
        sim.allocator.clone(),
        StdClock::new(),
        FirmwareConfig::default(),
    );
    assert!(matches!(
        result,
        Err(FirmwareError::Mailbox(MailboxError::NotReady))
    ));
}
