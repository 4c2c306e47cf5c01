use kernel_sync::{Completion, Monotonic};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct HostClock(Instant);

impl Monotonic for HostClock {
    fn now(&self) -> Duration {
        self.0.elapsed()
    }

    fn relax(&self) {
        thread::yield_now();
    }
}

#[test]
fn completion_wakes_waiter_on_other_thread() {
    let c = Arc::new(Completion::new());
    let producer = {
        let c = Arc::clone(&c);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            c.complete();
        })
    };

    let clock = HostClock(Instant::now());
    assert!(c.wait_timeout(&clock, Duration::from_secs(5)));
    producer.join().unwrap();
    assert!(!c.is_done());
}

#[test]
fn completion_times_out_without_producer() {
    let c = Completion::new();
    let clock = HostClock(Instant::now());
    let started = Instant::now();
    assert!(!c.wait_timeout(&clock, Duration::from_millis(50)));
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn producer_writes_are_visible_after_wait() {
    use std::sync::atomic::{AtomicU32, Ordering};

    let data = Arc::new(AtomicU32::new(0));
    let c = Arc::new(Completion::new());
    {
        let data = Arc::clone(&data);
        let c = Arc::clone(&c);
        thread::spawn(move || {
            data.store(0xdead_beef, Ordering::Relaxed);
            c.complete();
        });
    }

    let clock = HostClock(Instant::now());
    assert!(c.wait_timeout(&clock, Duration::from_secs(5)));
    assert_eq!(data.load(Ordering::Relaxed), 0xdead_beef);
}
