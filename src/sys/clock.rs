use core::sync::atomic::{AtomicU16, Ordering};

/// Millisecond clock backed by a 16-bit wrapping counter.
///
/// The counter is advanced by a periodic 1kHz interrupt calling [`tick`] and
/// may be read from any context; every access is a single atomic operation,
/// so readers never observe a torn value. Timestamps wrap modulo 2^16 and all
/// comparisons are performed with wrapping arithmetic: [`is_past`] is valid
/// for horizons up to 32767ms, [`elapsed`] up to 65535ms.
///
/// [`tick`]: MsClock::tick
/// [`is_past`]: MsClock::is_past
/// [`elapsed`]: MsClock::elapsed
#[derive(Default)]
pub struct MsClock(AtomicU16);

impl MsClock {
    pub const fn new() -> Self {
        Self(AtomicU16::new(0))
    }

    /// Advances the clock by one millisecond. Interrupt context only.
    pub fn tick(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn now(&self) -> u16 {
        self.0.load(Ordering::Relaxed)
    }

    /// Returns a timestamp `ms` milliseconds in the future. The extra +1
    /// guarantees that a just-created deadline is never already expired, no
    /// matter how close the next tick is.
    pub fn deadline(&self, ms: u16) -> u16 {
        self.now().wrapping_add(ms).wrapping_add(1)
    }

    /// Whether timestamp `t` is in the past. Valid for horizons up to
    /// 32767ms; beyond that the signed difference changes sign.
    pub fn is_past(&self, t: u16) -> bool {
        (t.wrapping_sub(self.now()) as i16) < 0
    }

    /// Milliseconds elapsed since timestamp `t`, up to 65535ms.
    pub fn elapsed(&self, t: u16) -> u16 {
        self.now().wrapping_sub(t)
    }

    /// Busy-waits for `ms` milliseconds. The loop only polls the counter, so
    /// interrupts keep firing and [`tick`](MsClock::tick) keeps advancing the
    /// clock during the wait.
    pub fn wait(&self, ms: u16) {
        let deadline = self.deadline(ms);
        while !self.is_past(deadline) {}
    }
}

mod test {
    #[test]
    fn test_deadline_never_expired() {
        use super::MsClock;

        let clock = MsClock::new();
        assert_eq!(false, clock.is_past(clock.now()));
        assert_eq!(false, clock.is_past(clock.deadline(0)));

        clock.tick();
        let deadline = clock.deadline(0);
        assert_eq!(false, clock.is_past(deadline));
        clock.tick();
        assert_eq!(false, clock.is_past(deadline));
        clock.tick();
        assert_eq!(true, clock.is_past(deadline));
    }

    #[test]
    fn test_wraparound_ordering() {
        use super::MsClock;

        let clock = MsClock::new();
        for _ in 0..u16::MAX - 2 {
            clock.tick();
        }
        assert_eq!(u16::MAX - 2, clock.now());

        // A deadline armed just before wraparound still orders correctly
        // once the counter has wrapped.
        let deadline = clock.deadline(10);
        assert_eq!(8, deadline);
        for _ in 0..10 {
            clock.tick();
        }
        assert_eq!(false, clock.is_past(deadline));
        clock.tick();
        clock.tick();
        assert_eq!(true, clock.is_past(deadline));
    }

    #[test]
    fn test_elapsed_across_wraparound() {
        use super::MsClock;

        let clock = MsClock::new();
        for _ in 0..u16::MAX {
            clock.tick();
        }
        let timestamp = clock.now();
        for _ in 0..100 {
            clock.tick();
        }
        assert_eq!(100, clock.elapsed(timestamp));
    }

    #[test]
    fn test_wait() {
        use std::boxed::Box;
        use std::{thread, time::Duration};

        use super::MsClock;

        let clock: &'static MsClock = Box::leak(Box::new(MsClock::new()));
        let ticker = thread::spawn(move || {
            for _ in 0..100 {
                clock.tick();
                thread::sleep(Duration::from_micros(100));
            }
        });
        clock.wait(5);
        assert!(clock.now() >= 6);
        ticker.join().unwrap();
    }
}
