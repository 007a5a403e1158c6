use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

pub type Rate = usize;

pub const BASE_RATE: Rate = 128;
pub const SLOW_RATE: Rate = 2;

/// Lightweight periodic work driven directly from the tick interrupt, such
/// as a buzzer driver advancing its pattern. Must stay short and
/// non-blocking; everything else belongs in the main loop.
pub trait Schedulable {
    fn schedule(&self);
    fn rate(&self) -> Rate;
}

/// Placeholder for builds with no interrupt-context service.
pub struct NoService;

impl Schedulable for NoService {
    fn schedule(&self) {}

    fn rate(&self) -> Rate {
        0
    }
}

/// Rate divider driven by a single fixed-frequency timer interrupt.
///
/// Every base tick the interrupt handler calls [`isr`], which decomposes the
/// tick into logical rates: the sticky slow flag at [`SLOW_RATE`], the
/// embedded [`Schedulable`] service at its own rate, and the sticky fast flag
/// at the base rate itself. Flags are single-producer/single-consumer: only
/// `isr` sets them and only the main loop clears them, so repeated triggers
/// coalesce into one pending signal instead of queueing.
///
/// If the fast flag is still set when the next tick arrives, the main loop
/// has missed its deadline: the overrun counter increments and a non-fatal
/// fault latches for the consumer to surface. Execution is never aborted.
///
/// All state is atomic, so `isr` may run with nested interrupts re-enabled
/// and the struct can be shared by reference across contexts.
///
/// [`isr`]: Scheduler::isr
pub struct Scheduler<S> {
    service: S,
    rate: Rate,
    counter: AtomicU8,
    slow_interval: u8,
    service_interval: u8,
    fast: AtomicBool,
    slow: AtomicBool,
    fault: AtomicBool,
    overrun: AtomicU16,
}

impl<S: Schedulable> Scheduler<S> {
    pub fn new(service: S, rate: Rate) -> Self {
        let service_interval = match service.rate() {
            0 => 0,
            service_rate => (rate / service_rate) as u8,
        };
        Self {
            service,
            rate,
            counter: AtomicU8::new(0),
            slow_interval: (rate / SLOW_RATE) as u8,
            service_interval,
            fast: AtomicBool::new(false),
            slow: AtomicBool::new(false),
            fault: AtomicBool::new(false),
            overrun: AtomicU16::new(0),
        }
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    /// Body of the base-rate timer interrupt. Flag work and the service call
    /// only; no blocking.
    pub fn isr(&self) {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if counter % self.slow_interval == 0 {
            self.slow.store(true, Ordering::Release);
        }
        if self.service_interval != 0 && counter % self.service_interval == 0 {
            self.service.schedule();
        }
        if self.fast.swap(true, Ordering::AcqRel) {
            // Main loop still busy with the previous cycle. The pending flag
            // is coalesced, not queued.
            self.overrun.fetch_add(1, Ordering::Relaxed);
            self.fault.store(true, Ordering::Relaxed);
        }
    }

    pub fn poll_fast(&self) -> bool {
        self.fast.load(Ordering::Acquire)
    }

    pub fn clear_fast(&self) {
        self.fast.store(false, Ordering::Release);
    }

    pub fn poll_slow(&self) -> bool {
        self.slow.load(Ordering::Acquire)
    }

    pub fn clear_slow(&self) {
        self.slow.store(false, Ordering::Release);
    }

    pub fn overrun_count(&self) -> u16 {
        self.overrun.load(Ordering::Relaxed)
    }

    /// Consumes the latched overrun fault, if any.
    pub fn take_fault(&self) -> bool {
        self.fault.swap(false, Ordering::Relaxed)
    }
}

mod test {
    #[test]
    fn test_fast_every_tick() {
        use super::{NoService, Scheduler, BASE_RATE};

        let scheduler = Scheduler::new(NoService, BASE_RATE);
        for _ in 0..BASE_RATE {
            assert_eq!(false, scheduler.poll_fast());
            scheduler.isr();
            assert_eq!(true, scheduler.poll_fast());
            scheduler.clear_fast();
        }
        assert_eq!(0, scheduler.overrun_count());
        assert_eq!(false, scheduler.take_fault());
    }

    #[test]
    fn test_slow_at_divided_rate() {
        use super::{NoService, Scheduler, BASE_RATE, SLOW_RATE};

        let scheduler = Scheduler::new(NoService, BASE_RATE);
        let interval = BASE_RATE / SLOW_RATE;
        for _ in 0..interval - 1 {
            scheduler.isr();
            scheduler.clear_fast();
        }
        assert_eq!(false, scheduler.poll_slow());
        scheduler.isr();
        assert_eq!(true, scheduler.poll_slow());
        scheduler.clear_slow();

        // and again one full period later
        for _ in 0..interval - 1 {
            scheduler.isr();
            scheduler.clear_fast();
            assert_eq!(false, scheduler.poll_slow());
        }
        scheduler.isr();
        assert_eq!(true, scheduler.poll_slow());
    }

    #[test]
    fn test_service_rate() {
        use core::sync::atomic::{AtomicUsize, Ordering};

        use super::{Rate, Schedulable, Scheduler, BASE_RATE};

        struct Counter(AtomicUsize);

        impl Schedulable for Counter {
            fn schedule(&self) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }

            fn rate(&self) -> Rate {
                16
            }
        }

        let scheduler = Scheduler::new(Counter(AtomicUsize::new(0)), BASE_RATE);
        for _ in 0..BASE_RATE {
            scheduler.isr();
            scheduler.clear_fast();
        }
        assert_eq!(16, scheduler.service.0.load(Ordering::Relaxed));
    }

    #[test]
    fn test_overrun_coalesces() {
        use super::{NoService, Scheduler, BASE_RATE};

        let scheduler = Scheduler::new(NoService, BASE_RATE);
        scheduler.isr();
        assert_eq!(0, scheduler.overrun_count());

        // flag never cleared: one overrun per missed window, flag stays set
        scheduler.isr();
        assert_eq!(1, scheduler.overrun_count());
        assert_eq!(true, scheduler.poll_fast());
        scheduler.isr();
        assert_eq!(2, scheduler.overrun_count());
        assert_eq!(true, scheduler.poll_fast());

        assert_eq!(true, scheduler.take_fault());
        assert_eq!(false, scheduler.take_fault());

        // consumer catches up
        scheduler.clear_fast();
        scheduler.isr();
        assert_eq!(2, scheduler.overrun_count());
    }
}
