use crate::{
    algorithm::attitude::Attitude,
    hal::{
        controller::{ControlLaw, VehicleState},
        indicator::Indicator,
        nav::{NavStatus, Navigation},
        receiver::InputFrames,
        sensors::InertialSensors,
    },
    scheduler::{Schedulable, Scheduler},
};

/// Cooperative main loop consuming the scheduler's sticky flags.
///
/// On the fast flag, strictly in order: refresh sensors, advance the
/// attitude filter, process input frames, update vehicle state, clear the
/// flag. The ordering is a correctness requirement; the attitude must be
/// computed from freshly latched sensor data before any downstream consumer
/// reads it. On the slow flag: run the control law and toggle the status
/// indicator. The loop runs to completion each pass and is only ever
/// preempted by the interrupt setting flags.
pub struct MainLoop<'a, S, SEN, NAV, RCV, VST, CTL, IND> {
    scheduler: &'a Scheduler<S>,
    attitude: Attitude,
    sensors: SEN,
    nav: NAV,
    receiver: RCV,
    vehicle: VST,
    control: CTL,
    indicator: IND,
}

impl<'a, S, SEN, NAV, RCV, VST, CTL, IND> MainLoop<'a, S, SEN, NAV, RCV, VST, CTL, IND>
where
    S: Schedulable,
    SEN: InertialSensors,
    NAV: Navigation,
    RCV: InputFrames,
    VST: VehicleState,
    CTL: ControlLaw,
    IND: Indicator,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scheduler: &'a Scheduler<S>,
        attitude: Attitude,
        sensors: SEN,
        nav: NAV,
        receiver: RCV,
        vehicle: VST,
        control: CTL,
        indicator: IND,
    ) -> Self {
        Self { scheduler, attitude, sensors, nav, receiver, vehicle, control, indicator }
    }

    pub fn attitude(&self) -> &Attitude {
        &self.attitude
    }

    /// Arms attitude reinitialization on the next fast cycle.
    pub fn reset_attitude(&mut self) {
        self.attitude.reset();
    }

    /// One pass of the main loop; call repeatedly from the run-to-completion
    /// context.
    pub fn run_once(&mut self) {
        if self.scheduler.poll_fast() {
            self.sensors.refresh();
            let gyro = self.sensors.angular_rate();
            let acceleration = self.sensors.acceleration();
            let heading = self
                .nav
                .status()
                .contains(NavStatus::HEADING_OK)
                .then(|| self.nav.heading_correction());
            self.attitude.update(&gyro, &acceleration, heading);
            self.receiver.process();
            self.vehicle.update();
            self.scheduler.clear_fast();
        }
        if self.scheduler.poll_slow() {
            self.control.control();
            self.indicator.status_toggle();
            self.scheduler.clear_slow();
        }
        if self.scheduler.take_fault() {
            warn!("cycle overrun, {} total", self.scheduler.overrun_count());
            self.indicator.fault();
        }
    }
}

#[cfg(test)]
mod test {
    use core::cell::RefCell;

    use nalgebra::Vector3;
    use std::{rc::Rc, vec::Vec};

    use crate::hal::{
        controller::{ControlLaw, VehicleState},
        indicator::Indicator,
        nav::{HeadingCorrection, NavStatus, Navigation},
        receiver::InputFrames,
        sensors::InertialSensors,
    };

    #[derive(Clone, Default)]
    struct Trace(Rc<RefCell<Vec<&'static str>>>);

    impl Trace {
        fn push(&self, step: &'static str) {
            self.0.borrow_mut().push(step);
        }
    }

    struct Sensors(Trace);

    impl InertialSensors for Sensors {
        fn refresh(&mut self) {
            self.0.push("sensors");
        }

        fn angular_rate(&self) -> Vector3<f32> {
            Vector3::new(0.0, 0.0, 0.0)
        }

        fn acceleration(&self) -> Vector3<f32> {
            Vector3::new(0.0, 0.0, 1.0)
        }
    }

    struct Nav;

    impl Navigation for Nav {
        fn status(&self) -> NavStatus {
            NavStatus::empty()
        }

        fn heading_correction(&self) -> HeadingCorrection {
            HeadingCorrection::default()
        }
    }

    struct Receiver(Trace);

    impl InputFrames for Receiver {
        fn process(&mut self) {
            self.0.push("receiver");
        }
    }

    struct Vehicle(Trace);

    impl VehicleState for Vehicle {
        fn update(&mut self) {
            self.0.push("vehicle");
        }
    }

    struct Control(Trace);

    impl ControlLaw for Control {
        fn control(&mut self) {
            self.0.push("control");
        }
    }

    struct Leds(Trace);

    impl Indicator for Leds {
        fn fault(&mut self) {
            self.0.push("fault");
        }

        fn status_toggle(&mut self) {
            self.0.push("status");
        }
    }

    #[test]
    fn test_fast_cycle_ordering() {
        use super::MainLoop;
        use crate::{
            algorithm::attitude::Attitude,
            config,
            scheduler::{NoService, Scheduler, BASE_RATE},
        };

        let trace = Trace::default();
        let scheduler = Scheduler::new(NoService, BASE_RATE);
        let attitude = Attitude::new(BASE_RATE, config::Attitude::default());
        let mut main_loop = MainLoop::new(
            &scheduler,
            attitude,
            Sensors(trace.clone()),
            Nav,
            Receiver(trace.clone()),
            Vehicle(trace.clone()),
            Control(trace.clone()),
            Leds(trace.clone()),
        );

        // nothing pending
        main_loop.run_once();
        assert_eq!(0, trace.0.borrow().len());

        scheduler.isr();
        main_loop.run_once();
        assert_eq!(
            std::vec!["sensors", "receiver", "vehicle"],
            *trace.0.borrow()
        );
        assert_eq!(false, scheduler.poll_fast());
    }

    #[test]
    fn test_slow_cycle_and_fault() {
        use super::MainLoop;
        use crate::{
            algorithm::attitude::Attitude,
            config,
            scheduler::{NoService, Scheduler, BASE_RATE, SLOW_RATE},
        };

        let trace = Trace::default();
        let scheduler = Scheduler::new(NoService, BASE_RATE);
        let attitude = Attitude::new(BASE_RATE, config::Attitude::default());
        let mut main_loop = MainLoop::new(
            &scheduler,
            attitude,
            Sensors(trace.clone()),
            Nav,
            Receiver(trace.clone()),
            Vehicle(trace.clone()),
            Control(trace.clone()),
            Leds(trace.clone()),
        );

        // two ticks without an intervening pass: one overrun, then a full
        // slow period so the slow flag is pending as well
        scheduler.isr();
        scheduler.isr();
        scheduler.clear_fast();
        for _ in 0..BASE_RATE / SLOW_RATE - 3 {
            scheduler.isr();
            scheduler.clear_fast();
        }
        scheduler.isr();
        main_loop.run_once();

        let steps = trace.0.borrow();
        assert!(steps.contains(&"control"));
        assert!(steps.contains(&"status"));
        assert!(steps.contains(&"fault"));
        assert_eq!(1, scheduler.overrun_count());
    }
}
