/// Higher-level vehicle state refresh, run once per fast cycle after input
/// frames have been processed.
pub trait VehicleState {
    fn update(&mut self);
}

/// Control-law computation, run once per slow cycle.
pub trait ControlLaw {
    fn control(&mut self);
}
