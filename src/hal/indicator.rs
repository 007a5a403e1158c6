/// Visual fault and heartbeat indication, the red/green LED pair on the
/// original board.
pub trait Indicator {
    /// Latched on scheduling overrun. Non-fatal.
    fn fault(&mut self);

    /// Toggled once per slow cycle.
    fn status_toggle(&mut self);
}

pub struct NoIndicator;

impl Indicator for NoIndicator {
    fn fault(&mut self) {}

    fn status_toggle(&mut self) {}
}
