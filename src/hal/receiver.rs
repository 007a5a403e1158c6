/// Radio input-frame decoding, run once per fast cycle after the attitude
/// update.
pub trait InputFrames {
    fn process(&mut self);
}
