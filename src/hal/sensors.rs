use nalgebra::Vector3;

/// Calibrated inertial measurements in the body frame. `refresh` latches the
/// most recent raw readings; the accessors must then return a consistent
/// snapshot until the next refresh.
pub trait InertialSensors {
    fn refresh(&mut self);

    /// rad/s, body frame
    fn angular_rate(&self) -> Vector3<f32>;

    /// specific force, body frame
    fn acceleration(&self) -> Vector3<f32>;
}
