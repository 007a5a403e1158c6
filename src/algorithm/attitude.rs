#[cfg(not(any(test, feature = "std")))]
use micromath::F32Ext;
use nalgebra::{Quaternion, Vector3};

use crate::{config, hal::nav::HeadingCorrection, types::measurement::euler::Euler};

/// Complementary attitude filter: fast gyro integration blended with the
/// accelerometer as a slow absolute tilt reference and an externally supplied
/// heading correction.
///
/// The quaternion is kept near unit norm by a bounded first-order correction
/// each cycle rather than an exact renormalization. State is owned by the
/// main-loop context exclusively; nothing here is touched from interrupts.
pub struct Attitude {
    dt: f32,
    config: config::Attitude,
    quaternion: Quaternion<f32>,
    gravity: Vector3<f32>,
    heading: f32,
    reset: bool,
}

fn predicted_gravity(q: &Quaternion<f32>) -> Vector3<f32> {
    Vector3::new(
        2.0 * (q.i * q.k - q.w * q.j),
        2.0 * (q.j * q.k + q.w * q.i),
        2.0 * (q.w * q.w + q.k * q.k) - 1.0,
    )
}

fn heading_angle(q: &Quaternion<f32>) -> f32 {
    (2.0 * (q.w * q.k + q.i * q.j)).atan2(1.0 - 2.0 * (q.j * q.j + q.k * q.k))
}

impl Attitude {
    pub fn new(sample_rate: usize, config: config::Attitude) -> Self {
        Self {
            dt: 1.0 / sample_rate as f32,
            config,
            quaternion: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            gravity: Vector3::new(0.0, 0.0, 1.0),
            heading: 0.0,
            reset: false,
        }
    }

    pub fn quaternion(&self) -> Quaternion<f32> {
        self.quaternion
    }

    /// Unit gravity direction expressed in the body frame, recomputed from
    /// the quaternion every cycle.
    pub fn gravity_in_body(&self) -> Vector3<f32> {
        self.gravity
    }

    /// Heading in radians about the reference Z axis.
    pub fn heading_angle(&self) -> f32 {
        self.heading
    }

    /// Diagnostic Euler angles.
    pub fn euler(&self) -> Euler {
        Euler::from(self.quaternion)
    }

    /// Arms reinitialization from accelerometer data on the next update.
    pub fn reset(&mut self) {
        self.reset = true;
    }

    /// Advances the filter by one fast cycle. `gyro` is the angular rate in
    /// rad/s and `acceleration` the measured specific force, both in the
    /// body frame; `heading` carries the correction terms when the external
    /// navigation source has valid heading data.
    pub fn update(
        &mut self,
        gyro: &Vector3<f32>,
        acceleration: &Vector3<f32>,
        heading: Option<HeadingCorrection>,
    ) {
        if !self.reset {
            self.integrate(gyro);
            self.gravity = predicted_gravity(&self.quaternion);
            self.correct_with_accelerometer(acceleration);
            if let Some(correction) = heading {
                self.correct_heading(correction);
            }
            self.normalize();
        } else {
            self.handle_reset(acceleration);
        }
        self.gravity = predicted_gravity(&self.quaternion);
        self.heading = heading_angle(&self.quaternion);
    }

    /// Applies a small rotation about the reference Z axis. The sine-like
    /// term is clamped so a single bad correction cannot slew the heading by
    /// more than the configured bound.
    pub fn correct_heading(&mut self, correction: HeadingCorrection) {
        let HeadingCorrection { mut hc0, mut hcz } = correction;
        let clamp = self.config.heading_clamp;
        if hcz.abs() > clamp {
            hc0 = (1.0 - clamp * clamp).sqrt();
            hcz = clamp.copysign(hcz);
        }
        // Rotate the (w, k) and (i, j) pairs by the same 2x2 transform.
        let q = self.quaternion;
        self.quaternion = Quaternion::new(
            hc0 * q.w - hcz * q.k,
            hc0 * q.i - hcz * q.j,
            hc0 * q.j + hcz * q.i,
            hc0 * q.k + hcz * q.w,
        );
    }

    fn integrate(&mut self, gyro: &Vector3<f32>) {
        let q = self.quaternion;
        let dpqr = gyro * (0.5 * self.dt);
        self.quaternion = q + Quaternion::new(
            -dpqr.x * q.i - dpqr.y * q.j - dpqr.z * q.k,
            dpqr.x * q.w - dpqr.y * q.k + dpqr.z * q.j,
            dpqr.x * q.k + dpqr.y * q.w - dpqr.z * q.i,
            -dpqr.x * q.j + dpqr.y * q.i + dpqr.z * q.w,
        );
    }

    fn correct_with_accelerometer(&mut self, acceleration: &Vector3<f32>) {
        // The accelerometer is assumed to measure only the reaction to
        // gravity; the corrective rotation between predicted and measured
        // reaction lies along their cross product.
        let axis = self.gravity.cross(acceleration) * (0.5 * self.config.accelerometer_gain);
        self.quaternion = self.quaternion * Quaternion::from_parts(1.0, axis);
    }

    fn normalize(&mut self) {
        // First-order push toward unit norm; no sqrt and no divide.
        let q = self.quaternion;
        let correction = self.config.normalization_gain * (1.0 - q.norm_squared());
        self.quaternion = q + q * correction;
    }

    fn handle_reset(&mut self, acceleration: &Vector3<f32>) {
        // Closed-form shortest rotation aligning the body-frame gravity
        // prediction with the measured specific force. Valid only near
        // static conditions; a specific force opposite body +Z (or near
        // zero) is degenerate and deliberately unguarded.
        let mut quaternion = Quaternion::new(acceleration.z, acceleration.y, -acceleration.x, 0.0);
        quaternion.w += quaternion.norm();
        self.quaternion = quaternion.normalize();
        self.reset = false;
        info!("attitude reinitialized from accelerometer");
    }
}

mod test {
    #[test]
    fn test_zero_rate_is_exact_identity() {
        use nalgebra::{Quaternion, Vector3};

        use super::Attitude;
        use crate::config;

        let mut attitude = Attitude::new(128, config::Attitude::default());
        let gyro = Vector3::new(0.0, 0.0, 0.0);
        let acceleration = Vector3::new(0.0, 0.0, 1.0);
        for _ in 0..100 {
            attitude.update(&gyro, &acceleration, None);
        }
        assert_eq!(Quaternion::new(1.0, 0.0, 0.0, 0.0), attitude.quaternion());
        assert_eq!(Vector3::new(0.0, 0.0, 1.0), attitude.gravity_in_body());
        assert_eq!(0.0, attitude.heading_angle());
    }

    #[test]
    fn test_constant_rate_integration() {
        use core::f32::consts::PI;

        use nalgebra::Vector3;

        use super::Attitude;
        use crate::config;

        // 90 deg/s about x for 0.25s at 128Hz is a 22.5 deg rotation.
        let mut attitude = Attitude::new(128, config::Attitude::default());
        let gyro = Vector3::new(PI / 2.0, 0.0, 0.0);
        let acceleration = Vector3::new(0.0, 0.0, 0.0);
        for _ in 0..32 {
            attitude.update(&gyro, &acceleration, None);
        }

        let half = 22.5_f32.to_radians() / 2.0;
        let q = attitude.quaternion();
        assert!((q.w - half.cos()).abs() < 1e-3, "w {}", q.w);
        assert!((q.i - half.sin()).abs() < 1e-3, "i {}", q.i);
        assert!(q.j.abs() < 1e-3 && q.k.abs() < 1e-3);

        let gravity = attitude.gravity_in_body();
        let angle = 22.5_f32.to_radians();
        assert!((gravity.y - angle.sin()).abs() < 1e-3);
        assert!((gravity.z - angle.cos()).abs() < 1e-3);
    }

    #[test]
    fn test_norm_stays_bounded() {
        use nalgebra::Vector3;

        use super::Attitude;
        use crate::config;

        let mut attitude = Attitude::new(128, config::Attitude::default());
        let gyro = Vector3::new(1.0, -0.5, 0.25);
        let acceleration = Vector3::new(0.0, 0.0, 1.0);
        for _ in 0..10_000 {
            attitude.update(&gyro, &acceleration, None);
            let error = (attitude.quaternion().norm_squared() - 1.0).abs();
            assert!(error < 1e-3, "norm drifted: {}", error);
        }
    }

    #[test]
    fn test_heading_correction_clamp() {
        use super::Attitude;
        use crate::{config, hal::nav::HeadingCorrection};

        let mut attitude = Attitude::new(128, config::Attitude::default());
        attitude.correct_heading(HeadingCorrection { hc0: 0.98, hcz: 0.2 });
        let q = attitude.quaternion();
        assert!((q.w - 0.9987492178).abs() < 1e-6, "w {}", q.w);
        assert_eq!(0.05, q.k);

        let mut attitude = Attitude::new(128, config::Attitude::default());
        attitude.correct_heading(HeadingCorrection { hc0: 0.98, hcz: -0.2 });
        let q = attitude.quaternion();
        assert!((q.w - 0.9987492178).abs() < 1e-6, "w {}", q.w);
        assert_eq!(-0.05, q.k);

        // within the clamp the terms apply as-is
        let mut attitude = Attitude::new(128, config::Attitude::default());
        attitude.correct_heading(HeadingCorrection { hc0: 1.0, hcz: 0.01 });
        let q = attitude.quaternion();
        assert_eq!((1.0, 0.01), (q.w, q.k));
    }

    #[test]
    fn test_heading_correction_in_update() {
        use nalgebra::Vector3;

        use super::Attitude;
        use crate::{config, hal::nav::HeadingCorrection};

        let mut attitude = Attitude::new(128, config::Attitude::default());
        let gyro = Vector3::new(0.0, 0.0, 0.0);
        let acceleration = Vector3::new(0.0, 0.0, 1.0);
        let angle = 0.01_f32;
        let correction = HeadingCorrection { hc0: angle.cos(), hcz: angle.sin() };
        attitude.update(&gyro, &acceleration, Some(correction));

        // a rotation by theta in the (w, k) pair yaws the body by 2 theta
        assert!((attitude.heading_angle() - 2.0 * angle).abs() < 1e-4);
    }

    #[test]
    fn test_reset_idempotence() {
        use nalgebra::{Quaternion, Vector3};

        use super::Attitude;
        use crate::config;

        let mut attitude = Attitude::new(128, config::Attitude::default());
        let gyro = Vector3::new(1.0, 2.0, -1.0);
        let acceleration = Vector3::new(0.0, 0.0, 1.0);
        for _ in 0..50 {
            attitude.update(&gyro, &acceleration, None);
        }

        attitude.reset();
        attitude.update(&gyro, &acceleration, None);
        assert_eq!(Quaternion::new(1.0, 0.0, 0.0, 0.0), attitude.quaternion());
        assert_eq!(Vector3::new(0.0, 0.0, 1.0), attitude.gravity_in_body());

        // the flag is consumed: stationary input keeps the identity exactly
        attitude.update(&Vector3::new(0.0, 0.0, 0.0), &acceleration, None);
        assert_eq!(Quaternion::new(1.0, 0.0, 0.0, 0.0), attitude.quaternion());
    }

    #[test]
    fn test_reset_aligns_gravity_with_measurement() {
        use nalgebra::Vector3;

        use super::Attitude;
        use crate::config;

        let mut attitude = Attitude::new(128, config::Attitude::default());
        let acceleration = Vector3::new(0.6, 0.0, 0.8);
        attitude.reset();
        attitude.update(&Vector3::new(0.0, 0.0, 0.0), &acceleration, None);

        let gravity = attitude.gravity_in_body();
        assert!((gravity - acceleration).norm() < 1e-6, "gravity {:?}", gravity);
    }
}
