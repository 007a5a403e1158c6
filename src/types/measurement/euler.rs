use core::f32::consts::PI;

#[cfg(not(any(test, feature = "std")))]
use micromath::F32Ext;
use nalgebra::Quaternion;

pub const DEGREE_PER_RAD: f32 = 180.0 / PI;

/// Diagnostic roll/pitch/yaw extraction, radians. The quaternion is expected
/// to be near unit norm; the extraction does not renormalize.
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct Euler {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Euler {
    pub fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }
}

impl core::ops::Mul<f32> for Euler {
    type Output = Self;

    fn mul(self, m: f32) -> Euler {
        Euler { roll: self.roll * m, pitch: self.pitch * m, yaw: self.yaw * m }
    }
}

impl From<Quaternion<f32>> for Euler {
    fn from(q: Quaternion<f32>) -> Self {
        let roll =
            (2.0 * (q.w * q.i + q.j * q.k)).atan2(1.0 - 2.0 * (q.i * q.i + q.j * q.j));
        let sine = 2.0 * (q.w * q.j - q.i * q.k);
        let pitch = if sine.abs() >= 1.0 { (PI / 2.0).copysign(sine) } else { sine.asin() };
        let yaw =
            (2.0 * (q.w * q.k + q.i * q.j)).atan2(1.0 - 2.0 * (q.j * q.j + q.k * q.k));
        Self { roll, pitch, yaw }
    }
}

mod test {
    #[test]
    fn test_quaternion_to_euler() {
        use core::f32::consts::FRAC_1_SQRT_2;

        use nalgebra::Quaternion;

        use super::{Euler, DEGREE_PER_RAD};

        fn assert_close(expected: (f32, f32, f32), euler: Euler) {
            let degrees = euler * DEGREE_PER_RAD;
            assert!((degrees.roll - expected.0).abs() < 0.01, "roll {}", degrees.roll);
            assert!((degrees.pitch - expected.1).abs() < 0.01, "pitch {}", degrees.pitch);
            assert!((degrees.yaw - expected.2).abs() < 0.01, "yaw {}", degrees.yaw);
        }

        // identity
        assert_close((0.0, 0.0, 0.0), Euler::from(Quaternion::new(1.0, 0.0, 0.0, 0.0)));

        // roll 90
        let q = Quaternion::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2, 0.0, 0.0);
        assert_close((90.0, 0.0, 0.0), Euler::from(q));

        // pitch 90 is the gimbal-lock singularity, so only check pitch
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2, 0.0);
        let degrees = Euler::from(q) * DEGREE_PER_RAD;
        assert!((degrees.pitch - 90.0).abs() < 0.1, "pitch {}", degrees.pitch);

        // yaw 90
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        assert_close((0.0, 0.0, 90.0), Euler::from(q));
    }
}
