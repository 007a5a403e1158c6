use serde::{Deserialize, Serialize};

/// Attitude filter constants. The defaults are tuned values inherited from
/// flight hardware; they are parameters rather than structural invariants,
/// but changing them changes convergence behavior.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    /// Gain of the accelerometer tilt correction.
    pub accelerometer_gain: f32,
    /// Upper bound on the sine-like heading correction term per cycle.
    pub heading_clamp: f32,
    /// Gain of the first-order quaternion norm correction.
    pub normalization_gain: f32,
}

impl Default for Attitude {
    fn default() -> Self {
        Self { accelerometer_gain: 0.001, heading_clamp: 0.05, normalization_gain: 0.5 }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base rate of the fast cycle, Hz.
    pub sample_rate: usize,
    pub attitude: Attitude,
}

impl Default for Config {
    fn default() -> Self {
        Self { sample_rate: crate::scheduler::BASE_RATE, attitude: Attitude::default() }
    }
}

mod test {
    #[test]
    fn test_default_constants() {
        use super::Config;

        let config = Config::default();
        assert_eq!(128, config.sample_rate);
        assert_eq!(0.001, config.attitude.accelerometer_gain);
        assert_eq!(0.05, config.attitude.heading_clamp);
        assert_eq!(0.5, config.attitude.normalization_gain);
    }
}
