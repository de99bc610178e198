use crate::error::{Result, WavefieldError};

/// Speed of sound in air at roughly 20 °C, in m/s.
pub const DEFAULT_SPEED_OF_SOUND: f64 = 343.0;

/// Sample rate used when the caller does not pick one, in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Physical constants shared by every driving-function computation.
///
/// # Example
///
/// ```
/// use wavefield_core::DrivingDesc;
///
/// let desc = DrivingDesc::new().speed_of_sound(340.0).sample_rate(48000);
/// assert_eq!(desc.sample_rate, 48000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrivingDesc {
    /// Propagation speed in m/s
    pub speed_of_sound: f64,
    /// Sample rate in Hz for everything that works in samples
    pub sample_rate: u32,
}

impl Default for DrivingDesc {
    fn default() -> Self {
        Self {
            speed_of_sound: DEFAULT_SPEED_OF_SOUND,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl DrivingDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speed_of_sound(mut self, c: f64) -> Self {
        self.speed_of_sound = c;
        self
    }

    pub fn sample_rate(mut self, fs: u32) -> Self {
        self.sample_rate = fs;
        self
    }

    /// Duration of one sample in seconds.
    pub fn sample_period(&self) -> f64 {
        1.0 / self.sample_rate as f64
    }

    /// Rejects a non-positive or non-finite speed of sound and a zero sample rate.
    pub fn validate(&self) -> Result<()> {
        validate_speed_of_sound(self.speed_of_sound)?;
        validate_sample_rate(self.sample_rate as f64)
    }
}

pub(crate) fn validate_speed_of_sound(c: f64) -> Result<()> {
    if !(c.is_finite() && c > 0.0) {
        return Err(WavefieldError::MalformedInput(format!(
            "speed of sound must be positive and finite, got {}",
            c
        )));
    }
    Ok(())
}

pub(crate) fn validate_sample_rate(fs: f64) -> Result<()> {
    if !(fs.is_finite() && fs > 0.0) {
        return Err(WavefieldError::MalformedInput(format!(
            "sample rate must be positive and finite, got {}",
            fs
        )));
    }
    Ok(())
}
