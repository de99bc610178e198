mod driving_desc;
mod source_config;

pub use driving_desc::{DEFAULT_SAMPLE_RATE, DEFAULT_SPEED_OF_SOUND, DrivingDesc};
pub use source_config::VirtualSource;
pub(crate) use driving_desc::{validate_sample_rate, validate_speed_of_sound};
