//! # Wavefield Core
//!
//! Time-domain driving functions for loudspeaker arrays using Wave Field
//! Synthesis (WFS) and Near-Field Compensated Higher-Order Ambisonics (NFC-HOA).
//!
//! Given the geometry of a secondary source array and a virtual source (a
//! plane wave or a point source), the crate computes what each loudspeaker
//! has to play:
//!
//! - WFS: one delay and one weight per loudspeaker ([`wfs`]), turned into a
//!   multi-channel buffer by the delay-line builder ([`signal`]).
//! - NFC-HOA: a common delay, weight and phase plus one recursive filter per
//!   circular harmonic order ([`nfchoa`]), realized as second-order-section
//!   cascades ([`filter`]).
//!
//! ## Quick Start
//!
//! ```
//! use wavefield_core::*;
//!
//! let desc = DrivingDesc::default();
//! let array = SecondarySourceArray::circular(32, 1.5, DVec3::ZERO)?;
//! let source = VirtualSource::point_source(DVec3::new(0.0, 3.0, 0.0));
//!
//! // WFS: delays and weights, then the loudspeaker signals
//! let coeffs = wfs::wfs_25d(&array, &source, DVec3::ZERO, &desc)?;
//! let mut pulse = vec![0.0; 64];
//! pulse[0] = 1.0;
//! let signals = signal::driving_signals(&coeffs.delays, &coeffs.weights, &pulse, desc.sample_rate)?;
//! assert_eq!(signals.channels(), 32);
//!
//! // NFC-HOA: one filter cascade per circular harmonic order
//! let driving = nfchoa::nfchoa_25d(&array, 1.5, &source, None, &desc)?;
//! assert_eq!(driving.filters.len(), 17);
//! # Ok::<(), WavefieldError>(())
//! ```
//!
//! ## Conventions
//!
//! - Positions in meters, delays in seconds, azimuth measured from +x towards +y.
//! - Loudspeaker normals point into the listening area.
//! - Negative delays are allowed; the delay-line builder shifts every channel
//!   so the earliest one starts at row zero and reports the shift as `t_offset`.
//! - No logger is installed; diagnostics go through the `log` facade.

pub mod array;
pub mod config;
pub mod error;
pub mod filter;
pub mod math;
pub mod nfchoa;
pub mod signal;
pub mod wfs;

pub use array::SecondarySourceArray;
pub use config::{DrivingDesc, VirtualSource};
pub use error::{Result, WavefieldError};
pub use filter::{SecondOrderSection, SosCascade};
pub use math::DVec3;
pub use nfchoa::{FilterBank, NfchoaDriving};
pub use signal::DrivingSignals;
pub use wfs::Coefficients;
