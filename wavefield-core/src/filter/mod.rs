//! Recursive filter design primitives.
//!
//! - [`bessel_prototype`] / [`bessel_poles`]: delay-normalized Bessel analog
//!   low-pass prototype
//! - [`Zpk`]: zero/pole/gain description plus the exponential root mapping
//! - [`zpk_to_sos`]: conversion to a [`SosCascade`] with nearest-neighbour
//!   pole/zero pairing
//!
//! The NFC-HOA designer in [`crate::nfchoa`] is built on these.

mod bessel;
mod sos;
mod zpk;

pub use bessel::{bessel_poles, bessel_prototype, reverse_bessel_polynomial};
pub use sos::{SecondOrderSection, SosCascade, zpk_to_sos};
pub use zpk::Zpk;
