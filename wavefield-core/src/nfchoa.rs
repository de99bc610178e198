//! 2.5-dimensional Near-Field Compensated Higher-Order Ambisonics.
//!
//! For a circular array of radius `r0` the driving function splits into a
//! common delay, weight and phase plus one recursive filter per circular
//! harmonic order `m = 0..=M`. Each filter is the ratio of two delay-normalized
//! Bessel polynomials of order `m`, evaluated at the source distance (zeros)
//! and at the array radius (poles), and discretized with the matched-z
//! mapping `s -> exp(c / r * s * T)`.
//!
//! A downstream renderer filters each circular harmonic channel with its
//! cascade before combining them into loudspeaker signals.

use crate::array::SecondarySourceArray;
use crate::config::{DrivingDesc, VirtualSource, validate_sample_rate, validate_speed_of_sound};
use crate::error::{Result, WavefieldError};
use crate::filter::{SosCascade, Zpk, bessel_poles, zpk_to_sos};
use crate::math::{DVec3, cart2sph};
use num_complex::Complex64;
use rayon::prelude::*;
use std::f64::consts::PI;
use std::ops::Index;

/// One [`SosCascade`] per circular harmonic order, indexed by order.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBank {
    cascades: Vec<SosCascade>,
}

impl FilterBank {
    /// Highest order in the bank (`M`).
    pub fn max_order(&self) -> usize {
        self.cascades.len() - 1
    }

    /// Number of orders, `M + 1`.
    pub fn len(&self) -> usize {
        self.cascades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cascades.is_empty()
    }

    pub fn get(&self, order: usize) -> Option<&SosCascade> {
        self.cascades.get(order)
    }

    /// Iterates `(order, cascade)` in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SosCascade)> {
        self.cascades.iter().enumerate()
    }

    pub fn is_stable(&self) -> bool {
        self.cascades.iter().all(SosCascade::is_stable)
    }
}

impl Index<usize> for FilterBank {
    type Output = SosCascade;

    fn index(&self, order: usize) -> &SosCascade {
        &self.cascades[order]
    }
}

/// Everything a circular-harmonic renderer needs to synthesize one virtual
/// source.
#[derive(Debug, Clone, PartialEq)]
pub struct NfchoaDriving {
    /// Delay common to all loudspeakers in seconds (may be negative)
    pub delay: f64,
    /// Weight common to all loudspeakers
    pub weight: f64,
    /// Angular offset of the source in radians
    pub phase: f64,
    pub filters: FilterBank,
}

/// Highest circular harmonic order for `count` loudspeakers.
///
/// Defaults to `count / 2`, the largest order the array can sample without
/// spatial aliasing.
pub fn max_order_circular_harmonics(count: usize, max_order: Option<usize>) -> usize {
    max_order.unwrap_or(count / 2)
}

fn validate_radius(r0: f64) -> Result<()> {
    if !(r0.is_finite() && r0 > 0.0) {
        return Err(WavefieldError::DegenerateGeometry(format!(
            "array radius must be positive and finite, got {}",
            r0
        )));
    }
    Ok(())
}

fn check_array_radius(array: &SecondarySourceArray, r0: f64) {
    let first = array.positions()[0].length();
    if (first - r0).abs() > 1e-6 * r0 {
        log::warn!(
            "Array radius {} differs from the first loudspeaker's distance {}",
            r0,
            first
        );
    }
}

/// Designs the cascade for circular harmonic order `order`.
///
/// Zeros are the prototype poles mapped with `zero_scale`, or all at `z = 1`
/// when `zero_scale` is `None`; poles are mapped with `pole_scale`.
fn design_order(order: usize, zero_scale: Option<f64>, pole_scale: f64) -> Result<SosCascade> {
    let prototype = bessel_poles(order)?;
    let poles = Zpk::map_exp(&prototype, pole_scale);
    let zeros = match zero_scale {
        Some(scale) => Zpk::map_exp(&prototype, scale),
        None => vec![Complex64::new(1.0, 0.0); prototype.len()],
    };

    let cascade = zpk_to_sos(&Zpk::new(zeros, poles, 1.0))?;
    if let Some((idx, section)) = cascade
        .sections()
        .iter()
        .enumerate()
        .find(|(_, s)| !s.is_stable())
    {
        return Err(WavefieldError::NumericalInstability(format!(
            "order {} section {} is unstable: {:?}",
            order,
            idx,
            section.coefficients()
        )));
    }

    log::trace!(
        "NFC-HOA order {}: {} sections, filter order {}",
        order,
        cascade.len(),
        cascade.order()
    );

    Ok(cascade)
}

fn design_filter_bank(
    max_order: usize,
    zero_scale: Option<f64>,
    pole_scale: f64,
) -> Result<FilterBank> {
    let cascades = (0..=max_order)
        .into_par_iter()
        .map(|order| design_order(order, zero_scale, pole_scale))
        .collect::<Result<Vec<_>>>()?;
    Ok(FilterBank { cascades })
}

/// Plane wave travelling along `npw`.
///
/// The plane wave needs no common delay; the weight is `2 r0` and the phase
/// `φ_pw - π`. All filter zeros sit at `z = 1`.
pub fn plane_25d(
    array: &SecondarySourceArray,
    r0: f64,
    npw: DVec3,
    max_order: Option<usize>,
    c: f64,
    fs: u32,
) -> Result<NfchoaDriving> {
    validate_radius(r0)?;
    validate_speed_of_sound(c)?;
    validate_sample_rate(fs as f64)?;
    if !npw.is_finite() || npw.length_squared() == 0.0 {
        return Err(WavefieldError::MalformedInput(format!(
            "plane wave direction must be a finite non-zero vector, got {:?}",
            npw
        )));
    }
    check_array_radius(array, r0);

    let order = max_order_circular_harmonics(array.len(), max_order);
    let period = 1.0 / fs as f64;
    let phi_pw = cart2sph(npw).azimuth;

    log::debug!(
        "Designing NFC-HOA plane wave: {} orders, r0 = {} m, azimuth {:.3} rad",
        order + 1,
        r0,
        phi_pw
    );

    let filters = design_filter_bank(order, None, c / r0 * period)?;

    Ok(NfchoaDriving {
        delay: 0.0,
        weight: 2.0 * r0,
        phase: phi_pw - PI,
        filters,
    })
}

/// Point source at `xs`, measured from the array center.
///
/// Sources outside the array get a positive common delay `(r - r0) / c`,
/// sources inside a negative one. A source at the center is rejected with
/// [`WavefieldError::DegenerateGeometry`].
pub fn point_25d(
    array: &SecondarySourceArray,
    r0: f64,
    xs: DVec3,
    max_order: Option<usize>,
    c: f64,
    fs: u32,
) -> Result<NfchoaDriving> {
    validate_radius(r0)?;
    validate_speed_of_sound(c)?;
    validate_sample_rate(fs as f64)?;
    if !xs.is_finite() {
        return Err(WavefieldError::MalformedInput(format!(
            "virtual source position has non-finite components: {:?}",
            xs
        )));
    }
    check_array_radius(array, r0);

    let source = cart2sph(xs);
    let r = source.radius;
    if r == 0.0 {
        return Err(WavefieldError::DegenerateGeometry(
            "point source at the array center".to_string(),
        ));
    }

    let order = max_order_circular_harmonics(array.len(), max_order);
    let period = 1.0 / fs as f64;

    log::debug!(
        "Designing NFC-HOA point source: {} orders, r0 = {} m, r = {} m",
        order + 1,
        r0,
        r
    );

    let filters = design_filter_bank(order, Some(c / r * period), c / r0 * period)?;

    Ok(NfchoaDriving {
        delay: (r - r0) / c,
        weight: 1.0 / (2.0 * PI * r),
        phase: source.azimuth,
        filters,
    })
}

/// Dispatches to [`plane_25d`] or [`point_25d`] with the constants in `desc`.
pub fn nfchoa_25d(
    array: &SecondarySourceArray,
    r0: f64,
    source: &VirtualSource,
    max_order: Option<usize>,
    desc: &DrivingDesc,
) -> Result<NfchoaDriving> {
    match *source {
        VirtualSource::PlaneWave { direction } => plane_25d(
            array,
            r0,
            direction,
            max_order,
            desc.speed_of_sound,
            desc.sample_rate,
        ),
        VirtualSource::PointSource { position } => point_25d(
            array,
            r0,
            position,
            max_order,
            desc.speed_of_sound,
            desc.sample_rate,
        ),
    }
}
