//! 2.5-dimensional Wave Field Synthesis driving coefficients.
//!
//! Each loudspeaker is driven by a delayed and weighted copy of the source
//! signal. The helpers here compute those per-loudspeaker delays (seconds)
//! and weights; [`crate::signal::driving_signals`] turns them into sample
//! buffers.
//!
//! Both models include the 2.5-D amplitude correction
//! `g0 = sqrt(2π |xref - x0|)` which compensates for synthesizing a
//! three-dimensional field with a planar array.

use crate::array::SecondarySourceArray;
use crate::config::{DrivingDesc, VirtualSource, validate_speed_of_sound};
use crate::error::{Result, WavefieldError};
use crate::math::{DVec3, check_finite};
use std::f64::consts::PI;

/// Per-loudspeaker delays and weights, index-aligned with the array they
/// were computed for.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    /// Delay of each loudspeaker in seconds (may be negative)
    pub delays: Vec<f64>,
    /// Amplitude weight of each loudspeaker (negative when facing away)
    pub weights: Vec<f64>,
}

impl Coefficients {
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.delays, self.weights)
    }
}

fn correction_25d(x0: DVec3, xref: DVec3) -> f64 {
    (2.0 * PI * (xref - x0).length()).sqrt()
}

fn check_vector(v: DVec3, what: &str) -> Result<()> {
    match check_finite(v, what) {
        Some(msg) => Err(WavefieldError::MalformedInput(msg)),
        None => Ok(()),
    }
}

/// Plane wave travelling along `n`.
///
/// Loudspeakers whose normal points against the wave get a negative weight.
/// No secondary source selection is applied; callers that want it clamp or
/// drop those weights themselves.
pub fn plane_25d(
    array: &SecondarySourceArray,
    n: DVec3,
    xref: DVec3,
    c: f64,
) -> Result<Coefficients> {
    validate_speed_of_sound(c)?;
    check_vector(n, "plane wave direction")?;
    check_vector(xref, "reference position")?;

    let (delays, weights): (Vec<f64>, Vec<f64>) = array
        .iter()
        .map(|(x0, n0)| {
            let g0 = correction_25d(x0, xref);
            (n.dot(x0) / c, 2.0 * g0 * n.dot(n0))
        })
        .unzip();

    Ok(Coefficients { delays, weights })
}

/// Point source at `xs`.
///
/// Fails with [`WavefieldError::MalformedInput`] when `xs` coincides with
/// one of the loudspeakers.
pub fn point_25d(
    array: &SecondarySourceArray,
    xs: DVec3,
    xref: DVec3,
    c: f64,
) -> Result<Coefficients> {
    validate_speed_of_sound(c)?;
    check_vector(xs, "virtual source position")?;
    check_vector(xref, "reference position")?;

    let mut delays = Vec::with_capacity(array.len());
    let mut weights = Vec::with_capacity(array.len());

    for (i, (x0, n0)) in array.iter().enumerate() {
        let ds = x0 - xs;
        let r = ds.length();
        if r == 0.0 {
            return Err(WavefieldError::MalformedInput(format!(
                "virtual source coincides with secondary source {} at {:?}",
                i, x0
            )));
        }
        let g0 = correction_25d(x0, xref);
        delays.push(r / c);
        weights.push(g0 * ds.dot(n0) / (2.0 * PI * r.powf(1.5)));
    }

    Ok(Coefficients { delays, weights })
}

/// Dispatches to [`plane_25d`] or [`point_25d`] depending on the source
/// model, taking the speed of sound from `desc`.
pub fn wfs_25d(
    array: &SecondarySourceArray,
    source: &VirtualSource,
    xref: DVec3,
    desc: &DrivingDesc,
) -> Result<Coefficients> {
    let coefficients = match *source {
        VirtualSource::PlaneWave { direction } => {
            plane_25d(array, direction, xref, desc.speed_of_sound)?
        }
        VirtualSource::PointSource { position } => {
            point_25d(array, position, xref, desc.speed_of_sound)?
        }
    };

    log::debug!(
        "WFS coefficients for {} secondary sources ({:?})",
        coefficients.len(),
        source
    );

    Ok(coefficients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ring() -> SecondarySourceArray {
        SecondarySourceArray::circular(16, 1.5, DVec3::ZERO).unwrap()
    }

    #[test]
    fn test_lengths_match_array() {
        let array = ring();
        let pw = plane_25d(&array, DVec3::Y, DVec3::ZERO, 343.0).unwrap();
        assert_eq!(pw.delays.len(), array.len());
        assert_eq!(pw.weights.len(), array.len());

        let ps = point_25d(&array, DVec3::new(0.0, 3.0, 0.0), DVec3::ZERO, 343.0).unwrap();
        assert_eq!(ps.delays.len(), array.len());
        assert_eq!(ps.weights.len(), array.len());
    }

    #[test]
    fn test_plane_wave_values() {
        let array = SecondarySourceArray::circular(4, 1.0, DVec3::ZERO).unwrap();
        let coeffs = plane_25d(&array, DVec3::Y, DVec3::ZERO, 343.0).unwrap();
        let g0 = (2.0 * PI).sqrt();

        // loudspeaker 1 at (0, 1, 0) faces -y, against the wave
        assert_relative_eq!(coeffs.delays[1], 1.0 / 343.0, epsilon = 1e-15);
        assert_relative_eq!(coeffs.weights[1], -2.0 * g0, epsilon = 1e-12);
        // loudspeaker 3 at (0, -1, 0) faces +y
        assert_relative_eq!(coeffs.delays[3], -1.0 / 343.0, epsilon = 1e-15);
        assert_relative_eq!(coeffs.weights[3], 2.0 * g0, epsilon = 1e-12);
        // loudspeaker 0 is grazing
        assert_relative_eq!(coeffs.weights[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_plane_wave_weight_flips_with_normals() {
        let array = ring();
        let n = DVec3::new(1.0, 1.0, 0.0).normalize();
        let front = plane_25d(&array, n, DVec3::ZERO, 343.0).unwrap();
        let back = plane_25d(&array.flipped(), n, DVec3::ZERO, 343.0).unwrap();

        assert_eq!(front.delays, back.delays);
        for (a, b) in front.weights.iter().zip(&back.weights) {
            assert_eq!(*a, -*b);
        }
    }

    #[test]
    fn test_point_source_single_speaker() {
        let array = SecondarySourceArray::new(vec![DVec3::Y], vec![-DVec3::Y]).unwrap();
        let xs = DVec3::new(0.0, 2.0, 0.0);
        let coeffs = point_25d(&array, xs, DVec3::ZERO, 343.0).unwrap();

        assert_relative_eq!(coeffs.delays[0], 1.0 / 343.0);
        assert_relative_eq!(coeffs.weights[0], 1.0 / (2.0 * PI).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_point_source_delay_scales_with_speed_of_sound() {
        let array = ring();
        let xs = DVec3::new(0.5, 4.0, 0.0);
        let slow = point_25d(&array, xs, DVec3::ZERO, 343.0).unwrap();
        let fast = point_25d(&array, xs, DVec3::ZERO, 686.0).unwrap();

        for (s, f) in slow.delays.iter().zip(&fast.delays) {
            assert_eq!(*f, *s / 2.0);
        }
        assert_eq!(slow.weights, fast.weights);
    }

    #[test]
    fn test_point_source_on_speaker_is_rejected() {
        let array = ring();
        let xs = array.positions()[3];
        assert!(matches!(
            point_25d(&array, xs, DVec3::ZERO, 343.0),
            Err(WavefieldError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_invalid_speed_of_sound() {
        let array = ring();
        assert!(plane_25d(&array, DVec3::Y, DVec3::ZERO, 0.0).is_err());
        assert!(point_25d(&array, DVec3::Y * 3.0, DVec3::ZERO, f64::NAN).is_err());
    }

    #[test]
    fn test_dispatch_matches_direct_calls() {
        let array = ring();
        let desc = DrivingDesc::new().speed_of_sound(340.0);
        let xs = DVec3::new(0.0, 2.5, 0.0);

        let via_dispatch =
            wfs_25d(&array, &VirtualSource::point_source(xs), DVec3::ZERO, &desc).unwrap();
        let direct = point_25d(&array, xs, DVec3::ZERO, 340.0).unwrap();
        assert_eq!(via_dispatch, direct);

        let via_dispatch =
            wfs_25d(&array, &VirtualSource::plane_wave(DVec3::X), DVec3::ZERO, &desc).unwrap();
        let direct = plane_25d(&array, DVec3::X, DVec3::ZERO, 340.0).unwrap();
        assert_eq!(via_dispatch, direct);
    }
}
