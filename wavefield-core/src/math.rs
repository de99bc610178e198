//! Math types for wavefield

pub use glam::DVec3;
use std::f64::consts::PI;

/// Spherical coordinates in the convention used throughout the crate.
///
/// `azimuth` is measured in the x/y plane from the positive x axis,
/// `colatitude` from the positive z axis. Both are in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub azimuth: f64,
    pub colatitude: f64,
    pub radius: f64,
}

impl Spherical {
    pub fn new(azimuth: f64, colatitude: f64, radius: f64) -> Self {
        Self {
            azimuth,
            colatitude,
            radius,
        }
    }

    /// Elevation above the x/y plane.
    pub fn elevation(&self) -> f64 {
        PI / 2.0 - self.colatitude
    }

    pub fn to_cartesian(&self) -> DVec3 {
        sph2cart(self.azimuth, self.colatitude, self.radius)
    }
}

/// Converts a cartesian point to `(azimuth, colatitude, radius)`.
///
/// The origin maps to all zeros instead of an undefined colatitude.
pub fn cart2sph(v: DVec3) -> Spherical {
    let radius = v.length();
    let azimuth = v.y.atan2(v.x);
    let colatitude = if radius > 0.0 {
        (v.z / radius).clamp(-1.0, 1.0).acos()
    } else {
        0.0
    };
    Spherical::new(azimuth, colatitude, radius)
}

pub fn sph2cart(azimuth: f64, colatitude: f64, radius: f64) -> DVec3 {
    DVec3::new(
        radius * azimuth.cos() * colatitude.sin(),
        radius * azimuth.sin() * colatitude.sin(),
        radius * colatitude.cos(),
    )
}

/// Returns an error message naming the first non-finite component, if any.
pub(crate) fn check_finite(v: DVec3, what: &str) -> Option<String> {
    if v.is_finite() {
        None
    } else {
        Some(format!("{} has non-finite components: {:?}", what, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_cart2sph_axes() {
        let s = cart2sph(DVec3::new(0.0, 2.0, 0.0));
        assert_relative_eq!(s.azimuth, FRAC_PI_2);
        assert_relative_eq!(s.colatitude, FRAC_PI_2);
        assert_relative_eq!(s.radius, 2.0);

        let s = cart2sph(DVec3::new(-1.0, 0.0, 0.0));
        assert_relative_eq!(s.azimuth, PI);

        let s = cart2sph(DVec3::Z);
        assert_relative_eq!(s.colatitude, 0.0);
        assert_relative_eq!(s.elevation(), FRAC_PI_2);
    }

    #[test]
    fn test_cart2sph_origin() {
        let s = cart2sph(DVec3::ZERO);
        assert_eq!(s, Spherical::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_spherical_roundtrip_point() {
        let p = DVec3::new(0.3, -1.2, 0.7);
        let back = cart2sph(p).to_cartesian();
        assert_relative_eq!(back.x, p.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-12);
        assert_relative_eq!(back.z, p.z, epsilon = 1e-12);
    }
}
