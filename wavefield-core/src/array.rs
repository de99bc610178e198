//! Secondary source (loudspeaker) arrays.
//!
//! Positions and orientations are stored as two index-aligned sequences.
//! Constructors reject empty arrays and sequences of different length, so
//! every downstream computation can assume `N >= 1`.

use crate::error::{Result, WavefieldError, ensure_len};
use crate::math::{DVec3, check_finite};
use std::f64::consts::PI;

/// An ordered set of loudspeakers with their orientations.
///
/// Normals are expected to be unit length; this is not enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondarySourceArray {
    positions: Vec<DVec3>,
    normals: Vec<DVec3>,
}

impl SecondarySourceArray {
    pub fn new(positions: Vec<DVec3>, normals: Vec<DVec3>) -> Result<Self> {
        if positions.is_empty() {
            return Err(WavefieldError::MalformedInput(
                "secondary source array must contain at least one source".to_string(),
            ));
        }
        ensure_len(positions.len(), normals.len())?;

        for (i, (x0, n0)) in positions.iter().zip(&normals).enumerate() {
            if let Some(msg) = check_finite(*x0, &format!("position {}", i))
                .or_else(|| check_finite(*n0, &format!("normal {}", i)))
            {
                return Err(WavefieldError::MalformedInput(msg));
            }
        }

        Ok(Self { positions, normals })
    }

    /// Equally spaced loudspeakers on a circle of radius `radius` in the x/y
    /// plane, facing the center.
    ///
    /// The first loudspeaker sits on the positive x axis.
    pub fn circular(count: usize, radius: f64, center: DVec3) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(WavefieldError::DegenerateGeometry(format!(
                "circular array radius must be positive, got {}",
                radius
            )));
        }

        let (positions, normals): (Vec<DVec3>, Vec<DVec3>) = (0..count)
            .map(|i| {
                let alpha = 2.0 * PI * i as f64 / count as f64;
                let outward = DVec3::new(alpha.cos(), alpha.sin(), 0.0);
                (center + radius * outward, -outward)
            })
            .unzip();

        Self::new(positions, normals)
    }

    /// Equally spaced loudspeakers along the y axis, centered on `center`,
    /// all facing `orientation`.
    pub fn linear(count: usize, spacing: f64, center: DVec3, orientation: DVec3) -> Result<Self> {
        let half = (count as f64 - 1.0) / 2.0;
        let positions = (0..count)
            .map(|i| center + DVec3::new(0.0, (i as f64 - half) * spacing, 0.0))
            .collect();
        Self::new(positions, vec![orientation; count])
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false for a constructed array; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[DVec3] {
        &self.normals
    }

    /// Iterates `(position, normal)` pairs in array order.
    pub fn iter(&self) -> impl Iterator<Item = (DVec3, DVec3)> + '_ {
        self.positions.iter().copied().zip(self.normals.iter().copied())
    }

    /// Same positions with every normal reversed.
    pub fn flipped(&self) -> Self {
        Self {
            positions: self.positions.clone(),
            normals: self.normals.iter().map(|n| -*n).collect(),
        }
    }
}
