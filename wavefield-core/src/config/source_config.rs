use crate::math::DVec3;

/// The sound field a loudspeaker array is asked to synthesize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VirtualSource {
    /// Plane wave travelling along `direction` (expected to be unit length)
    PlaneWave { direction: DVec3 },
    /// Point source radiating from `position`
    PointSource { position: DVec3 },
}

impl Default for VirtualSource {
    fn default() -> Self {
        Self::PlaneWave {
            direction: DVec3::Y,
        }
    }
}

impl VirtualSource {
    pub fn plane_wave(direction: DVec3) -> Self {
        Self::PlaneWave { direction }
    }

    pub fn point_source(position: DVec3) -> Self {
        Self::PointSource { position }
    }

    pub fn is_plane_wave(&self) -> bool {
        matches!(self, Self::PlaneWave { .. })
    }

    /// Returns the propagation direction if this is a plane wave
    pub fn direction(&self) -> Option<DVec3> {
        match self {
            Self::PlaneWave { direction } => Some(*direction),
            Self::PointSource { .. } => None,
        }
    }

    /// Returns the position if this is a point source
    pub fn position(&self) -> Option<DVec3> {
        match self {
            Self::PointSource { position } => Some(*position),
            Self::PlaneWave { .. } => None,
        }
    }
}
