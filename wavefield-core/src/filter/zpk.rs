use num_complex::Complex64;

/// A transfer function in zero/pole/gain form.
///
/// Used both for analog prototypes (s-plane) and for digital filters
/// (z-plane); the meaning of the roots depends on where the value came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Zpk {
    pub zeros: Vec<Complex64>,
    pub poles: Vec<Complex64>,
    pub gain: f64,
}

impl Zpk {
    pub fn new(zeros: Vec<Complex64>, poles: Vec<Complex64>, gain: f64) -> Self {
        Self { zeros, poles, gain }
    }

    /// Number of poles, i.e. the order of a proper rational function.
    pub fn order(&self) -> usize {
        self.poles.len()
    }

    /// Maps every root through `s -> exp(scale * s)`.
    ///
    /// With `scale = k * T` this is the matched-z transform of an analog root
    /// `s` scaled by `k`, sampled with period `T`.
    pub fn map_exp(roots: &[Complex64], scale: f64) -> Vec<Complex64> {
        roots.iter().map(|s| (*s * scale).exp()).collect()
    }

    /// Evaluates `gain * prod(x - z) / prod(x - p)` at `x`.
    pub fn response_at(&self, x: Complex64) -> Complex64 {
        let num: Complex64 = self.zeros.iter().map(|z| x - *z).product();
        let den: Complex64 = self.poles.iter().map(|p| x - *p).product();
        self.gain * num / den
    }
}
