//! Second-order sections and zero/pole/gain conversion.
//!
//! Coefficients follow the usual row layout `[b0, b1, b2, a0, a1, a2]` with
//! the transfer function
//!
//! ```text
//!         b0 + b1 z^-1 + b2 z^-2
//! H(z) = ------------------------
//!         a0 + a1 z^-1 + a2 z^-2
//! ```

use super::zpk::Zpk;
use crate::error::{Result, WavefieldError};
use num_complex::Complex64;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Tolerance used to tell real values from conjugate pairs.
const CONJUGATE_TOLERANCE: f64 = 100.0 * f64::EPSILON;

/// A single biquad stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondOrderSection {
    /// Numerator coefficients [b0, b1, b2]
    pub b: [f64; 3],
    /// Denominator coefficients [a0, a1, a2]
    pub a: [f64; 3],
}

impl SecondOrderSection {
    pub fn new(b: [f64; 3], a: [f64; 3]) -> Self {
        Self { b, a }
    }

    /// Pass-through section.
    pub fn unity() -> Self {
        Self::new([1.0, 0.0, 0.0], [1.0, 0.0, 0.0])
    }

    /// Builds the section `gain (z - z1)(z - z2) / ((z - p1)(z - p2))`.
    ///
    /// Roots must be real or conjugate pairs; only real parts of the
    /// expanded coefficients are kept.
    pub fn from_roots(
        zeros: [Complex64; 2],
        poles: [Complex64; 2],
        gain: f64,
    ) -> Self {
        let [z1, z2] = zeros;
        let [p1, p2] = poles;
        Self::new(
            [gain, -gain * (z1 + z2).re, gain * (z1 * z2).re],
            [1.0, -(p1 + p2).re, (p1 * p2).re],
        )
    }

    /// Row layout `[b0, b1, b2, a0, a1, a2]`.
    pub fn coefficients(&self) -> [f64; 6] {
        [self.b[0], self.b[1], self.b[2], self.a[0], self.a[1], self.a[2]]
    }

    /// Effective degree of the denominator (0, 1 or 2).
    pub fn order(&self) -> usize {
        if self.a[2] != 0.0 {
            2
        } else if self.a[1] != 0.0 {
            1
        } else {
            0
        }
    }

    /// Roots of `a0 z^2 + a1 z + a2`.
    pub fn poles(&self) -> [Complex64; 2] {
        let a1 = self.a[1] / self.a[0];
        let a2 = self.a[2] / self.a[0];
        let root = Complex64::new(a1 * a1 - 4.0 * a2, 0.0).sqrt();
        [(-a1 + root) / 2.0, (-a1 - root) / 2.0]
    }

    /// True when both poles lie strictly inside the unit circle.
    pub fn is_stable(&self) -> bool {
        if !(self.a[0] != 0.0 && self.coefficients().iter().all(|c| c.is_finite())) {
            return false;
        }
        // stability triangle for 1 + a1 z^-1 + a2 z^-2
        let a1 = self.a[1] / self.a[0];
        let a2 = self.a[2] / self.a[0];
        a2.abs() < 1.0 && a1.abs() < 1.0 + a2
    }

    /// Frequency response at normalized angular frequency `omega`
    /// (radians per sample).
    pub fn response(&self, omega: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b[0] + self.b[1] * z1 + self.b[2] * z2;
        let den = self.a[0] + self.a[1] * z1 + self.a[2] * z2;
        num / den
    }

    /// One step of direct form II transposed.
    #[inline]
    fn tick(&self, input: f64, state: &mut [f64; 2]) -> f64 {
        let a0 = self.a[0];
        let output = (self.b[0] * input) / a0 + state[0];
        state[0] = (self.b[1] * input - self.a[1] * output) / a0 + state[1];
        state[1] = (self.b[2] * input - self.a[2] * output) / a0;
        output
    }
}

/// A cascade of [`SecondOrderSection`]s applied in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SosCascade {
    sections: Vec<SecondOrderSection>,
}

impl SosCascade {
    pub fn new(sections: Vec<SecondOrderSection>) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &[SecondOrderSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Total filter order, the sum of the section orders.
    pub fn order(&self) -> usize {
        self.sections.iter().map(SecondOrderSection::order).sum()
    }

    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(SecondOrderSection::is_stable)
    }

    /// All sections in row layout.
    pub fn coefficients(&self) -> Vec<[f64; 6]> {
        self.sections.iter().map(SecondOrderSection::coefficients).collect()
    }

    /// Frequency response at normalized angular frequency `omega`.
    pub fn response(&self, omega: f64) -> Complex64 {
        self.sections
            .iter()
            .map(|s| s.response(omega))
            .product()
    }

    /// Filters `input` from a zero initial state.
    pub fn process(&self, input: &[f64]) -> Vec<f64> {
        let mut state = vec![[0.0; 2]; self.sections.len()];
        input
            .iter()
            .map(|&x| {
                self.sections
                    .iter()
                    .zip(state.iter_mut())
                    .fold(x, |acc, (section, st)| section.tick(acc, st))
            })
            .collect()
    }
}

fn is_real(z: Complex64) -> bool {
    z.im == 0.0
}

/// Index of the first minimum.
fn argmin(values: impl Iterator<Item = f64>) -> Option<usize> {
    values
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Index of the value in `from` closest to `to` that is real (or complex).
fn nearest_idx(from: &[Complex64], to: Complex64, real: bool) -> Result<usize> {
    let mut order: Vec<usize> = (0..from.len()).collect();
    order.sort_by(|&i, &j| (from[i] - to).norm().total_cmp(&(from[j] - to).norm()));
    order
        .into_iter()
        .find(|&i| is_real(from[i]) == real)
        .ok_or_else(|| {
            WavefieldError::MalformedInput(format!(
                "no {} value left to pair with {}",
                if real { "real" } else { "complex" },
                to
            ))
        })
}

/// Splits `values` into one representative (positive imaginary part) per
/// conjugate pair followed by the real values, with exact real parts.
fn cplxreal(values: &[Complex64]) -> Result<Vec<Complex64>> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| {
        a.re.total_cmp(&b.re)
            .then(a.im.abs().total_cmp(&b.im.abs()))
    });

    let (reals, complex): (Vec<Complex64>, Vec<Complex64>) = sorted
        .into_iter()
        .partition(|z| z.im.abs() <= CONJUGATE_TOLERANCE * z.norm());

    let upper: Vec<Complex64> = complex.iter().copied().filter(|z| z.im > 0.0).collect();
    let mut lower: Vec<Complex64> = complex.iter().copied().filter(|z| z.im < 0.0).collect();
    if upper.len() != lower.len() {
        return Err(WavefieldError::MalformedInput(
            "complex value without matching conjugate".to_string(),
        ));
    }

    let mut out = Vec::with_capacity(upper.len() + reals.len());
    for u in upper {
        let idx = argmin(lower.iter().map(|l| (u - l.conj()).norm())).ok_or_else(|| {
            WavefieldError::MalformedInput("complex value without matching conjugate".to_string())
        })?;
        let l = lower.remove(idx);
        if (u - l.conj()).norm() > CONJUGATE_TOLERANCE * l.norm() {
            return Err(WavefieldError::MalformedInput(format!(
                "complex value {} has no matching conjugate",
                u
            )));
        }
        out.push((u + l.conj()) / 2.0);
    }
    out.extend(reals.into_iter().map(|z| Complex64::new(z.re, 0.0)));

    Ok(out)
}

/// Converts a digital zero/pole/gain description into a cascade of second
/// order sections.
///
/// Poles are taken in order of their distance to the unit circle, each paired
/// with the closest remaining zero. The resulting sections are reversed so
/// the poles nearest the unit circle are applied last, and the overall gain
/// sits in the first section. An empty description yields a single section
/// `[gain, 0, 0, 1, 0, 0]`.
pub fn zpk_to_sos(zpk: &Zpk) -> Result<SosCascade> {
    if zpk.zeros.is_empty() && zpk.poles.is_empty() {
        return Ok(SosCascade::new(vec![SecondOrderSection::new(
            [zpk.gain, 0.0, 0.0],
            [1.0, 0.0, 0.0],
        )]));
    }

    let len = zpk.zeros.len().max(zpk.poles.len());
    let mut zeros = zpk.zeros.clone();
    let mut poles = zpk.poles.clone();
    zeros.resize(len, ZERO);
    poles.resize(len, ZERO);

    let n_sections = len.div_ceil(2);
    // odd orders get an extra pole and zero at the origin
    if len % 2 == 1 {
        zeros.push(ZERO);
        poles.push(ZERO);
    }

    let mut z = cplxreal(&zeros)?;
    let mut p = cplxreal(&poles)?;
    let exhausted = || WavefieldError::MalformedInput("ran out of poles while pairing".to_string());

    let mut pairs = Vec::with_capacity(n_sections);
    for _ in 0..n_sections {
        // the "worst" pole, closest to the unit circle
        let idx = argmin(p.iter().map(|x| (1.0 - x.norm()).abs())).ok_or_else(exhausted)?;
        let p1 = p.remove(idx);

        let z1;
        let z2;
        let p2;
        if is_real(p1) && !p.iter().any(|x| is_real(*x)) {
            // first-order section
            z1 = z.remove(nearest_idx(&z, p1, true)?);
            z2 = ZERO;
            p2 = ZERO;
        } else {
            let idx = if !is_real(p1) && z.iter().filter(|x| is_real(**x)).count() == 1 {
                // keep the lone real zero for a later first-order section
                nearest_idx(&z, p1, false)?
            } else {
                argmin(z.iter().map(|x| (p1 - *x).norm())).ok_or_else(exhausted)?
            };
            z1 = z.remove(idx);

            if !is_real(p1) {
                p2 = p1.conj();
                z2 = if !is_real(z1) {
                    z1.conj()
                } else {
                    z.remove(nearest_idx(&z, p1, true)?)
                };
            } else if !is_real(z1) {
                z2 = z1.conj();
                p2 = p.remove(nearest_idx(&p, z1, true)?);
            } else {
                let idx = p
                    .iter()
                    .enumerate()
                    .filter(|(_, x)| is_real(**x))
                    .min_by(|a, b| (a.1.norm() - 1.0).abs().total_cmp(&(b.1.norm() - 1.0).abs()))
                    .map(|(i, _)| i)
                    .ok_or_else(exhausted)?;
                p2 = p.remove(idx);
                z2 = z.remove(nearest_idx(&z, p2, true)?);
            }
        }

        pairs.push(([z1, z2], [p1, p2]));
    }

    let sections = pairs
        .into_iter()
        .rev()
        .enumerate()
        .map(|(i, (zeros, poles))| {
            let gain = if i == 0 { zpk.gain } else { 1.0 };
            SecondOrderSection::from_roots(zeros, poles, gain)
        })
        .collect();

    Ok(SosCascade::new(sections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn assert_section(section: &SecondOrderSection, expected: [f64; 6]) {
        for (got, want) in section.coefficients().iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_empty_zpk_is_gain_only() {
        let sos = zpk_to_sos(&Zpk::new(vec![], vec![], 2.5)).unwrap();
        assert_eq!(sos.len(), 1);
        assert_eq!(sos.sections()[0].coefficients(), [2.5, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(sos.order(), 0);
    }

    #[test]
    fn test_single_real_pole_is_padded() {
        let zpk = Zpk::new(vec![c(1.0, 0.0)], vec![c(0.5, 0.0)], 1.0);
        let sos = zpk_to_sos(&zpk).unwrap();
        assert_eq!(sos.len(), 1);
        assert_section(&sos.sections()[0], [1.0, -1.0, 0.0, 1.0, -0.5, 0.0]);
        assert_eq!(sos.order(), 1);
    }

    #[test]
    fn test_conjugate_pair() {
        let p = Complex64::from_polar(0.9, 0.3);
        let z = Complex64::from_polar(1.0, 0.5);
        let zpk = Zpk::new(vec![z, z.conj()], vec![p, p.conj()], 0.5);
        let sos = zpk_to_sos(&zpk).unwrap();

        assert_eq!(sos.len(), 1);
        assert_section(
            &sos.sections()[0],
            [
                0.5,
                -0.5 * 2.0 * 0.5f64.cos(),
                0.5,
                1.0,
                -1.8 * 0.3f64.cos(),
                0.81,
            ],
        );
    }

    #[test]
    fn test_pole_nearest_unit_circle_comes_last() {
        let near = Complex64::from_polar(0.95, 2.0);
        let far = Complex64::from_polar(0.5, 1.0);
        let zpk = Zpk::new(
            vec![c(1.0, 0.0); 4],
            vec![far, near, far.conj(), near.conj()],
            1.0,
        );
        let sos = zpk_to_sos(&zpk).unwrap();

        assert_eq!(sos.len(), 2);
        assert_relative_eq!(sos.sections()[0].a[2], 0.25, epsilon = 1e-12);
        assert_relative_eq!(sos.sections()[1].a[2], 0.9025, epsilon = 1e-12);
        assert_eq!(sos.order(), 4);
    }

    #[test]
    fn test_cascade_matches_zpk_response() {
        let pair = Complex64::from_polar(0.8, 0.7);
        let zero_pair = Complex64::from_polar(0.9, 1.9);
        let zpk = Zpk::new(
            vec![zero_pair, zero_pair.conj(), c(-0.3, 0.0)],
            vec![pair, pair.conj(), c(0.6, 0.0)],
            0.7,
        );

        let sos = zpk_to_sos(&zpk).unwrap();
        assert_eq!(sos.len(), 2);
        assert_eq!(sos.order(), 3);
        for omega in [0.0, 0.4, 1.3, 2.9] {
            let expected = zpk.response_at(Complex64::from_polar(1.0, omega));
            let got = sos.response(omega);
            assert_relative_eq!(got.re, expected.re, epsilon = 1e-12);
            assert_relative_eq!(got.im, expected.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unmatched_conjugate_is_rejected() {
        let zpk = Zpk::new(vec![c(1.0, 0.0); 2], vec![c(0.5, 0.5), c(0.2, 0.0)], 1.0);
        assert!(matches!(
            zpk_to_sos(&zpk),
            Err(WavefieldError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_section_stability() {
        assert!(SecondOrderSection::unity().is_stable());
        assert!(SecondOrderSection::new([1.0, 0.0, 0.0], [1.0, -1.8, 0.81]).is_stable());
        // double pole at z = 1
        assert!(!SecondOrderSection::new([1.0, 0.0, 0.0], [1.0, -2.0, 1.0]).is_stable());
        // real pole at z = -1.2
        assert!(!SecondOrderSection::new([1.0, 0.0, 0.0], [1.0, 1.2, 0.0]).is_stable());

        let poles = SecondOrderSection::new([1.0, 0.0, 0.0], [1.0, -1.8, 0.81]).poles();
        assert_relative_eq!(poles[0].re, 0.9, epsilon = 1e-7);
        assert_relative_eq!(poles[1].re, 0.9, epsilon = 1e-7);
    }

    #[test]
    fn test_process_impulse_response() {
        let cascade = SosCascade::new(vec![SecondOrderSection::new(
            [1.0, 0.0, 0.0],
            [1.0, -0.5, 0.0],
        )]);
        let out = cascade.process(&[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(out, vec![1.0, 0.5, 0.25, 0.125]);
    }

    #[test]
    fn test_process_matches_response_at_dc() {
        let section = SecondOrderSection::new([0.2, 0.3, 0.1], [1.0, -0.6, 0.2]);
        let cascade = SosCascade::new(vec![section, section]);
        let out = cascade.process(&vec![1.0; 400]);
        let dc = cascade.response(0.0);
        assert_relative_eq!(*out.last().unwrap(), dc.re, epsilon = 1e-12);
        assert_relative_eq!(dc.im, 0.0, epsilon = 1e-15);
    }
}
