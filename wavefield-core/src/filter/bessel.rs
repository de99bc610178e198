//! Bessel (maximally flat group delay) analog low-pass prototype.
//!
//! The prototype is normalized for unit group delay at DC: its poles are the
//! roots of the reverse Bessel polynomial
//!
//! ```text
//! θ_n(s) = Σ_k (2n - k)! / (2^(n-k) k! (n-k)!) s^k
//! ```
//!
//! and its gain is `θ_n(0) = (2n - 1)!!` so the DC gain is one.
//!
//! The roots of `θ_n` are extremely sensitive to its coefficients, so the
//! polynomial is never evaluated from them. `θ_n` satisfies
//!
//! ```text
//! θ_k(s) = (2k - 1) θ_(k-1)(s) + s² θ_(k-2)(s)
//! ```
//!
//! whose solutions are `θ_k(s)` and `θ_k(-s)`. In the left half-plane
//! `θ_k(s) = e^(2s) θ_k(-s) + m_k(s)`, where `θ_k(-s)` is dominant (stable
//! forward) and `m_k` is the minimal solution (stable backward, Miller's
//! algorithm). Both are carried as ratios of consecutive degrees, which gives
//! the Newton correction `θ_n / θ_n'` to full precision without overflow,
//! using `θ_n' = θ_n - s θ_(n-1)`.
//!
//! Roots are then found with the Aberth–Ehrlich iteration on the upper
//! half-plane only, seeded with the Campos–Calderón asymptotic estimates. The
//! lower half is mirrored, so conjugate pairs are exact by construction.

use super::zpk::Zpk;
use crate::error::{Result, WavefieldError};
use num_complex::Complex64;

const MAX_ITERATIONS: usize = 200;

/// Extra backward recurrence steps beyond `n + |s|`.
const MILLER_MARGIN: usize = 32;

/// Relative tolerance for the root-sum sanity check.
const SUM_TOLERANCE: f64 = 1e-9;

/// Coefficients of `θ_n`, lowest power first.
///
/// The low-order coefficients overflow `f64` beyond order ~150.
pub fn reverse_bessel_polynomial(order: usize) -> Vec<f64> {
    let n = order;
    let mut coeffs = vec![0.0; n + 1];
    coeffs[n] = 1.0;
    for k in (1..=n).rev() {
        // a[k-1] = a[k] * k (2n - k + 1) / (2 (n - k + 1))
        coeffs[k - 1] = coeffs[k] * (k * (2 * n - k + 1)) as f64 / (2 * (n - k + 1)) as f64;
    }
    coeffs
}

/// Poles of the delay-normalized Bessel prototype of the given order.
///
/// Returns an empty vector for order 0. Otherwise the real pole (odd orders)
/// comes first, followed by conjugate pairs `p, p̄` with `Im p > 0`.
pub fn bessel_poles(order: usize) -> Result<Vec<Complex64>> {
    if order == 0 {
        return Ok(Vec::new());
    }

    let (upper, real) = aberth(order);

    let mut poles = Vec::with_capacity(order);
    poles.extend(real.map(|x| Complex64::new(x, 0.0)));
    for u in upper {
        poles.push(u);
        poles.push(u.conj());
    }

    if let Some(p) = poles.iter().find(|p| !(p.re < 0.0 && p.im.is_finite())) {
        return Err(WavefieldError::NumericalInstability(format!(
            "Bessel prototype of order {} has a pole outside the left half-plane: {}",
            order, p
        )));
    }

    // Σ p = -a[n-1] = -n (n + 1) / 2
    let expected = -((order * (order + 1)) as f64) / 2.0;
    let sum: f64 = poles.iter().map(|p| p.re).sum();
    let error = (sum - expected).abs() / expected.abs();
    if !(error <= SUM_TOLERANCE) {
        return Err(WavefieldError::NumericalInstability(format!(
            "Bessel prototype of order {} did not converge (relative root-sum error {:e})",
            order, error
        )));
    }

    log::trace!("Bessel prototype order {}: poles {:?}", order, poles);

    Ok(poles)
}

/// Analog Bessel low-pass prototype of the given order, delay-normalized.
///
/// Order 0 is the constant `1`: no zeros, no poles. Higher orders have no
/// zeros, `order` poles in the open left half-plane (exact conjugate pairs,
/// plus one real pole for odd orders) and a gain of `θ_n(0)`. When that gain
/// does not fit in an `f64` the result is [`WavefieldError::NumericalInstability`];
/// use [`bessel_poles`] if only the poles are needed.
pub fn bessel_prototype(order: usize) -> Result<Zpk> {
    let poles = bessel_poles(order)?;
    let gain: f64 = (1..=order).map(|k| (2 * k - 1) as f64).product();
    if !gain.is_finite() {
        return Err(WavefieldError::NumericalInstability(format!(
            "gain of the order {} Bessel prototype overflows",
            order
        )));
    }
    Ok(Zpk::new(Vec::new(), poles, gain))
}

/// Campos–Calderón estimates, mapped to the reverse polynomial: the upper
/// half-plane roots and the real root for odd orders.
fn initial_roots(n: usize) -> (Vec<Complex64>, Option<f64>) {
    if n == 1 {
        return (Vec::new(), Some(-1.0));
    }

    // coefficients lowest power first
    let poly = |x: f64, c: &[f64]| c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci);
    let nf = n as f64;
    let s = poly(nf, &[0.0, 0.0, 2.0, 0.0, -3.0, 1.0]);
    let b3 = poly(nf, &[16.0, -8.0]) / s;
    let b2 = poly(nf, &[-24.0, -12.0, 12.0]) / s;
    let b1 = poly(nf, &[8.0, 24.0, -12.0, -2.0]) / s;
    let b0 = poly(nf, &[0.0, -6.0, 0.0, 5.0, -1.0]) / s;
    let r = poly(nf, &[0.0, 0.0, 2.0, 1.0]);
    let a1 = poly(nf, &[-6.0, -6.0]) / r;
    let a2 = 6.0 / r;

    // zeros of the ordinary Bessel polynomial, inverted
    let mut seeds: Vec<Complex64> = (1..=n)
        .map(|k| {
            let k = k as f64;
            let x = Complex64::new(poly(k, &[0.0, a1, a2]), poly(k, &[b0, b1, b2, b3]));
            x.inv()
        })
        .collect();
    seeds.sort_by(|a, b| b.im.total_cmp(&a.im));

    let upper = seeds[..n / 2]
        .iter()
        .map(|z| Complex64::new(z.re, z.im.abs()))
        .collect();
    let real = (n % 2 == 1).then(|| seeds[n / 2].re);
    (upper, real)
}

/// `θ_n(s) / θ_(n-1)(s)`.
fn degree_ratio(n: usize, s: Complex64) -> Complex64 {
    let s2 = s * s;
    if s.re >= 0.0 {
        // θ_k(s) itself is dominant here
        let mut q = 1.0 + s;
        for k in 2..=n {
            q = (2 * k - 1) as f64 + s2 / q;
        }
        return q;
    }

    // forward[k - 1] = θ_k(-s) / θ_(k-1)(-s)
    let mut forward = Vec::with_capacity(n);
    let mut q = 1.0 - s;
    forward.push(q);
    for k in 2..=n {
        q = (2 * k - 1) as f64 + s2 / q;
        forward.push(q);
    }

    // backward[k] = m_k / m_(k-1)
    let reach = s.norm().min((8 * n) as f64).ceil() as usize;
    let start = n + reach + MILLER_MARGIN;
    let mut backward = vec![Complex64::new(0.0, 0.0); n + 1];
    let mut t = Complex64::new(0.0, 0.0);
    for k in (1..=start).rev() {
        t = s2 / (t - (2 * k + 1) as f64);
        if k <= n {
            backward[k] = t;
        }
    }

    // log of m_(n-1) / (e^(2s) θ_(n-1)(-s)), with m_0 = 1 - e^(2s)
    let mut log_r = -2.0 * s + (1.0 - (2.0 * s).exp()).ln();
    for k in 1..n {
        log_r += (backward[k] / forward[k - 1]).ln();
    }

    let (qn, tn) = (forward[n - 1], backward[n]);
    if log_r.re <= 0.0 {
        let r = log_r.exp();
        (qn + tn * r) / (1.0 + r)
    } else {
        let r_inv = (-log_r).exp();
        (qn * r_inv + tn) / (r_inv + 1.0)
    }
}

/// Aberth correction at `z` given the sum of `1 / (z - z_j)` over the other
/// roots.
fn aberth_step(n: usize, z: Complex64, repulsion: Complex64) -> Complex64 {
    let q = degree_ratio(n, z);
    // θ_n / θ_n' = q / (q - z)
    let newton = q / (q - z);
    newton / (1.0 - newton * repulsion)
}

fn converged(step: f64, root: f64) -> bool {
    !step.is_finite() || step <= 4.0 * f64::EPSILON * root
}

fn aberth(n: usize) -> (Vec<Complex64>, Option<f64>) {
    let (mut upper, mut real) = initial_roots(n);
    let mut done = vec![false; upper.len()];
    let mut real_done = real.is_none();

    for _ in 0..MAX_ITERATIONS {
        for i in 0..upper.len() {
            if done[i] {
                continue;
            }
            let z = upper[i];
            let mut repulsion = 1.0 / (z - z.conj());
            for (j, u) in upper.iter().enumerate() {
                if j != i {
                    repulsion += 1.0 / (z - *u) + 1.0 / (z - u.conj());
                }
            }
            if let Some(x) = real {
                repulsion += 1.0 / (z - x);
            }

            let step = aberth_step(n, z, repulsion);
            if step.re.is_finite() && step.im.is_finite() {
                upper[i] = z - step;
            }
            done[i] = converged(step.norm(), upper[i].norm());
        }

        if let Some(x) = real.filter(|_| !real_done) {
            let z = Complex64::new(x, 0.0);
            let repulsion: Complex64 = upper
                .iter()
                .map(|u| 1.0 / (z - *u) + 1.0 / (z - u.conj()))
                .sum();
            let step = aberth_step(n, z, repulsion).re;
            if step.is_finite() {
                real = Some(x - step);
            }
            real_done = converged(step.abs(), (x - step).abs());
        }

        if real_done && done.iter().all(|&d| d) {
            break;
        }
    }

    (upper, real)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sorted(mut poles: Vec<Complex64>) -> Vec<Complex64> {
        poles.sort_by(|a, b| a.re.total_cmp(&b.re).then(a.im.total_cmp(&b.im)));
        poles
    }

    #[test]
    fn test_polynomial_coefficients() {
        assert_eq!(reverse_bessel_polynomial(0), vec![1.0]);
        assert_eq!(reverse_bessel_polynomial(1), vec![1.0, 1.0]);
        assert_eq!(reverse_bessel_polynomial(2), vec![3.0, 3.0, 1.0]);
        assert_eq!(reverse_bessel_polynomial(3), vec![15.0, 15.0, 6.0, 1.0]);
        assert_eq!(
            reverse_bessel_polynomial(4),
            vec![105.0, 105.0, 45.0, 10.0, 1.0]
        );
    }

    #[test]
    fn test_order_zero_is_unity() {
        let zpk = bessel_prototype(0).unwrap();
        assert!(zpk.zeros.is_empty());
        assert!(zpk.poles.is_empty());
        assert_eq!(zpk.gain, 1.0);
    }

    #[test]
    fn test_low_orders() {
        let zpk = bessel_prototype(1).unwrap();
        assert_eq!(zpk.poles.len(), 1);
        assert_relative_eq!(zpk.poles[0].re, -1.0, epsilon = 1e-14);
        assert_eq!(zpk.poles[0].im, 0.0);
        assert_relative_eq!(zpk.gain, 1.0);

        let zpk = bessel_prototype(2).unwrap();
        let poles = sorted(zpk.poles);
        assert_relative_eq!(poles[0].re, -1.5, epsilon = 1e-14);
        assert_relative_eq!(poles[0].im, -0.8660254037844386, epsilon = 1e-14);
        assert_eq!(poles[1], poles[0].conj());
        assert_relative_eq!(zpk.gain, 3.0);

        let zpk = bessel_prototype(3).unwrap();
        let poles = sorted(zpk.poles);
        assert_relative_eq!(poles[0].re, -2.322185354626086, epsilon = 1e-13);
        assert_eq!(poles[0].im, 0.0);
        assert_relative_eq!(poles[1].re, -1.8389073226869574, epsilon = 1e-13);
        assert_relative_eq!(poles[1].im, -1.7543809597837219, epsilon = 1e-13);
        assert_relative_eq!(zpk.gain, 15.0);
    }

    #[test]
    fn test_poles_are_roots_of_the_polynomial() {
        for order in 1..=12 {
            let coeffs = reverse_bessel_polynomial(order);
            for p in bessel_poles(order).unwrap() {
                let value = coeffs
                    .iter()
                    .rev()
                    .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * p + c);
                let bound: f64 = coeffs
                    .iter()
                    .enumerate()
                    .map(|(k, c)| c * p.norm().powi(k as i32))
                    .sum();
                assert!(value.norm() <= 1e-12 * bound, "order {}", order);
            }
        }
    }

    #[test]
    fn test_roots_satisfy_vieta() {
        for order in 1..=100 {
            let zpk = bessel_prototype(order).unwrap();
            assert_eq!(zpk.poles.len(), order);

            let sum: Complex64 = zpk.poles.iter().sum();
            let expected = -((order * (order + 1)) as f64) / 2.0;
            assert_relative_eq!(sum.re, expected, max_relative = 1e-12);
            assert!(sum.im.abs() < 1e-9);

            // product of (-p) equals θ_n(0)
            let product: Complex64 = zpk.poles.iter().map(|p| -*p).product();
            assert_relative_eq!(product.re, zpk.gain, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_poles_are_stable_and_paired() {
        for order in (1..=100).chain([150, 200]) {
            let poles = bessel_poles(order).unwrap();
            assert_eq!(poles.len(), order);
            assert!(poles.iter().all(|p| p.re < 0.0), "order {}", order);
            for p in &poles {
                assert!(poles.iter().any(|q| *q == p.conj()));
            }
            let real = poles.iter().filter(|p| p.im == 0.0).count();
            assert_eq!(real, order % 2);
        }
    }

    #[test]
    fn test_unit_group_delay_at_dc() {
        // τ(0) = -Σ Re(1/p)
        for order in 1..=100 {
            let poles = bessel_poles(order).unwrap();
            let tau: f64 = poles.iter().map(|p| -p.inv().re).sum();
            assert_relative_eq!(tau, 1.0, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_gain_overflow_is_reported() {
        assert!(bessel_poles(200).is_ok());
        assert!(matches!(
            bessel_prototype(200),
            Err(WavefieldError::NumericalInstability(_))
        ));
    }
}
