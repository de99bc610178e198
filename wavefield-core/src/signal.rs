//! Delay-line builder for driving signals.
//!
//! A mono excitation signal is copied once per channel, shifted by that
//! channel's delay and scaled by its weight. Delays may be negative: the
//! output clock starts at the earliest channel and the shift is reported as
//! a time offset.
//!
//! # Data Format
//! Buffers are **PLANAR** by column: shape `(samples, channels)`, one column
//! per loudspeaker.

use crate::config::validate_sample_rate;
use crate::error::{Result, WavefieldError, ensure_len};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis, s};

/// Delayed (and optionally weighted) copies of an excitation signal.
#[derive(Debug, Clone, PartialEq)]
pub struct DrivingSignals {
    buffer: Array2<f64>,
    t_offset: f64,
    start_samples: Vec<usize>,
}

impl DrivingSignals {
    /// Sample buffer of shape `(samples, channels)`.
    pub fn buffer(&self) -> ArrayView2<'_, f64> {
        self.buffer.view()
    }

    /// Time in seconds of the buffer's first row relative to the original
    /// timeline. Negative when some channel had to start early.
    pub fn t_offset(&self) -> f64 {
        self.t_offset
    }

    pub fn channels(&self) -> usize {
        self.buffer.ncols()
    }

    /// Number of samples per channel.
    pub fn len(&self) -> usize {
        self.buffer.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn channel(&self, channel: usize) -> ArrayView1<'_, f64> {
        self.buffer.column(channel)
    }

    /// First row occupied by the signal copy in `channel`.
    pub fn start_sample(&self, channel: usize) -> usize {
        self.start_samples[channel]
    }

    pub fn start_samples(&self) -> &[usize] {
        &self.start_samples
    }

    pub fn into_parts(self) -> (Array2<f64>, f64) {
        (self.buffer, self.t_offset)
    }
}

/// Largest delay magnitude in samples, 2^53.
const MAX_DELAY_SAMPLES: f64 = 9_007_199_254_740_992.0;

/// Converts delays in seconds to whole samples.
///
/// Ties round to even so results do not depend on the platform's rounding
/// primitive. Delays beyond ±2^53 samples are rejected.
pub fn delays_to_samples(delays: &[f64], fs: u32) -> Result<Vec<i64>> {
    validate_sample_rate(fs as f64)?;
    delays
        .iter()
        .enumerate()
        .map(|(i, &delay)| {
            if !delay.is_finite() {
                return Err(WavefieldError::MalformedInput(format!(
                    "delay {} is not finite: {}",
                    i, delay
                )));
            }
            let samples = (delay * fs as f64).round_ties_even();
            if samples.abs() > MAX_DELAY_SAMPLES {
                return Err(WavefieldError::MalformedInput(format!(
                    "delay {} of {} s is out of range at {} Hz",
                    i, delay, fs
                )));
            }
            Ok(samples as i64)
        })
        .collect()
}

/// Delays `signal` by each entry of `delays` (seconds) into its own column.
///
/// The smallest delay is moved to sample 0; [`DrivingSignals::t_offset`]
/// reports how far that moved the time origin.
pub fn apply_delays(signal: &[f64], delays: &[f64], fs: u32) -> Result<DrivingSignals> {
    if signal.is_empty() {
        return Err(WavefieldError::MalformedInput(
            "excitation signal is empty".to_string(),
        ));
    }
    if delays.is_empty() {
        return Err(WavefieldError::MalformedInput(
            "at least one channel delay is required".to_string(),
        ));
    }

    let delay_samples = delays_to_samples(delays, fs)?;
    // non-empty, checked above; |d| <= 2^53 so differences fit in i64
    let offset = delay_samples.iter().copied().min().unwrap_or(0);
    let start_samples: Vec<usize> = delay_samples
        .iter()
        .map(|&d| usize::try_from(d - offset))
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| span_error(delays.len(), signal.len()))?;
    let rows = start_samples
        .iter()
        .copied()
        .max()
        .unwrap_or(0)
        .checked_add(signal.len())
        .ok_or_else(|| span_error(delays.len(), signal.len()))?;

    let mut buffer = zeroed_buffer(rows, delays.len())?;
    let source = ArrayView1::from(signal);
    for (channel, &start) in start_samples.iter().enumerate() {
        buffer
            .slice_mut(s![start..start + signal.len(), channel])
            .assign(&source);
    }

    log::trace!(
        "Applied {} delays: {} rows, offset {} samples",
        delays.len(),
        rows,
        offset
    );

    Ok(DrivingSignals {
        buffer,
        t_offset: offset as f64 / fs as f64,
        start_samples,
    })
}

fn span_error(channels: usize, len: usize) -> WavefieldError {
    WavefieldError::MalformedInput(format!(
        "delay span for {} channels of {} samples does not fit in a buffer",
        channels, len
    ))
}

/// Zero-filled `(rows, channels)` buffer, failing instead of aborting when it
/// cannot be allocated.
fn zeroed_buffer(rows: usize, channels: usize) -> Result<Array2<f64>> {
    let too_large = || {
        WavefieldError::MalformedInput(format!(
            "buffer of {} x {} samples cannot be allocated",
            rows, channels
        ))
    };
    let total = rows.checked_mul(channels).ok_or_else(too_large)?;
    let mut data = Vec::new();
    data.try_reserve_exact(total).map_err(|_| too_large())?;
    data.resize(total, 0.0);
    Array2::from_shape_vec((rows, channels), data).map_err(|_| too_large())
}

/// Delays and weights `signal` per channel.
///
/// Equivalent to [`apply_delays`] followed by scaling column `c` by
/// `weights[c]`.
pub fn driving_signals(
    delays: &[f64],
    weights: &[f64],
    signal: &[f64],
    fs: u32,
) -> Result<DrivingSignals> {
    ensure_len(delays.len(), weights.len())?;
    if let Some(i) = weights.iter().position(|w| !w.is_finite()) {
        return Err(WavefieldError::MalformedInput(format!(
            "weight {} is not finite: {}",
            i, weights[i]
        )));
    }

    let mut signals = apply_delays(signal, delays, fs)?;
    for (mut column, &weight) in signals.buffer.axis_iter_mut(Axis(1)).zip(weights) {
        column *= weight;
    }

    Ok(signals)
}
