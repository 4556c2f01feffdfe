//! Pitch estimation with the average magnitude difference function.
//!
//! The AMDF of a signal window is the mean absolute difference between the
//! window and a copy of itself shifted by a lag value. For a periodic signal
//! the profile over all lags shows troughs near multiples of the period, so
//! the distance between the first two local minima gives the period length,
//! and with it the fundamental frequency.
//!
//! This is an offline batch computation without real-time constraints. It
//! runs over a private buffer, allocates freely and produces a single scalar
//! estimate per invocation.

use super::Float;
use super::wav_data::WavData;

use log::{debug, error};
use serde::{Serialize, Deserialize};

use std::cmp;
use std::fmt;

// Public error types

/// The AMDF profile contained fewer than two local minima, so no period
/// length could be derived.
#[derive(Debug)]
pub struct InsufficientPeriodicity;
impl fmt::Display for InsufficientPeriodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signal contains too little periodicity for an estimate")
    }
}
impl std::error::Error for InsufficientPeriodicity { }

/// Parameters for the offline pitch estimation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub window_ms: u32,       // Length of the analyzed window
    pub bounds_offset: usize, // Lags to skip at the start of the profile
}

impl Default for EstimatorConfig {
    fn default() -> EstimatorConfig {
        EstimatorConfig {
            window_ms: 50,
            bounds_offset: 0,
        }
    }
}

/// A window of analysis samples with its sample rate.
///
/// The buffer is loaded once, read-only during analysis, and discarded after
/// the estimate is produced.
pub struct SampleBuffer {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> SampleBuffer {
        SampleBuffer { samples, sample_rate }
    }

    /// Create an analysis buffer from WAV file content.
    ///
    /// Only single channel files are supported. Sample data in other formats
    /// than 16 bit PCM is converted.
    pub fn from_wav(wav: &WavData) -> Result<SampleBuffer, ()> {
        if wav.get_fmt().num_channels > 1 {
            error!("Only single channel files supported");
            return Err(());
        }
        Ok(SampleBuffer {
            samples: wav.get_samples().to_pcm16(),
            sample_rate: wav.get_fmt().sample_rate,
        })
    }

    /// Leading slice of at most the given duration.
    pub fn window_ms(&self, duration_ms: u32) -> &[i16] {
        let num_samples = (self.sample_rate as usize / 1000) * duration_ms as usize;
        &self.samples[..cmp::min(num_samples, self.samples.len())]
    }
}

/// Average magnitude difference of the signal against itself at the given
/// lag.
///
/// Computes the mean of |samples[i] - samples[i + tau]| over the overlapping
/// part of the window. O(n) in the window length.
pub fn amdf(samples: &[i16], tau: usize) -> Float {
    let len = samples.len();
    if tau >= len {
        return 0.0;
    }
    let mut sum: Float = 0.0;
    for i in 0..len - tau {
        let a = samples[i] as Float;
        let b = samples[i + tau] as Float;
        sum += (a - b).abs();
    }
    sum / (len - tau) as Float
}

/// The AMDF at every lag of the window, indexed by lag.
///
/// Lower values indicate stronger periodicity at that lag. O(n^2) in the
/// window length, which limits the usable window size; the profile is the
/// reference behavior and deliberately not optimized.
pub fn profile(samples: &[i16]) -> Vec<Float> {
    let mut values = Vec::with_capacity(samples.len());
    for tau in 0..samples.len() {
        values.push(amdf(samples, tau));
    }
    values
}

/// Lags whose AMDF value lies below both neighbors, in ascending order.
///
/// The scan starts at bounds_offset + 1, so early lags can be excluded from
/// peak picking.
pub fn find_local_minima(profile: &[Float], bounds_offset: usize) -> Vec<usize> {
    let mut minima = Vec::new();
    if profile.len() < 3 {
        return minima;
    }
    for tau in bounds_offset + 1..profile.len() - 1 {
        if profile[tau] < profile[tau - 1] && profile[tau] < profile[tau + 1] {
            minima.push(tau);
        }
    }
    minima
}

pub struct AmdfEstimator {
    bounds_offset: usize,
}

impl AmdfEstimator {
    pub fn new() -> AmdfEstimator {
        AmdfEstimator { bounds_offset: 0 }
    }

    pub fn with_bounds_offset(bounds_offset: usize) -> AmdfEstimator {
        AmdfEstimator { bounds_offset }
    }

    pub fn from_config(config: &EstimatorConfig) -> AmdfEstimator {
        AmdfEstimator { bounds_offset: config.bounds_offset }
    }

    /// Estimate the fundamental frequency of the buffer in Hz.
    ///
    /// The period length is taken as the distance between the first two
    /// local minima of the AMDF profile. Spurious early minima, as they
    /// appear in noisy or strongly harmonic signals, shift the estimate;
    /// the bounds offset can be used to skip past them. A profile with
    /// fewer than two minima is reported as an estimation failure.
    ///
    /// ```
    /// use wavebank::{AmdfEstimator, SampleBuffer};
    ///
    /// let samples: Vec<i16> = (0..1000)
    ///     .map(|i| (f64::sin(2.0 * std::f64::consts::PI * 100.0 * i as f64 / 44100.0) * 10000.0) as i16)
    ///     .collect();
    /// let buffer = SampleBuffer::new(samples, 44100);
    /// let freq = AmdfEstimator::new().estimate(&buffer).unwrap();
    /// assert!(freq > 95.0 && freq < 105.0);
    /// ```
    pub fn estimate(&self, buffer: &SampleBuffer) -> Result<Float, InsufficientPeriodicity> {
        let profile = profile(&buffer.samples);
        let minima = find_local_minima(&profile, self.bounds_offset);
        if minima.len() < 2 {
            return Err(InsufficientPeriodicity);
        }
        let period = minima[1] - minima[0];
        debug!("First minima at lags {} and {}, period {} samples", minima[0], minima[1], period);
        Ok(buffer.sample_rate as Float / period as Float)
    }
}

impl Default for AmdfEstimator {
    fn default() -> AmdfEstimator {
        AmdfEstimator::new()
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
fn sine_samples(freq: f64, amplitude: f64, sample_rate: u32, len: usize) -> Vec<i16> {
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate as f64;
            (phase.sin() * amplitude) as i16
        })
        .collect()
}

#[test]
fn amdf_is_zero_at_lag_zero() {
    let samples = sine_samples(100.0, 10000.0, 44100, 500);
    assert_eq!(amdf(&samples, 0), 0.0);
}

#[test]
fn amdf_is_symmetric_under_negation() {
    let samples = sine_samples(100.0, 10000.0, 44100, 500);
    let negated: Vec<i16> = samples.iter().map(|s| -s).collect();
    for tau in &[1, 17, 100, 441] {
        assert_eq!(amdf(&samples, *tau), amdf(&negated, *tau));
    }
}

#[test]
fn profile_has_minimum_near_the_period() {
    // 100 Hz at 44100 Hz: period of 441 samples
    let samples = sine_samples(100.0, 10000.0, 44100, 1000);
    let profile = profile(&samples);
    let minima = find_local_minima(&profile, 0);
    assert!(!minima.is_empty());
    let first = minima[0] as i64;
    assert!((first - 441).abs() <= 2);
}

#[test]
fn pure_sine_is_estimated_within_tolerance() {
    let samples = sine_samples(100.0, 10000.0, 44100, 1000);
    let buffer = SampleBuffer::new(samples, 44100);
    let freq = AmdfEstimator::new().estimate(&buffer).unwrap();
    assert!(freq > 95.0 && freq < 105.0);
}

#[test]
fn aperiodic_signal_is_reported_as_failure() {
    // A ramp has a strictly increasing profile and no local minima
    let samples: Vec<i16> = (0..500).collect();
    let buffer = SampleBuffer::new(samples, 44100);
    let result = AmdfEstimator::new().estimate(&buffer);
    assert!(matches!(result, Err(InsufficientPeriodicity)));
}

#[test]
fn short_buffer_is_reported_as_failure() {
    let buffer = SampleBuffer::new(vec![0, 1], 44100);
    let result = AmdfEstimator::new().estimate(&buffer);
    assert!(result.is_err());
}

#[test]
fn minima_are_picked_in_ascending_order() {
    let profile = vec![5.0, 3.0, 4.0, 2.0, 1.0, 2.0, 5.0, 1.0, 5.0];
    let minima = find_local_minima(&profile, 0);
    assert_eq!(minima, vec![1, 4, 7]);
}

#[test]
fn bounds_offset_skips_early_minima() {
    let profile = vec![5.0, 3.0, 4.0, 2.0, 1.0, 2.0, 5.0, 1.0, 5.0];
    let minima = find_local_minima(&profile, 3);
    assert_eq!(minima, vec![4, 7]);
}

#[test]
fn strong_second_harmonic_causes_octave_error() {
    // The first-two-minima rule is fragile by design: a strong second
    // harmonic puts a trough at half the period, and the estimate lands an
    // octave above the true fundamental.
    let sample_rate = 44100;
    let samples: Vec<i16> = (0..2000)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let fundamental = f64::sin(2.0 * std::f64::consts::PI * 100.0 * t) * 8000.0;
            let second = f64::sin(2.0 * std::f64::consts::PI * 200.0 * t) * 6000.0;
            (fundamental + second) as i16
        })
        .collect();
    let buffer = SampleBuffer::new(samples, sample_rate);
    let freq = AmdfEstimator::new().estimate(&buffer).unwrap();
    assert!(freq > 150.0); // Not the 100 Hz fundamental
}
