//! A single bandlimited wavetable.
//!
//! A wavetable holds one period of a periodic waveform, sampled at a fixed
//! resolution and valid up to a maximum fundamental frequency. Above that
//! frequency one of its partials would cross the Nyquist frequency, and a
//! table for the next octave has to be used instead.
//!
//! In memory, the first sample is duplicated at the end of the vector, so an
//! oscillator interpolating between position i and i + 1 never needs to wrap
//! the index. The table is constructed once by summing sine partials and is
//! read-only afterwards.

use super::Float;

use log::debug;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

#[cfg(feature = "use_double_precision")]
pub const PI: f64 = std::f64::consts::PI;
#[cfg(not(feature = "use_double_precision"))]
pub const PI: f32 = std::f32::consts::PI;

pub type Harmonic = Complex<Float>;

#[derive(Clone, Debug, PartialEq)]
pub struct Wavetable {
    pub max_freq: Float,    // Upper frequency bound of the octave this table serves
    pub num_samples: usize, // Number of unique samples in one wave cycle
    pub num_values: usize,  // num_samples + 1, first sample duplicated at the end
    pub samples: Vec<Float>,
}

impl Wavetable {
    /// Creates a new, silent wavetable.
    ///
    /// ```
    /// use wavebank::Wavetable;
    ///
    /// let wt = Wavetable::new(20.0, 4096);
    /// ```
    pub fn new(max_freq: Float, num_samples: usize) -> Wavetable {
        let num_values = num_samples + 1;
        debug!("New wavetable for frequencies up to {} Hz, {} samples", max_freq, num_samples);
        Wavetable {
            max_freq,
            num_samples,
            num_values,
            samples: vec![0.0; num_values],
        }
    }

    /// Add a sine wave with the given frequency and amplitude to the buffer.
    ///
    /// Frequency is relative to the buffer length, so a value of 1 will put
    /// one wave period into the table. The values are added to the values
    /// already in the table. Giving a negative amplitude will subtract the
    /// values.
    ///
    /// The last sample in the table receives the same value as the first, to
    /// allow interpolation without index wrapping.
    pub fn add_sine_wave(table: &mut [Float], freq: Float, amplitude: Float) {
        let extra_sample = table.len() & 0x01;
        let num_samples = table.len() - extra_sample;
        let num_samples_f = num_samples as Float;
        let mult = freq * 2.0 * PI;
        for i in 0..num_samples {
            let position = mult * (i as Float / num_samples_f);
            table[i] += position.sin() * amplitude;
        }
        if extra_sample > 0 {
            table[table.len() - 1] = table[0];
        }
    }

    /// Normalizes samples in a table to the range [-1.0,1.0].
    ///
    /// Searches the maximum absolute value and uses it to calculate the
    /// required scale. A table with peak 0 is left untouched, so degenerate
    /// harmonic configurations cannot divide by zero.
    pub fn normalize(table: &mut [Float]) {
        let mut max: Float = 0.0;
        for sample in table.iter() {
            let current = sample.abs();
            if current > max {
                max = current;
            }
        }
        if max > 0.0 {
            for sample in table.iter_mut() {
                *sample /= max;
            }
        }
    }

    /// Get the table value at the given phase, in the range [0.0, 1.0).
    ///
    /// Positions between two samples are linearly interpolated. A phase
    /// outside the valid range produces silence instead of a crash, to guard
    /// against malformed upstream phase generation.
    pub fn eval(&self, phase: Float) -> Float {
        if phase < 0.0 || phase >= 1.0 {
            return 0.0;
        }
        if self.num_samples == 0 {
            return 0.0;
        }
        let pos = phase * self.num_samples as Float;
        let mut i = pos as usize; // take floor
        if i > self.num_samples - 1 {
            i = self.num_samples - 1; // rounding at phase -> 1 must not pass the guard value
        }
        let fr = pos - i as Float;
        let x0 = self.samples[i];
        let x1 = self.samples[i + 1];
        (1.0 - fr) * x0 + fr * x1
    }

    /// Calculate the frequency spectrum of the table.
    ///
    /// The result of running an FFT over the unique samples of the table.
    /// Bin k holds the k-th partial, so the spectrum shows directly which
    /// partials a bandlimited table contains.
    pub fn freq_spectrum(&self) -> Vec<Harmonic> {
        let fft_len = self.num_samples;
        let mut buffer: Vec<Complex<Float>> = vec![Complex::zero(); fft_len];
        for (i, sample) in self.samples.iter().take(fft_len).enumerate() {
            buffer[i].re = *sample;
            buffer[i].im = 0.0;
        }
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_len);
        fft.process(&mut buffer);
        buffer
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
fn is_close_to(actual: Float, expected: Float, delta: Float) -> bool {
    let diff = actual - expected;
    if diff > delta || diff < -delta {
        println!("Expected {}, actual {}, delta {}", expected, actual, delta);
        false
    } else {
        true
    }
}

#[test]
fn new_table_is_silent() {
    let wt = Wavetable::new(20.0, 64);
    assert_eq!(wt.num_values, 65);
    for phase in &[0.0, 0.25, 0.5, 0.99] {
        assert_eq!(wt.eval(*phase), 0.0);
    }
}

#[test]
fn sine_wave_can_be_added() {
    let mut wt = Wavetable::new(20.0, 64);
    Wavetable::add_sine_wave(&mut wt.samples, 1.0, 1.0);
    assert!(is_close_to(wt.eval(0.25), 1.0, 0.01));
    assert!(is_close_to(wt.eval(0.75), -1.0, 0.01));
    assert_eq!(wt.samples[64], wt.samples[0]);
}

#[test]
fn invalid_phase_produces_silence() {
    let mut wt = Wavetable::new(20.0, 64);
    Wavetable::add_sine_wave(&mut wt.samples, 1.0, 1.0);
    assert_eq!(wt.eval(-0.1), 0.0);
    assert_eq!(wt.eval(1.0), 0.0);
    assert_eq!(wt.eval(1.5), 0.0);
}

#[test]
fn eval_is_continuous_at_the_wrap_boundary() {
    let mut wt = Wavetable::new(20.0, 64);
    Wavetable::add_sine_wave(&mut wt.samples, 1.0, 1.0);
    Wavetable::add_sine_wave(&mut wt.samples, 2.0, 0.5);
    let start = wt.eval(0.0);
    let end = wt.eval(1.0 - 0.0001);
    assert!(is_close_to(end, start, 0.05));
}

#[test]
fn eval_interpolates_between_samples() {
    let mut wt = Wavetable::new(20.0, 4);
    wt.samples = vec![2.0, 3.0, 0.0, 0.0, 2.0];
    assert_eq!(wt.eval(0.0), 2.0);   // Exactly first value
    assert_eq!(wt.eval(0.25), 3.0);  // Exactly second value
    assert_eq!(wt.eval(0.125), 2.5); // Middle
}

#[test]
fn normalize_scales_to_unit_peak() {
    let mut table = vec![0.5, -2.0, 1.0];
    Wavetable::normalize(&mut table);
    assert!(is_close_to(table[0], 0.25, 0.0001));
    assert!(is_close_to(table[1], -1.0, 0.0001));
    assert!(is_close_to(table[2], 0.5, 0.0001));
}

#[test]
fn normalize_leaves_silent_table_untouched() {
    let mut table = vec![0.0; 16];
    Wavetable::normalize(&mut table);
    for sample in &table {
        assert_eq!(*sample, 0.0);
        assert!(!sample.is_nan());
    }
}

#[test]
fn spectrum_shows_single_partial() {
    let mut wt = Wavetable::new(20.0, 64);
    Wavetable::add_sine_wave(&mut wt.samples, 1.0, 1.0);
    let spectrum = wt.freq_spectrum();
    assert!(spectrum[1].norm() > 1.0);
    for bin in 2..32 {
        assert!(is_close_to(spectrum[bin].norm(), 0.0, 0.01));
    }
}
