//! A bank of bandlimited wavetables, one per octave.
//!
//! The bank holds one table for each octave between a configurable lowest
//! fundamental frequency and the Nyquist frequency. Every table contains the
//! same ramp waveform, built from its Fourier series, but only with the
//! partials that stay below Nyquist for the octave the table serves.
//!
//! A lookup selects the table for the requested frequency and cross-fades
//! with the next table up, so a frequency sweep moves through the octave
//! boundaries without an audible step. The bank is built once, before the
//! audio callback starts, and is read-only afterwards: lookups are pure
//! functions of frequency and phase, free of allocation and locking.

use super::Float;
use super::wavetable::Wavetable;

use log::{debug, info};
use scoped_threadpool::Pool;
use serde::{Serialize, Deserialize};

use std::cmp;
use std::fmt;
use std::sync::Arc;

// Public error types

#[derive(Debug)]
pub struct InvalidBankConfig;
impl fmt::Display for InvalidBankConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid bank configuration")
    }
}
impl std::error::Error for InvalidBankConfig { }

/// Construction parameters for a wavetable bank.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BankConfig {
    pub min_freq: Float,   // Fundamental frequency of the first table
    pub harmonics: usize,  // Partials per table, before bandlimiting
    pub table_size: usize, // Samples per wave cycle
}

impl Default for BankConfig {
    fn default() -> BankConfig {
        BankConfig {
            min_freq: 20.0,
            harmonics: 16,
            table_size: 4096,
        }
    }
}

pub struct WtBank {
    sample_rate: Float,
    tables: Vec<Wavetable>,
}

pub type WtBankRef = Arc<WtBank>;

// Fourier coefficient for the k-th partial of the bandlimited ramp, k >= 1.
fn coeff(k: usize) -> Float {
    if k % 2 == 0 {
        -1.0 / k as Float
    } else {
        1.0 / k as Float
    }
}

impl WtBank {
    /// Build a bank of octave tables for the given sample rate.
    ///
    /// The bank covers `config.min_freq` up to the Nyquist frequency with one
    /// table per octave. Table n is valid up to `min_freq * 2^n`. Since the
    /// bandlimiting thresholds depend on Nyquist, the bank has to be built
    /// with the true output sample rate, and it has to be built before the
    /// audio callback is activated: construction allocates and runs
    /// transcendental math over every table.
    ///
    /// ```
    /// use wavebank::{BankConfig, WtBank};
    ///
    /// let bank = WtBank::build(44100.0, &BankConfig::default()).unwrap();
    /// assert_eq!(bank.len(), 12);
    /// ```
    pub fn build(sample_rate: Float, config: &BankConfig) -> Result<WtBank, InvalidBankConfig> {
        if sample_rate <= 0.0 || config.min_freq <= 0.0 || config.table_size == 0 {
            return Err(InvalidBankConfig);
        }
        let nyquist = sample_rate / 2.0;
        let num_tables = WtBank::num_octaves(nyquist, config.min_freq);
        info!("Building bank of {} octave tables, {} samples each", num_tables, config.table_size);

        let mut tables = Vec::with_capacity(num_tables);
        let mut freq = config.min_freq;
        for _ in 0..num_tables {
            tables.push(Wavetable::new(freq, config.table_size));
            freq *= 2.0; // Next octave
        }

        let harmonics = config.harmonics;
        let mut pool = Pool::new(4);
        pool.scoped(|scope| {
            for table in tables.iter_mut() {
                scope.execute(move || {
                    WtBank::fill_table(table, sample_rate, harmonics);
                });
            }
        });

        Ok(WtBank { sample_rate, tables })
    }

    // Number of octave tables needed to cover min_freq up to Nyquist.
    fn num_octaves(nyquist: Float, min_freq: Float) -> usize {
        let octaves = (nyquist / min_freq).log2().ceil();
        if octaves < 0.0 {
            1
        } else {
            octaves as usize + 1
        }
    }

    /// Highest partial of the given fundamental that stays below the Nyquist
    /// frequency.
    ///
    /// ```
    /// use wavebank::WtBank;
    ///
    /// // 100 Hz fundamental: partials up to 220 * 100 Hz fit below 22050 Hz
    /// assert_eq!(WtBank::max_partials(100.0, 44100.0), 220);
    /// ```
    pub fn max_partials(base_freq: Float, sample_rate: Float) -> usize {
        let nyquist = sample_rate / 2.0;
        if base_freq > nyquist {
            return 0;
        }
        (nyquist / base_freq) as usize
    }

    // Sum the non-aliasing partials of the ramp series into a table.
    //
    // Adds all odd partials and subtracts all even partials with reciprocal
    // amplitude, then normalizes the result to unit peak. A table whose
    // fundamental is already above Nyquist gets no partials at all and stays
    // silent.
    fn fill_table(table: &mut Wavetable, sample_rate: Float, harmonics: usize) {
        let num_partials = cmp::min(harmonics, WtBank::max_partials(table.max_freq, sample_rate));
        for k in 1..num_partials + 1 {
            Wavetable::add_sine_wave(&mut table.samples, k as Float, coeff(k));
        }
        Wavetable::normalize(&mut table.samples);
        debug!("Table for {} Hz: {} partials", table.max_freq, num_partials);
    }

    /// Index of the table responsible for the given frequency.
    ///
    /// Returns the first table whose frequency bound lies strictly above the
    /// requested frequency, or the last table if the frequency exceeds all
    /// bounds.
    pub fn select_index(&self, freq: Float) -> usize {
        for (i, table) in self.tables.iter().enumerate() {
            if freq < table.max_freq {
                return i;
            }
        }
        self.tables.len() - 1
    }

    /// Get one output sample for the given frequency and phase.
    ///
    /// Evaluates the table selected for the frequency and cross-fades with
    /// the table of the next octave, weighted by the position of the
    /// frequency inside the octave. The top table has no neighbor above and
    /// is evaluated directly.
    pub fn lookup(&self, freq: Float, phase: Float) -> Float {
        let idx = self.select_index(freq);
        if idx >= self.tables.len() - 1 {
            return self.tables[idx].eval(phase);
        }
        let f1 = self.tables[idx].max_freq;
        let f0 = if idx == 0 { 0.0 } else { self.tables[idx - 1].max_freq };
        let w = (freq - f0) / (f1 - f0);
        self.tables[idx].eval(phase) * (1.0 - w) + self.tables[idx + 1].eval(phase) * w
    }

    /// Number of octave tables in the bank.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Get a single octave table by index.
    pub fn table(&self, idx: usize) -> &Wavetable {
        &self.tables[idx]
    }

    /// The sample rate the bank was built for.
    pub fn sample_rate(&self) -> Float {
        self.sample_rate
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
fn test_config() -> BankConfig {
    // Small tables keep the construction in tests cheap
    BankConfig { min_freq: 20.0, harmonics: 16, table_size: 256 }
}

#[cfg(test)]
fn is_close_to(actual: Float, expected: Float, delta: Float) -> bool {
    let diff = actual - expected;
    diff < delta && diff > -delta
}

#[test]
fn coefficients_follow_the_ramp_series() {
    assert_eq!(coeff(1), 1.0);
    assert_eq!(coeff(2), -0.5);
    assert_eq!(coeff(3), 1.0 / 3.0);
    assert_eq!(coeff(4), -0.25);
}

#[test]
fn bank_has_one_table_per_octave() {
    // ceil(log2(22050 / 20)) + 1 = 12
    let bank = WtBank::build(44100.0, &test_config()).unwrap();
    assert_eq!(bank.len(), 12);
    let mut expected = 20.0;
    for i in 0..bank.len() {
        assert!(is_close_to(bank.table(i).max_freq, expected, 0.001));
        expected *= 2.0;
    }
}

#[test]
fn invalid_config_is_rejected() {
    assert!(WtBank::build(44100.0, &BankConfig { min_freq: 0.0, ..test_config() }).is_err());
    assert!(WtBank::build(44100.0, &BankConfig { table_size: 0, ..test_config() }).is_err());
    assert!(WtBank::build(0.0, &test_config()).is_err());
}

#[test]
fn construction_is_deterministic() {
    let a = WtBank::build(44100.0, &test_config()).unwrap();
    let b = WtBank::build(44100.0, &test_config()).unwrap();
    assert_eq!(a.tables, b.tables);
}

#[test]
fn select_index_picks_first_strictly_greater_bound() {
    let bank = WtBank::build(44100.0, &test_config()).unwrap();
    assert_eq!(bank.select_index(10.0), 0);
    assert_eq!(bank.select_index(19.99), 0);
    assert_eq!(bank.select_index(20.0), 1); // Tie goes to the next octave
    assert_eq!(bank.select_index(25.0), 1);
    assert_eq!(bank.select_index(100.0), 3);
    assert_eq!(bank.select_index(100_000.0), bank.len() - 1);
}

#[test]
fn select_index_is_monotonic() {
    let bank = WtBank::build(44100.0, &test_config()).unwrap();
    let freqs = [1.0, 10.0, 20.0, 25.0, 40.0, 100.0, 440.0, 1000.0, 5000.0, 22050.0, 50000.0];
    let mut last = 0;
    for freq in &freqs {
        let idx = bank.select_index(*freq);
        assert!(idx >= last);
        last = idx;
    }
}

#[test]
fn lookup_stays_in_unit_range() {
    let bank = WtBank::build(44100.0, &test_config()).unwrap();
    let mut freq = 5.0;
    while freq < 22050.0 {
        let mut phase = 0.0;
        while phase < 1.0 {
            let sample = bank.lookup(freq, phase);
            assert!(sample <= 1.0 && sample >= -1.0);
            phase += 0.01;
        }
        freq *= 1.7;
    }
}

#[test]
fn lookup_is_continuous_across_octave_bounds() {
    let bank = WtBank::build(44100.0, &test_config()).unwrap();
    let bound = bank.table(1).max_freq; // 40 Hz
    for phase in &[0.1, 0.3, 0.7, 0.9] {
        let below = bank.lookup(bound - 0.01, *phase);
        let above = bank.lookup(bound + 0.01, *phase);
        assert!(is_close_to(below, above, 0.01));
    }
}

#[test]
fn lookup_with_invalid_phase_is_silent() {
    let bank = WtBank::build(44100.0, &test_config()).unwrap();
    assert_eq!(bank.lookup(440.0, -0.5), 0.0);
    assert_eq!(bank.lookup(440.0, 1.0), 0.0);
}

#[test]
fn fundamental_above_nyquist_is_silent() {
    let bank = WtBank::build(44100.0, &test_config()).unwrap();
    // The top table's fundamental lies above Nyquist, so it got no partials
    let top = bank.table(bank.len() - 1);
    assert!(top.max_freq > 22050.0);
    for sample in &top.samples {
        assert_eq!(*sample, 0.0);
    }
    assert_eq!(bank.lookup(30000.0, 0.25), 0.0);
}

#[test]
fn tables_are_bandlimited_per_octave() {
    let bank = WtBank::build(44100.0, &test_config()).unwrap();
    // Lowest table carries all 16 configured partials
    let spectrum = bank.table(0).freq_spectrum();
    for bin in 1..17 {
        assert!(spectrum[bin].norm() > 0.1);
    }
    for bin in 17..64 {
        assert!(is_close_to(spectrum[bin].norm(), 0.0, 0.01));
    }
    // Table at 20480 Hz has room for the fundamental only
    let idx = bank.select_index(15000.0);
    let high = bank.table(idx);
    assert_eq!(WtBank::max_partials(high.max_freq, 44100.0), 1);
    let spectrum = high.freq_spectrum();
    assert!(spectrum[1].norm() > 0.1);
    for bin in 2..64 {
        assert!(is_close_to(spectrum[bin].norm(), 0.0, 0.01));
    }
}
