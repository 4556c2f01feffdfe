//! A wavetable oscillator fed by an external phase/frequency stream.
//!
//! The oscillator implements the audio host boundary: for every incoming
//! (phase, frequency) pair it produces exactly one output sample. It keeps no
//! state between frames apart from the shared read-only bank, so each call is
//! a pure function of its inputs, and the per-sample path performs no
//! allocation, locking or I/O.

use super::Float;
use super::wt_bank::WtBankRef;

pub struct WtOsc {
    pub sample_rate: Float,
    bank: WtBankRef,
}

impl WtOsc {
    /// Create a new wavetable oscillator.
    ///
    /// The bank must have been built for the same sample rate, and it must be
    /// fully built before the first processing call.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use wavebank::{BankConfig, WtBank, WtOsc};
    ///
    /// let sample_rate = 44100.0;
    /// let bank = Arc::new(WtBank::build(sample_rate, &BankConfig::default()).unwrap());
    /// let osc = WtOsc::new(sample_rate, bank);
    /// ```
    pub fn new(sample_rate: Float, bank: WtBankRef) -> WtOsc {
        WtOsc { sample_rate, bank }
    }

    /// Replace the bank used for sound generation.
    pub fn set_bank(&mut self, bank: WtBankRef) {
        self.bank = bank;
    }

    /// Get one output sample for the given frequency and phase.
    pub fn sample(&self, frequency: Float, phase: Float) -> Float {
        self.bank.lookup(frequency, phase)
    }

    /// Process one block of frames.
    ///
    /// Writes one output sample per incoming (phase, frequency) pair. The
    /// three buffers are expected to have the host's block size; extra frames
    /// in longer input buffers are ignored.
    pub fn process(&self, phase_in: &[Float], freq_in: &[Float], out: &mut [Float]) {
        for ((sample, phase), freq) in out.iter_mut().zip(phase_in).zip(freq_in) {
            *sample = self.bank.lookup(*freq, *phase);
        }
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wt_bank::{BankConfig, WtBank};
    use std::sync::Arc;

    fn test_osc() -> WtOsc {
        let config = BankConfig { min_freq: 20.0, harmonics: 16, table_size: 256 };
        let bank = Arc::new(WtBank::build(44100.0, &config).unwrap());
        WtOsc::new(44100.0, bank)
    }

    #[test]
    fn one_sample_per_frame() {
        let osc = test_osc();
        let phase: Vec<Float> = (0..64).map(|i| i as Float / 64.0).collect();
        let freq = vec![440.0; 64];
        let mut out = vec![0.0; 64];
        osc.process(&phase, &freq, &mut out);
        for (i, sample) in out.iter().enumerate() {
            assert_eq!(*sample, osc.sample(440.0, phase[i]));
            assert!(*sample <= 1.0 && *sample >= -1.0);
        }
    }

    #[test]
    fn process_is_stateless() {
        let osc = test_osc();
        let phase = vec![0.25; 16];
        let freq = vec![330.0; 16];
        let mut first = vec![0.0; 16];
        let mut second = vec![0.0; 16];
        osc.process(&phase, &freq, &mut first);
        osc.process(&phase, &freq, &mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn bank_can_be_swapped() {
        let mut osc = test_osc();
        let config = BankConfig { min_freq: 40.0, harmonics: 8, table_size: 256 };
        let other = Arc::new(WtBank::build(44100.0, &config).unwrap());
        osc.set_bank(other);
        let sample = osc.sample(440.0, 0.5);
        assert!(sample <= 1.0 && sample >= -1.0);
    }
}
