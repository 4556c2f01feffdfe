//! Generates the phase/frequency stream that drives the oscillators.
//!
//! One generator produces two parallel signals, one sample per frame: the
//! normalized waveform position in [0.0, 1.0) and the instantaneous
//! fundamental frequency in Hz. The phase accumulator lives in the generator
//! instance instead of hidden static state, so any number of independent
//! generators can run side by side.

use super::Float;

use log::debug;

pub struct PhaseGen {
    pub sample_rate: Float,
    freq: Float,
    phase: Float,
}

impl PhaseGen {
    pub fn new(sample_rate: Float, freq: Float) -> PhaseGen {
        debug!("New phase generator at {} Hz", freq);
        PhaseGen {
            sample_rate,
            freq,
            phase: 0.0,
        }
    }

    /// Set the frequency, taking effect on the next generated frame.
    pub fn set_freq(&mut self, freq: Float) {
        self.freq = freq;
    }

    pub fn freq(&self) -> Float {
        self.freq
    }

    pub fn phase(&self) -> Float {
        self.phase
    }

    /// Fill one block with phase and frequency values.
    ///
    /// Writes the current phase and frequency per frame, then advances the
    /// accumulator by freq / sample_rate and wraps it back into [0.0, 1.0).
    pub fn fill(&mut self, phase_out: &mut [Float], freq_out: &mut [Float]) {
        for (phase, freq) in phase_out.iter_mut().zip(freq_out.iter_mut()) {
            *phase = self.phase;
            *freq = self.freq;
            self.phase += self.freq / self.sample_rate;
            while self.phase >= 1.0 {
                self.phase -= 1.0;
            }
            while self.phase < 0.0 {
                self.phase += 1.0;
            }
        }
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[test]
fn phase_stays_in_unit_range() {
    let mut pg = PhaseGen::new(1000.0, 440.0);
    let mut phase = [0.0; 512];
    let mut freq = [0.0; 512];
    pg.fill(&mut phase, &mut freq);
    for p in &phase {
        assert!(*p >= 0.0 && *p < 1.0);
    }
}

#[test]
fn phase_advances_by_frequency_step() {
    let mut pg = PhaseGen::new(100.0, 10.0);
    let mut phase = [0.0; 4];
    let mut freq = [0.0; 4];
    pg.fill(&mut phase, &mut freq);
    assert_eq!(phase[0], 0.0);
    assert!((phase[1] - 0.1).abs() < 0.0001);
    assert!((phase[2] - 0.2).abs() < 0.0001);
    assert_eq!(freq[0], 10.0);
}

#[test]
fn frequency_change_applies_to_next_frame() {
    let mut pg = PhaseGen::new(100.0, 10.0);
    let mut phase = [0.0; 2];
    let mut freq = [0.0; 2];
    pg.fill(&mut phase, &mut freq);
    pg.set_freq(20.0);
    pg.fill(&mut phase, &mut freq);
    assert_eq!(freq[0], 20.0);
    assert_eq!(freq[1], 20.0);
}

#[test]
fn phase_wraps_around() {
    let mut pg = PhaseGen::new(10.0, 9.0); // 0.9 phase step
    let mut phase = [0.0; 10];
    let mut freq = [0.0; 10];
    pg.fill(&mut phase, &mut freq);
    for p in &phase {
        assert!(*p >= 0.0 && *p < 1.0);
    }
}
