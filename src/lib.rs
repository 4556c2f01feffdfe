#![allow(dead_code)]
#![allow(unused_imports)]

mod amdf;
mod phase_gen;
mod terrain;
mod wav_data;
mod wav_handler;
mod wavetable;
mod wt_bank;
mod wt_oscillator;

pub use amdf::{amdf, find_local_minima, profile};
pub use amdf::{AmdfEstimator, EstimatorConfig, InsufficientPeriodicity, SampleBuffer};
pub use phase_gen::PhaseGen;
pub use terrain::{SurfaceFn, WaveTerrain};
pub use wav_data::{FmtChunk, WavData, WavSamples};
pub use wav_handler::WavHandler;
pub use wavetable::{Harmonic, Wavetable};
pub use wt_bank::{BankConfig, InvalidBankConfig, WtBank, WtBankRef};
pub use wt_oscillator::WtOsc;

#[cfg(feature = "use_double_precision")]
pub type Float = f64;
#[cfg(not(feature = "use_double_precision"))]
pub type Float = f32;
