//! Sample data and format information of WAV file content.

use num::ToPrimitive;

// Format tag identifiers (don't care about uLaw for now)
pub const FMT_PCM: u16 = 1;
pub const FMT_FLOAT: u16 = 3;

/// Represents the format chunk that needs to be present in every WAV file.
#[derive(Debug, Default, Copy, Clone)]
pub struct FmtChunk {
    pub format_tag: u16,      // wFormatTag      2   Format code
    pub num_channels: u16,    // nChannels       2   Number of interleaved channels
    pub sample_rate: u32,     // nSamplesPerSec  4   Sampling rate (blocks per second)
    pub avg_data_rate: u32,   // nAvgBytesPerSec 4   Data rate
    pub block_align: u16,     // nBlockAlign     2   Data block size (bytes)
    pub bits_per_sample: u16, // wBitsPerSample  2   Bits per sample
}

impl FmtChunk {
    pub fn new(data: &WavSamples, sample_rate: u32) -> FmtChunk {
        let bps = data.bits_per_sample();
        FmtChunk {
            format_tag: data.format_tag(),
            num_channels: 1,
            sample_rate,
            avg_data_rate: sample_rate * (bps as u32 / 8),
            block_align: 0,
            bits_per_sample: bps,
        }
    }
}

/// Container for the supported sample data types.
#[derive(Clone, Debug, PartialEq)]
pub enum WavSamples {
    Pcm8(Vec<u8>),
    Pcm16(Vec<i16>),
    Float32(Vec<f32>),
}

impl WavSamples {
    /// Get the number of samples in the container.
    pub fn num_samples(&self) -> usize {
        match self {
            WavSamples::Pcm8(v) => v.len(),
            WavSamples::Pcm16(v) => v.len(),
            WavSamples::Float32(v) => v.len(),
        }
    }

    /// Get the format tag of the FMT chunk that represents the current
    /// data type.
    pub fn format_tag(&self) -> u16 {
        match self {
            WavSamples::Pcm8(_) => FMT_PCM,
            WavSamples::Pcm16(_) => FMT_PCM,
            WavSamples::Float32(_) => FMT_FLOAT,
        }
    }

    /// Get the number of bits per sample of the current data type.
    pub fn bits_per_sample(&self) -> u16 {
        match self {
            WavSamples::Pcm8(_) => 8,
            WavSamples::Pcm16(_) => 16,
            WavSamples::Float32(_) => 32,
        }
    }

    pub fn num_bytes(&self) -> usize {
        self.num_samples() * (self.bits_per_sample() / 8) as usize
    }

    /// Convert the sample data to 16 bit signed analysis samples.
    ///
    /// Unsigned 8 bit samples are re-centered around zero, float samples are
    /// scaled by the 16 bit range and clamped at its edges.
    pub fn to_pcm16(&self) -> Vec<i16> {
        match self {
            WavSamples::Pcm8(v) => v.iter()
                .map(|s| (s.to_i16().unwrap_or(0) - 128) << 8)
                .collect(),
            WavSamples::Pcm16(v) => v.clone(),
            WavSamples::Float32(v) => v.iter().map(|s| float_to_i16(*s)).collect(),
        }
    }
}

fn float_to_i16(value: f32) -> i16 {
    let scaled = (value * 32767.0).round();
    match scaled.to_i16() {
        Some(s) => s,
        None => if scaled < 0.0 { i16::MIN } else { i16::MAX },
    }
}

/// Contains the format information and sample data read from a file.
pub struct WavData {
    info: FmtChunk,
    samples: WavSamples,
}

impl WavData {
    /// Create a struct containing the given list of samples.
    pub fn new_from_data(samples: WavSamples, sample_rate: u32) -> WavData {
        let info = FmtChunk::new(&samples, sample_rate);
        WavData { info, samples }
    }

    pub(crate) fn new_raw(info: FmtChunk, samples: WavSamples) -> WavData {
        WavData { info, samples }
    }

    /// Get the FMT chunk.
    pub fn get_fmt(&self) -> &FmtChunk {
        &self.info
    }

    /// Get mutable reference to the FMT chunk.
    pub fn get_fmt_mut(&mut self) -> &mut FmtChunk {
        &mut self.info
    }

    /// Get the sample data.
    pub fn get_samples(&self) -> &WavSamples {
        &self.samples
    }

    /// Get the number of samples.
    pub fn num_samples(&self) -> usize {
        self.samples.num_samples()
    }

    /// Get the number of sample bytes.
    pub fn num_bytes(&self) -> usize {
        self.samples.num_bytes()
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[test]
fn u8_samples_are_centered() {
    let samples = WavSamples::Pcm8(vec![0, 128, 255]);
    assert_eq!(samples.to_pcm16(), vec![-32768, 0, 32512]);
}

#[test]
fn i16_samples_pass_through() {
    let samples = WavSamples::Pcm16(vec![-32768, -1, 0, 1, 32767]);
    assert_eq!(samples.to_pcm16(), vec![-32768, -1, 0, 1, 32767]);
}

#[test]
fn float_samples_are_scaled_and_clamped() {
    let samples = WavSamples::Float32(vec![-1.0, 0.0, 0.5, 1.0, 2.0, -2.0]);
    assert_eq!(samples.to_pcm16(), vec![-32767, 0, 16384, 32767, 32767, -32768]);
}

#[test]
fn byte_counts_follow_the_data_type() {
    assert_eq!(WavSamples::Pcm8(vec![1, 2, 3]).num_bytes(), 3);
    assert_eq!(WavSamples::Pcm16(vec![1, 2, 3]).num_bytes(), 6);
    assert_eq!(WavSamples::Float32(vec![1.0, 2.0]).num_bytes(), 8);
}

#[test]
fn fmt_chunk_is_derived_from_samples() {
    let data = WavData::new_from_data(WavSamples::Pcm16(vec![0; 4]), 44100);
    let fmt = data.get_fmt();
    assert_eq!(fmt.format_tag, FMT_PCM);
    assert_eq!(fmt.num_channels, 1);
    assert_eq!(fmt.sample_rate, 44100);
    assert_eq!(fmt.bits_per_sample, 16);
    assert_eq!(fmt.avg_data_rate, 88200);
    assert_eq!(data.num_bytes(), 8);
}
