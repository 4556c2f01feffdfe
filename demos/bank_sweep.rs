extern crate wavebank;

use wavebank::{BankConfig, PhaseGen, WavData, WavHandler, WavSamples, WtBank, WtOsc};
use wavebank::Float;

use std::sync::Arc;

const BLOCK_SIZE: usize = 256;

fn main() {
    let sample_rate = 44100.0;

    // The bank has to be fully built before any samples are generated.
    let bank = Arc::new(WtBank::build(sample_rate, &BankConfig::default()).unwrap());
    let osc = WtOsc::new(sample_rate, bank);

    // Sweep two octaves up from 110 Hz over 4 seconds. The phase generator
    // produces the (phase, frequency) stream, the oscillator turns it into
    // samples, one block at a time, the way an audio host would call it.
    let mut phase_gen = PhaseGen::new(sample_rate, 110.0);
    let num_blocks = (4.0 * sample_rate) as usize / BLOCK_SIZE;
    let mut phase_buf = [0.0; BLOCK_SIZE];
    let mut freq_buf = [0.0; BLOCK_SIZE];
    let mut out = [0.0; BLOCK_SIZE];
    let mut rendered: Vec<f32> = Vec::with_capacity(num_blocks * BLOCK_SIZE);

    for block in 0..num_blocks {
        let octaves = 2.0 * block as Float / num_blocks as Float;
        phase_gen.set_freq(110.0 * (2.0 as Float).powf(octaves));
        phase_gen.fill(&mut phase_buf, &mut freq_buf);
        osc.process(&phase_buf, &freq_buf, &mut out);
        rendered.extend(out.iter().map(|sample| *sample as f32));
    }

    let data = WavData::new_from_data(WavSamples::Float32(rendered), sample_rate as u32);
    match WavHandler::write_file(&data, "sweep.wav") {
        Ok(()) => println!("Wrote sweep.wav"),
        Err(()) => println!("Failed to write sweep.wav"),
    }
}
