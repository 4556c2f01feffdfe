extern crate wavebank;

use wavebank::{AmdfEstimator, SampleBuffer};

fn main() {
    let sample_rate = 44100;
    let freq = 220.0;

    // 50 ms of a pure sine, the window size the offline tool analyzes.
    let num_samples = sample_rate / 1000 * 50;
    let samples: Vec<i16> = (0..num_samples)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate as f64;
            (phase.sin() * 16000.0) as i16
        })
        .collect();

    let buffer = SampleBuffer::new(samples, sample_rate as u32);
    match AmdfEstimator::new().estimate(&buffer) {
        Ok(estimate) => println!("Generated {} Hz, estimated {:.2} Hz", freq, estimate),
        Err(e) => println!("Estimation failed: {}", e),
    }
}
