use wavebank::{AmdfEstimator, EstimatorConfig, SampleBuffer, WavHandler};

use flexi_logger::Logger;

use std::fs;
use std::process;

fn main() {
    Logger::with_env_or_str("info")
        .start()
        .unwrap();

    let mut args = std::env::args().skip(1);
    let filename = match args.next() {
        Some(filename) => filename,
        None => {
            eprintln!("Usage: pitch_info <file.wav> [config.json]");
            process::exit(1);
        }
    };
    let config = match args.next() {
        Some(path) => read_config(&path),
        None => EstimatorConfig::default(),
    };

    let wav_data = match WavHandler::read_file(&filename) {
        Ok(data) => data,
        Err(()) => {
            eprintln!("Unable to read [{}]", filename);
            process::exit(1);
        }
    };
    let buffer = match SampleBuffer::from_wav(&wav_data) {
        Ok(buffer) => buffer,
        Err(()) => {
            eprintln!("Unsupported sample data in [{}]", filename);
            process::exit(1);
        }
    };
    let window = SampleBuffer::new(buffer.window_ms(config.window_ms).to_vec(),
                                   buffer.sample_rate);

    let estimator = AmdfEstimator::from_config(&config);
    match estimator.estimate(&window) {
        Ok(frequency) => println!("Frequency: {:.2} Hz", frequency),
        Err(e) => {
            eprintln!("Estimation failed: {}", e);
            process::exit(1);
        }
    }
}

fn read_config(path: &str) -> EstimatorConfig {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Unable to read config file [{}]: {}", path, e);
            process::exit(1);
        }
    };
    match serde_json::from_str(&text) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid config file [{}]: {}", path, e);
            process::exit(1);
        }
    }
}
