extern crate wavebank;

use wavebank::{PhaseGen, WaveTerrain};
use wavebank::Float;

use crossbeam::channel;
use std::thread;
use std::time::Duration;

const BLOCK_SIZE: usize = 256;

enum Message {
    Radius(Float),
    Center(Float, Float),
}

fn main() {
    let mut terrain = WaveTerrain::new(512);
    let mut phase_gen = PhaseGen::new(44100.0, 220.0);

    let (sender, receiver) = channel::unbounded();

    // Stand-in for a GUI thread: orbit parameter changes arrive over a
    // channel and get applied between blocks.
    let controls = thread::spawn(move || {
        for step in 1..5 {
            thread::sleep(Duration::from_millis(20));
            sender.send(Message::Radius(0.2 * step as Float)).unwrap();
            sender.send(Message::Center(0.1 * step as Float, -0.1 * step as Float)).unwrap();
        }
    });

    let mut phase_buf = [0.0; BLOCK_SIZE];
    let mut freq_buf = [0.0; BLOCK_SIZE];
    let mut out = [0.0; BLOCK_SIZE];

    for block in 0..200 {
        while let Ok(message) = receiver.try_recv() {
            match message {
                Message::Radius(radius) => terrain.radius = radius,
                Message::Center(x, y) => {
                    terrain.center_x = x;
                    terrain.center_y = y;
                }
            }
        }

        phase_gen.fill(&mut phase_buf, &mut freq_buf);
        terrain.process(&phase_buf, &mut out);

        if block % 50 == 0 {
            let rms = (out.iter().map(|s| s * s).sum::<Float>() / BLOCK_SIZE as Float).sqrt();
            println!("block {}: radius {:.2}, center ({:.2}, {:.2}), rms {:.4}",
                block, terrain.radius, terrain.center_x, terrain.center_y, rms);
        }
        thread::sleep(Duration::from_millis(1));
    }

    controls.join().unwrap();
}
