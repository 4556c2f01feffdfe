//! A two-dimensional wave terrain oscillator.
//!
//! The terrain is a square grid of samples taken from a surface function
//! over the unit square. An oscillator travels a circular orbit across the
//! terrain: the phase input selects a position on the circle, the circle
//! coordinates are wrapped into the terrain and the four neighboring grid
//! samples are bilinearly interpolated.
//!
//! Moving the orbit with the radius and center parameters changes the
//! harmonic content continuously, which makes the terrain usable as a
//! scanned-synthesis style sound source.

use super::Float;
use super::wavetable::PI;

use log::debug;

pub type SurfaceFn = fn(Float, Float) -> Float;

// Default terrain surface, evaluated over the unit square.
fn default_surface(x: Float, y: Float) -> Float {
    x.sin() * y.sin() * (x - 1.0) * (y - 1.0) * (x + 1.0) * (y + 1.0)
}

pub struct WaveTerrain {
    size: usize,
    table: Vec<Float>, // size * size samples, rows contiguous
    pub radius: Float,
    pub center_x: Float,
    pub center_y: Float,
}

impl WaveTerrain {
    /// Create a terrain of the given grid size with the default surface.
    ///
    /// ```
    /// use wavebank::WaveTerrain;
    ///
    /// let terrain = WaveTerrain::new(512);
    /// ```
    pub fn new(size: usize) -> WaveTerrain {
        WaveTerrain::with_surface(size, default_surface)
    }

    /// Create a terrain from a custom surface function.
    ///
    /// The surface gets sampled on a size x size grid, with both arguments
    /// running over [0.0, 1.0).
    pub fn with_surface(size: usize, surface: SurfaceFn) -> WaveTerrain {
        let mut table = vec![0.0; size * size];
        for i in 0..size {
            let y = i as Float / size as Float;
            for j in 0..size {
                let x = j as Float / size as Float;
                table[i * size + j] = surface(x, y);
            }
        }
        debug!("New wave terrain, {}x{} samples", size, size);
        WaveTerrain {
            size,
            table,
            radius: 0.5,
            center_x: 0.0,
            center_y: 0.0,
        }
    }

    /// Set the orbit parameters for subsequent lookups.
    pub fn set_orbit(&mut self, radius: Float, center_x: Float, center_y: Float) {
        self.radius = radius;
        self.center_x = center_x;
        self.center_y = center_y;
    }

    // Wrap a coordinate into [-1.0, 1.0) by whole periods. Iterative on
    // purpose: small numeric drift walks back in single steps.
    fn wrap(mut value: Float) -> Float {
        while value >= 1.0 {
            value -= 2.0;
        }
        while value < -1.0 {
            value += 2.0;
        }
        value
    }

    /// Evaluate the terrain at the given coordinates.
    ///
    /// Both coordinates are wrapped into [-1.0, 1.0), mapped to a fractional
    /// grid index per axis, and the four neighboring samples are bilinearly
    /// interpolated, with the grid wrapping around at its upper edges.
    pub fn eval(&self, x: Float, y: Float) -> Float {
        if self.size == 0 {
            return 0.0;
        }
        let x = WaveTerrain::wrap(x);
        let y = WaveTerrain::wrap(y);

        let pos_i = (y + 1.0) * 0.5 * self.size as Float;
        let pos_j = (x + 1.0) * 0.5 * self.size as Float;

        let mut i = pos_i as usize; // take floor
        let mut j = pos_j as usize;
        if i > self.size - 1 {
            i = self.size - 1;
        }
        if j > self.size - 1 {
            j = self.size - 1;
        }
        let i_fr = pos_i - i as Float;
        let j_fr = pos_j - j as Float;

        let i1 = (i + 1) % self.size;
        let j1 = (j + 1) % self.size;

        let v00 = self.at(i, j);
        let v10 = self.at(i1, j);
        let v01 = self.at(i, j1);
        let v11 = self.at(i1, j1);

        WaveTerrain::interpolate(v00, v10, v01, v11, i_fr, j_fr)
    }

    /// Get one output sample for the given orbit phase.
    ///
    /// A phase outside [0.0, 1.0) produces silence, the same guard the
    /// one-dimensional tables use.
    pub fn sample(&self, phase: Float) -> Float {
        if phase < 0.0 || phase >= 1.0 {
            return 0.0;
        }
        let x = self.radius * (2.0 * PI * phase).cos() + self.center_x;
        let y = self.radius * (2.0 * PI * phase).sin() + self.center_y;
        self.eval(x, y)
    }

    /// Process one block of frames, one output sample per phase value.
    pub fn process(&self, phase_in: &[Float], out: &mut [Float]) {
        for (sample, phase) in out.iter_mut().zip(phase_in) {
            *sample = self.sample(*phase);
        }
    }

    /// Grid size of the terrain.
    pub fn size(&self) -> usize {
        self.size
    }

    fn at(&self, i: usize, j: usize) -> Float {
        self.table[i * self.size + j]
    }

    // Bilinear interpolation between the four neighboring samples.
    fn interpolate(v00: Float, v10: Float, v01: Float, v11: Float,
                   i_fr: Float, j_fr: Float) -> Float {
        let u0 = (1.0 - i_fr) * v00 + i_fr * v10;
        let u1 = (1.0 - i_fr) * v01 + i_fr * v11;
        (1.0 - j_fr) * u0 + j_fr * u1
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[test]
fn coordinates_wrap_by_whole_periods() {
    let terrain = WaveTerrain::new(64);
    // Dyadic coordinates stay exact under the +-2.0 wrap steps
    for xy in &[(0.25, -0.75), (0.0, 0.0), (-0.5, 0.5)] {
        let base = terrain.eval(xy.0, xy.1);
        assert_eq!(terrain.eval(xy.0 + 2.0, xy.1), base);
        assert_eq!(terrain.eval(xy.0, xy.1 - 2.0), base);
        assert_eq!(terrain.eval(xy.0 + 4.0, xy.1 + 2.0), base);
    }
}

#[test]
fn wrap_handles_the_upper_edge() {
    assert_eq!(WaveTerrain::wrap(1.0), -1.0);
    assert_eq!(WaveTerrain::wrap(-1.0), -1.0);
    assert_eq!(WaveTerrain::wrap(2.5), 0.5);
    assert_eq!(WaveTerrain::wrap(-3.5), 0.5);
}

#[test]
fn grid_points_evaluate_exactly() {
    fn surface(x: Float, y: Float) -> Float {
        x + 10.0 * y
    }
    let terrain = WaveTerrain::with_surface(4, surface);
    // (x, y) = (-1, -1) maps to grid point (0, 0), surface argument (0, 0)
    assert_eq!(terrain.eval(-1.0, -1.0), 0.0);
    // (x, y) = (-0.5, -1) maps to grid point (0, 1), surface argument (0.25, 0)
    assert_eq!(terrain.eval(-0.5, -1.0), 0.25);
    // (x, y) = (-1, -0.5) maps to grid point (1, 0), surface argument (0, 0.25)
    assert_eq!(terrain.eval(-1.0, -0.5), 2.5);
}

#[test]
fn eval_interpolates_bilinearly() {
    fn surface(x: Float, y: Float) -> Float {
        if x < 0.1 && y < 0.1 { 1.0 } else { 0.0 }
    }
    let terrain = WaveTerrain::with_surface(2, surface);
    // Halfway between grid point (0,0) and (0,1): average of 1.0 and 0.0
    let halfway = terrain.eval(-0.5, -1.0);
    assert!((halfway - 0.5).abs() < 0.0001);
    // Center of the cell: average of all four corners
    let center = terrain.eval(-0.5, -0.5);
    assert!((center - 0.25).abs() < 0.0001);
}

#[test]
fn invalid_phase_produces_silence() {
    let terrain = WaveTerrain::new(64);
    assert_eq!(terrain.sample(-0.1), 0.0);
    assert_eq!(terrain.sample(1.0), 0.0);
}

#[test]
fn orbit_follows_parameters() {
    let mut terrain = WaveTerrain::new(64);
    terrain.set_orbit(0.0, 0.3, -0.2);
    // Radius 0 keeps the orbit on its center for every phase
    let center = terrain.eval(0.3, -0.2);
    for phase in &[0.0, 0.25, 0.5, 0.75] {
        assert!((terrain.sample(*phase) - center).abs() < 0.0001);
    }
}

#[test]
fn process_matches_per_sample_lookup() {
    let terrain = WaveTerrain::new(64);
    let phase: Vec<Float> = (0..32).map(|i| i as Float / 32.0).collect();
    let mut out = vec![0.0; 32];
    terrain.process(&phase, &mut out);
    for (i, sample) in out.iter().enumerate() {
        assert_eq!(*sample, terrain.sample(phase[i]));
    }
}
