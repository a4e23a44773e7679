//! A small deterministic filament world.
//!
//! Stands in for the real simulation engine behind [`SimulationReader`]:
//! a fixed population of filaments random-walking inside a box, seeded
//! so every run and every test sees the same trajectories.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spindle_rendering::error::ReportError;
use spindle_rendering::interop::{FilamentInfo, SimulationReader};
use spindle_shared::Vec3;

/// Half-width of the demo box.
const BOX_RADIUS: f32 = 8.0;

/// A seeded random-walk filament world.
pub struct DemoSimulation {
    rng: ChaCha8Rng,
    filaments: Vec<FilamentInfo>,
    time: f64,
    live: bool,
    frame: u64,
    period: u32,
    display_string: Option<String>,
}

impl DemoSimulation {
    /// Creates `count` filaments of `points` points each from `seed`.
    #[must_use]
    pub fn new(seed: u64, count: usize, points: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let filaments = (0..count)
            .map(|_| {
                let base = Vec3::new(
                    rng.gen_range(-BOX_RADIUS..BOX_RADIUS),
                    rng.gen_range(-BOX_RADIUS..BOX_RADIUS),
                    0.0,
                );
                let dir = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 0.0);
                let dir = dir.normalized().unwrap_or(Vec3::X);
                FilamentInfo {
                    points: (0..points.max(2))
                        .map(|p| {
                            #[allow(clippy::cast_precision_loss)]
                            let t = p as f32 * 0.5;
                            base + dir * t
                        })
                        .collect(),
                }
            })
            .collect();
        Self {
            rng,
            filaments,
            time: 0.0,
            live: true,
            frame: 0,
            period: 1,
            display_string: None,
        }
    }

    /// Advances every filament by one diffusion step of `dt` seconds,
    /// keeping points inside the box.
    pub fn step(&mut self, dt: f64) {
        #[allow(clippy::cast_possible_truncation)]
        let amplitude = (dt as f32).sqrt() * 0.5;
        for filament in &mut self.filaments {
            let kick = Vec3::new(
                self.rng.gen_range(-1.0..1.0),
                self.rng.gen_range(-1.0..1.0),
                0.0,
            ) * amplitude;
            for p in &mut filament.points {
                *p += kick;
                p.x = p.x.clamp(-BOX_RADIUS, BOX_RADIUS);
                p.y = p.y.clamp(-BOX_RADIUS, BOX_RADIUS);
            }
        }
        self.time += dt;
        self.frame += 1;
    }

    /// Queues a display string to be picked up on the next frame.
    pub fn set_display_string(&mut self, s: impl Into<String>) {
        self.display_string = Some(s.into());
    }

    /// Switches between live stepping and trajectory playback.
    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }
}

impl SimulationReader for DemoSimulation {
    fn time(&self) -> f64 {
        self.time
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn current_frame(&self) -> u64 {
        self.frame
    }

    fn steps_per_frame(&self) -> u32 {
        self.period
    }

    fn handle_force(&self) -> Option<f32> {
        None
    }

    fn dimensions(&self) -> u32 {
        2
    }

    fn boundary_extents(&self) -> Vec<f32> {
        vec![BOX_RADIUS, BOX_RADIUS]
    }

    fn filaments(&self) -> Vec<FilamentInfo> {
        self.filaments.clone()
    }

    fn links(&self) -> Vec<(Vec3, Vec3)> {
        Vec::new()
    }

    fn periodic_shifts(&self, _tile: u32) -> Vec<Vec3> {
        Vec::new()
    }

    fn report(&self, name: &str, _options: &str) -> Result<String, ReportError> {
        match name {
            "filament" => {
                let mut out = String::new();
                for (i, f) in self.filaments.iter().enumerate() {
                    let first = f.points.first().copied().unwrap_or(Vec3::ZERO);
                    out.push_str(&format!(
                        "{i} points {} origin {:.2} {:.2}\n",
                        f.points.len(),
                        first.x,
                        first.y
                    ));
                }
                Ok(out)
            }
            "time" => Ok(format!("{:.4}\n", self.time)),
            other => Err(ReportError::Unknown(other.to_owned())),
        }
    }

    fn fresh_display_string(&mut self) -> Option<String> {
        self.display_string.take()
    }
}
