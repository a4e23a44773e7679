//! Interop with the simulation engine.
//!
//! This is the ONLY way the rendering and export code sees simulation
//! state. The engine itself (objects, forces, integration) lives behind
//! [`SimulationReader`]; the renderer holds a non-owning reference and
//! never mutates entity state through it.

mod gate;

pub use gate::{SimGate, SimGuard};

use spindle_shared::Vec3;

use crate::error::ReportError;

/// Point data for one trackable filament-like entity.
///
/// Centroid, nematic and second-moment queries are all computed from
/// these points by the auto-framing code.
#[derive(Clone, Debug, Default)]
pub struct FilamentInfo {
    /// Model points along the filament, in order.
    pub points: Vec<Vec3>,
}

impl FilamentInfo {
    /// Consecutive point pairs as segments.
    pub fn segments(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }
}

/// Read access to a consistent simulation snapshot.
///
/// Between acquiring and releasing the [`SimGate`], the state behind
/// this trait is stable. The live display path reads without the gate
/// and accepts staleness instead.
pub trait SimulationReader {
    /// Elapsed simulated time in seconds.
    fn time(&self) -> f64;

    /// True while the simulation is advancing on its own thread.
    fn is_live(&self) -> bool;

    /// Index of the currently displayed trajectory frame.
    fn current_frame(&self) -> u64;

    /// Simulation steps taken per displayed frame while live.
    fn steps_per_frame(&self) -> u32;

    /// Interaction force magnitude of the mouse-controlled handle, if
    /// one is attached and engaged.
    fn handle_force(&self) -> Option<f32>;

    /// Spatial dimensionality of the simulated system (2 or 3).
    fn dimensions(&self) -> u32;

    /// Maximum extension of every spatial boundary entity.
    fn boundary_extents(&self) -> Vec<f32>;

    /// All trackable filament-like entities.
    fn filaments(&self) -> Vec<FilamentInfo>;

    /// Inter-entity constraint links, for the debug overlay.
    fn links(&self) -> Vec<(Vec3, Vec3)>;

    /// Image shifts for periodic tiled drawing with the given tiling
    /// radius. Empty when the system is not periodic.
    fn periodic_shifts(&self, tile: u32) -> Vec<Vec3>;

    /// Computes the named textual report.
    ///
    /// # Errors
    ///
    /// [`ReportError`] with a descriptive message; the composer shows
    /// the message instead of the report.
    fn report(&self, name: &str, options: &str) -> Result<String, ReportError>;

    /// Returns the display-configuration string if it changed since the
    /// last call, clearing the dirty flag.
    fn fresh_display_string(&mut self) -> Option<String>;
}

/// A canned [`SimulationReader`] for tests.
///
/// Every answer is a plain field, so tests state exactly the snapshot
/// they need instead of scripting a trait object.
#[derive(Clone, Debug)]
pub struct MockSimulation {
    /// Elapsed time returned by `time()`.
    pub time: f64,
    /// Live flag.
    pub live: bool,
    /// Displayed frame index.
    pub frame: u64,
    /// Steps per displayed frame.
    pub period: u32,
    /// Engaged-handle force, if any.
    pub handle_force: Option<f32>,
    /// Dimensionality.
    pub dim: u32,
    /// Boundary extents.
    pub extents: Vec<f32>,
    /// Trackable filaments.
    pub filaments: Vec<FilamentInfo>,
    /// Constraint links.
    pub links: Vec<(Vec3, Vec3)>,
    /// Period vector for periodic tiling, if periodic.
    pub period_vector: Option<Vec3>,
    /// Pending display string; taken once by `fresh_display_string`.
    pub display_string: Option<String>,
    /// Reports served by name; unknown names fail.
    pub reports: Vec<(String, String)>,
}

impl Default for MockSimulation {
    fn default() -> Self {
        Self {
            time: 0.0,
            live: true,
            frame: 0,
            period: 1,
            handle_force: None,
            dim: 3,
            extents: Vec::new(),
            filaments: Vec::new(),
            links: Vec::new(),
            period_vector: None,
            display_string: None,
            reports: Vec::new(),
        }
    }
}

impl SimulationReader for MockSimulation {
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
        self.handle_force
    }

    fn dimensions(&self) -> u32 {
        self.dim
    }

    fn boundary_extents(&self) -> Vec<f32> {
        self.extents.clone()
    }

    fn filaments(&self) -> Vec<FilamentInfo> {
        self.filaments.clone()
    }

    fn links(&self) -> Vec<(Vec3, Vec3)> {
        self.links.clone()
    }

    fn periodic_shifts(&self, tile: u32) -> Vec<Vec3> {
        let Some(p) = self.period_vector else {
            return Vec::new();
        };
        let tile = i64::from(tile);
        (-tile..=tile)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let f = i as f32;
                p * f
            })
            .collect()
    }

    fn report(&self, name: &str, _options: &str) -> Result<String, ReportError> {
        self.reports
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, text)| text.clone())
            .ok_or_else(|| ReportError::Unknown(name.to_owned()))
    }

    fn fresh_display_string(&mut self) -> Option<String> {
        self.display_string.take()
    }
}
