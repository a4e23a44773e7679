//! The player: display loop and export entry points.
//!
//! Owns one view, one backend, one composer and the export engine, and
//! shares the simulation with the stepping thread through a [`SimGate`].
//! Live frames use `try_lock` and skip on contention; exports take the
//! blocking lock inside the export engine.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::{debug, info};

use spindle_rendering::compose::SceneComposer;
use spindle_rendering::error::ExportError;
use spindle_rendering::export::{Exporter, ImageEncoder, SavedImage};
use spindle_rendering::interop::{SimGate, SimulationReader};
use spindle_rendering::props::PlayProps;
use spindle_rendering::surfaces::{RedrawRequest, RedrawScheduler, SurfaceRegistry};
use spindle_rendering::view::View;
use spindle_rendering::RenderBackend;

/// Default file-name root for indexed exports.
pub const IMAGE_ROOT: &str = "image";

/// The assembled player.
pub struct Player<S, B, E> {
    gate: Arc<SimGate<S>>,
    composer: SceneComposer,
    view: View,
    backend: B,
    exporter: Exporter<E>,
    surfaces: SurfaceRegistry,
    redraw_rx: Receiver<RedrawRequest>,
    image_index: u32,
}

impl<S, B, E> Player<S, B, E>
where
    S: SimulationReader,
    B: RenderBackend,
    E: ImageEncoder,
{
    /// Assembles a player around a gated simulation.
    pub fn new(gate: Arc<SimGate<S>>, backend: B, encoder: E, play: PlayProps) -> Self {
        let (scheduler, redraw_rx) = RedrawScheduler::channel();
        let view = View::new(800, 600);
        Self {
            gate,
            composer: SceneComposer::new(play),
            view,
            backend,
            exporter: Exporter::new(encoder, scheduler),
            surfaces: SurfaceRegistry::new(),
            redraw_rx,
            image_index: 0,
        }
    }

    /// The shared simulation gate.
    #[must_use]
    pub fn gate(&self) -> &Arc<SimGate<S>> {
        &self.gate
    }

    /// The camera state.
    #[must_use]
    pub const fn view(&self) -> &View {
        &self.view
    }

    /// The camera state, mutably.
    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    /// The surface registry.
    pub fn surfaces_mut(&mut self) -> &mut SurfaceRegistry {
        &mut self.surfaces
    }

    /// Selects a display style by index.
    pub fn set_style(&mut self, index: i32) {
        self.composer
            .set_style(index, &mut self.backend, &mut self.surfaces);
    }

    /// Draws one live frame.
    ///
    /// Returns `false` without drawing when the simulation is mid-step;
    /// the previous frame simply stays on screen.
    pub fn display(&mut self) -> bool {
        let Some(mut sim) = self.gate.try_lock() else {
            debug!("simulation busy, skipping frame");
            return false;
        };
        self.composer.display_scene(
            &mut *sim,
            &mut self.view,
            &mut self.backend,
            &mut self.surfaces,
            1,
        );
        true
    }

    /// True if an export requested a repaint since the last check.
    pub fn take_redraw_request(&mut self) -> bool {
        let mut requested = false;
        while self.redraw_rx.try_recv().is_ok() {
            requested = true;
        }
        requested
    }

    /// Saves the current back buffer under the next indexed name.
    ///
    /// # Errors
    ///
    /// Propagates [`ExportError`] from the export engine.
    pub fn save_view(&mut self) -> Result<SavedImage, ExportError> {
        let saved = self.exporter.save_view(
            self.composer.play(),
            &mut self.backend,
            IMAGE_ROOT,
            self.image_index,
        )?;
        self.image_index += 1;
        Ok(saved)
    }

    /// Renders and saves a magnified capture under the next indexed
    /// name, then schedules a repaint at normal resolution.
    ///
    /// # Errors
    ///
    /// Propagates [`ExportError`] from the export engine.
    pub fn save_view_magnified(&mut self, mag: u32) -> Result<SavedImage, ExportError> {
        let saved = self.exporter.save_view_magnified_indexed(
            &self.gate,
            &mut self.composer,
            &mut self.view,
            &mut self.backend,
            mag,
            IMAGE_ROOT,
            self.image_index,
        )?;
        self.image_index += 1;
        Ok(saved)
    }
}

/// Spawns the simulation stepping thread.
///
/// The thread takes the gate between batches of `steps_per_frame`
/// steps, so live display and exports interleave with stepping at
/// frame granularity. It exits when `frames` batches are done.
pub fn spawn_simulation<S, F>(
    gate: Arc<SimGate<S>>,
    frames: u32,
    steps_per_frame: u32,
    dt: f64,
    mut step: F,
) -> thread::JoinHandle<()>
where
    S: SimulationReader + Send + 'static,
    F: FnMut(&mut S, f64) + Send + 'static,
{
    thread::spawn(move || {
        for _ in 0..frames {
            {
                let mut sim = gate.lock();
                for _ in 0..steps_per_frame {
                    step(&mut sim, dt);
                }
            }
            // let a pending display or export slip in
            thread::sleep(Duration::from_micros(200));
        }
        info!(frames, "simulation thread done");
    })
}
