//! Image export: window-resolution snapshots and magnified captures.
//!
//! The magnified path is the one place the simulation gate is held
//! across an entire multi-pass render, so every tile of a composite
//! image shows the same simulation state:
//!
//! ```text
//!   format supported?   no -> error, gate untouched
//!          | yes
//!   lock simulation gate
//!   prepare scene at magnification
//!   direct magnified capture ----- unsupported ----+
//!          | ok                                    |
//!          |                         composite: draw mag^2 tiles,
//!          |                         assemble into one pixmap
//!          +------------------+------+
//!                             |
//!                      encode + write file
//!                      release gate
//! ```

pub mod tiles;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::backend::{Pixmap, RenderBackend};
use crate::compose::SceneComposer;
use crate::error::{EncoderError, ExportError};
use crate::interop::{SimGate, SimulationReader};
use crate::props::PlayProps;
use crate::surfaces::RedrawScheduler;
use crate::view::View;
use self::tiles::TileGrid;

/// Writes pixmaps to disk in some image format.
pub trait ImageEncoder {
    /// Whether this encoder implements `format`. Cheap; callable before
    /// any rendering work.
    fn supports(&self, format: &str) -> bool;

    /// Encodes `image`, downsampled by `downsample`, into `name`.
    ///
    /// # Errors
    ///
    /// [`EncoderError::UnsupportedFormat`] or [`EncoderError::Io`].
    fn write(
        &self,
        name: &str,
        format: &str,
        image: &Pixmap,
        downsample: u32,
    ) -> Result<(), EncoderError>;
}

/// Outcome of a successful export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedImage {
    /// File name the image was written under.
    pub name: String,
    /// Width of the written image in pixels.
    pub width: u32,
    /// Height of the written image in pixels.
    pub height: u32,
}

/// Scoped working-directory change, restored on drop.
///
/// An empty target is a no-op. Restoration failure is logged, never
/// propagated; by then the file is already written.
struct DirGuard {
    previous: Option<PathBuf>,
}

impl DirGuard {
    fn enter(dir: &str) -> Self {
        if dir.is_empty() {
            return Self { previous: None };
        }
        match std::env::current_dir() {
            Ok(previous) => {
                if let Err(err) = std::env::set_current_dir(Path::new(dir)) {
                    warn!(%err, dir, "could not enter image directory");
                    Self { previous: None }
                } else {
                    Self {
                        previous: Some(previous),
                    }
                }
            }
            Err(err) => {
                warn!(%err, "could not record working directory");
                Self { previous: None }
            }
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(err) = std::env::set_current_dir(&previous) {
                warn!(%err, "could not restore working directory");
            }
        }
    }
}

/// Builds the `{root}{index:04}.{format}` file name shared by all
/// indexed exports.
#[must_use]
pub fn image_name(root: &str, index: u32, format: &str) -> String {
    format!("{root}{index:04}.{format}")
}

/// The image-export engine: snapshots and magnified captures.
pub struct Exporter<E> {
    encoder: E,
    redraw: RedrawScheduler,
}

impl<E: ImageEncoder> Exporter<E> {
    /// Creates an exporter around an encoder. `redraw` is poked after
    /// indexed exports so the screen repaints at normal resolution.
    pub fn new(encoder: E, redraw: RedrawScheduler) -> Self {
        Self { encoder, redraw }
    }

    /// The wrapped encoder.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Saves the current back buffer under an indexed name, inside the
    /// configured image directory.
    ///
    /// # Errors
    ///
    /// [`ExportError::UnsupportedFormat`] before any file activity, or
    /// [`ExportError::Encoder`] from the write.
    pub fn save_view(
        &self,
        play: &PlayProps,
        backend: &mut dyn RenderBackend,
        root: &str,
        index: u32,
    ) -> Result<SavedImage, ExportError> {
        if !self.encoder.supports(&play.image_format) {
            return Err(ExportError::UnsupportedFormat(play.image_format.clone()));
        }
        let name = image_name(root, index, &play.image_format);
        let (_, _, w, h) = backend.viewport();
        let image = backend.read_pixels(0, 0, w, h);

        let _dir = DirGuard::enter(&play.image_dir);
        self.encoder
            .write(&name, &play.image_format, &image, play.downsample)?;

        let factor = play.downsample.max(1);
        let saved = SavedImage {
            name,
            width: w / factor,
            height: h / factor,
        };
        info!(name = %saved.name, width = saved.width, height = saved.height, "saved image");
        Ok(saved)
    }

    /// Renders and saves a `mag`-times magnified capture under `name`.
    ///
    /// The simulation gate is held from before scene preparation until
    /// the file is written, so every pass sees one state. The direct
    /// capture is attempted first; a backend refusal falls back to the
    /// composite assembly of window-sized tiles.
    ///
    /// # Errors
    ///
    /// [`ExportError::UnsupportedFormat`] before the gate is touched,
    /// [`ExportError::Composite`] when the fallback fails too, or
    /// [`ExportError::Encoder`] from the write.
    #[allow(clippy::too_many_arguments)]
    pub fn save_view_magnified<S: SimulationReader>(
        &self,
        gate: &SimGate<S>,
        composer: &mut SceneComposer,
        view: &mut View,
        backend: &mut dyn RenderBackend,
        mag: u32,
        name: &str,
        format: &str,
        downsample: u32,
    ) -> Result<SavedImage, ExportError> {
        if !self.encoder.supports(format) {
            return Err(ExportError::UnsupportedFormat(format.to_owned()));
        }
        let mag = mag.max(1);

        let sim = gate.lock();
        composer.prepare_display(&*sim, view, mag);
        view.apply(backend);

        let (w, h) = (view.width(), view.height());
        let mut draw = |b: &mut dyn RenderBackend| {
            b.clear([0.0, 0.0, 0.0, 1.0]);
            composer.draw_scene(&*sim, view, b);
        };

        let image = match backend.capture_magnified(mag, w, h, &mut draw) {
            Ok(image) => image,
            Err(err) => {
                info!(mag, %err, "direct capture failed, assembling composite");
                #[allow(clippy::cast_precision_loss)]
                let pixel_size = view.pixel_size() / mag as f32;
                composite_capture(backend, mag, w, h, pixel_size, &mut draw)?
            }
        };

        self.encoder.write(name, format, &image, downsample)?;
        let factor = downsample.max(1);
        let saved = SavedImage {
            name: name.to_owned(),
            width: image.width() / factor,
            height: image.height() / factor,
        };
        info!(name = %saved.name, width = saved.width, height = saved.height, mag, "saved magnified image");
        Ok(saved)
    }

    /// Indexed variant of [`Exporter::save_view_magnified`]: builds the
    /// standard file name, enters the image directory, and schedules a
    /// redraw so the screen repaints at normal resolution afterwards.
    ///
    /// # Errors
    ///
    /// As [`Exporter::save_view_magnified`].
    #[allow(clippy::too_many_arguments)]
    pub fn save_view_magnified_indexed<S: SimulationReader>(
        &self,
        gate: &SimGate<S>,
        composer: &mut SceneComposer,
        view: &mut View,
        backend: &mut dyn RenderBackend,
        mag: u32,
        root: &str,
        index: u32,
    ) -> Result<SavedImage, ExportError> {
        let play = composer.play().clone();
        if !self.encoder.supports(&play.image_format) {
            return Err(ExportError::UnsupportedFormat(play.image_format));
        }
        let name = image_name(root, index, &play.image_format);

        let _dir = DirGuard::enter(&play.image_dir);
        let saved = self.save_view_magnified(
            gate,
            composer,
            view,
            backend,
            mag,
            &name,
            &play.image_format,
            play.downsample,
        );
        self.redraw.schedule();
        saved
    }
}

/// Assembles a `mag`-times image from `mag`-squared window-sized tiles,
/// each drawn through a shifted oversized viewport.
fn composite_capture(
    backend: &mut dyn RenderBackend,
    mag: u32,
    width: u32,
    height: u32,
    pixel_size: f32,
    draw: &mut dyn FnMut(&mut dyn RenderBackend),
) -> Result<Pixmap, ExportError> {
    if width == 0 || height == 0 {
        return Err(ExportError::Composite("empty viewport".to_owned()));
    }
    let saved_viewport = backend.viewport();
    let mut out = Pixmap::new(mag * width, mag * height);

    for tile in TileGrid::new(mag, width, height, pixel_size) {
        let (x, y, w, h) = tile.viewport();
        backend.set_viewport(x, y, w, h);
        draw(backend);
        let piece = backend.read_pixels(0, 0, width, height);
        let (dx, dy) = tile.dst();
        out.blit(&piece, dx, dy);
    }

    let (x, y, w, h) = saved_viewport;
    backend.set_viewport(x, y, w, h);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_name_format() {
        assert_eq!(image_name("image", 7, "png"), "image0007.png");
        assert_eq!(image_name("run", 7, "png"), "run0007.png");
        assert_eq!(image_name("run", 1234, "ppm"), "run1234.ppm");
        assert_eq!(image_name("x", 99_999, "png"), "x99999.png");
    }

    #[test]
    fn test_dir_guard_empty_is_noop() {
        let before = std::env::current_dir().expect("cwd");
        {
            let _guard = DirGuard::enter("");
            assert_eq!(std::env::current_dir().expect("cwd"), before);
        }
        assert_eq!(std::env::current_dir().expect("cwd"), before);
    }
}
