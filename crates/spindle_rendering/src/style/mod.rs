//! Display styles: the closed set of drawing strategies.
//!
//! Exactly one style is live at a time, held in the single owning slot
//! of [`StyleManager`]. Switching styles releases the old strategy's
//! context-state reservation before constructing the new one, then
//! re-initializes context state for every open surface.
//!
//! All styles satisfy the same capability contract:
//! prepare / draw / set-pixel-factors / set-stencil.

use tracing::debug;

use crate::backend::{Color, RenderBackend};
use crate::error::RenderError;
use crate::interop::SimulationReader;
use crate::props::{DisplayProps, PropCache};
use crate::surfaces::SurfaceRegistry;

/// The closed enumeration of drawing strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StyleId {
    /// Wireframe filament polylines. The default.
    #[default]
    Line,
    /// Polylines plus end-point markers.
    Flat,
    /// Pseudo-solid tubes with stencil support (3D only).
    Solid,
}

impl StyleId {
    /// Maps a configured style index to a style, falling back to the
    /// default for any unrecognized value.
    #[must_use]
    pub const fn from_index(index: i32) -> Self {
        match index {
            2 => Self::Flat,
            3 => Self::Solid,
            _ => Self::Line,
        }
    }

    /// The configured index of this style.
    #[must_use]
    pub const fn index(self) -> i32 {
        match self {
            Self::Line => 1,
            Self::Flat => 2,
            Self::Solid => 3,
        }
    }
}

/// Pixel-to-unit scale factors handed to the active style each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelFactors {
    /// World size of one pixel, divided by the magnification.
    pub pixel_size: f32,
    /// Multiplier applied to configured point/line sizes.
    pub unit_size: f32,
}

impl Default for PixelFactors {
    fn default() -> Self {
        Self {
            pixel_size: 1.0,
            unit_size: 1.0,
        }
    }
}

/// One concrete drawing strategy.
pub trait DisplayStyle {
    /// Which member of the closed set this is.
    fn id(&self) -> StyleId;

    /// Updates the pixel-to-unit scale factors for this frame.
    fn set_pixel_factors(&mut self, factors: PixelFactors);

    /// Enables or disables stencil-buffer use for this frame.
    fn set_stencil(&mut self, on: bool);

    /// Full scene-preparation step: derives the per-frame draw
    /// parameters into `cache`.
    ///
    /// # Errors
    ///
    /// [`RenderError::Prepare`] on invalid derived state; the caller
    /// logs it and keeps the previous cache.
    fn prepare(
        &mut self,
        sim: &dyn SimulationReader,
        props: &DisplayProps,
        cache: &mut PropCache,
    ) -> Result<(), RenderError>;

    /// Draws the snapshot into the backend.
    ///
    /// # Errors
    ///
    /// [`RenderError::Draw`] on a failed pass; the caller logs it and
    /// accepts the partial frame.
    fn draw(
        &self,
        sim: &dyn SimulationReader,
        cache: &PropCache,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), RenderError>;
}

/// Common per-style state: the three concrete styles differ only in
/// their draw pass and palette.
#[derive(Clone, Copy, Debug, Default)]
struct StyleState {
    factors: PixelFactors,
    stencil: bool,
}

fn derive_cache(
    state: &StyleState,
    props: &DisplayProps,
    palette: &[Color],
    cache: &mut PropCache,
) -> Result<(), RenderError> {
    let line_width = props.line_width * state.factors.unit_size;
    let point_size = props.point_size * state.factors.unit_size;
    if !line_width.is_finite() || !point_size.is_finite() {
        return Err(RenderError::Prepare(format!(
            "non-finite stroke sizes (unit factor {})",
            state.factors.unit_size
        )));
    }
    cache.line_width = line_width;
    cache.point_size = point_size;
    cache.palette = palette.to_vec();
    Ok(())
}

/// Style 1: filaments as plain polylines.
#[derive(Default)]
struct LineStyle {
    state: StyleState,
}

const LINE_PALETTE: [Color; 3] = [
    [1.0, 1.0, 1.0, 1.0],
    [0.4, 0.8, 1.0, 1.0],
    [1.0, 0.8, 0.3, 1.0],
];

impl DisplayStyle for LineStyle {
    fn id(&self) -> StyleId {
        StyleId::Line
    }

    fn set_pixel_factors(&mut self, factors: PixelFactors) {
        self.state.factors = factors;
    }

    fn set_stencil(&mut self, on: bool) {
        self.state.stencil = on;
    }

    fn prepare(
        &mut self,
        _sim: &dyn SimulationReader,
        props: &DisplayProps,
        cache: &mut PropCache,
    ) -> Result<(), RenderError> {
        derive_cache(&self.state, props, &LINE_PALETTE, cache)
    }

    fn draw(
        &self,
        sim: &dyn SimulationReader,
        cache: &PropCache,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), RenderError> {
        backend.set_line_width(cache.line_width);
        for (i, filament) in sim.filaments().iter().enumerate() {
            let segments: Vec<_> = filament.segments().collect();
            backend.draw_lines(&segments, cache.color(i));
        }
        Ok(())
    }
}

/// Style 2: polylines plus end-point markers.
#[derive(Default)]
struct FlatStyle {
    state: StyleState,
}

const FLAT_PALETTE: [Color; 3] = [
    [0.9, 0.9, 0.9, 1.0],
    [0.3, 1.0, 0.5, 1.0],
    [1.0, 0.4, 0.4, 1.0],
];

impl DisplayStyle for FlatStyle {
    fn id(&self) -> StyleId {
        StyleId::Flat
    }

    fn set_pixel_factors(&mut self, factors: PixelFactors) {
        self.state.factors = factors;
    }

    fn set_stencil(&mut self, on: bool) {
        self.state.stencil = on;
    }

    fn prepare(
        &mut self,
        _sim: &dyn SimulationReader,
        props: &DisplayProps,
        cache: &mut PropCache,
    ) -> Result<(), RenderError> {
        derive_cache(&self.state, props, &FLAT_PALETTE, cache)
    }

    fn draw(
        &self,
        sim: &dyn SimulationReader,
        cache: &PropCache,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), RenderError> {
        backend.set_line_width(cache.line_width);
        backend.set_point_size(cache.point_size);
        for (i, filament) in sim.filaments().iter().enumerate() {
            let color = cache.color(i);
            let segments: Vec<_> = filament.segments().collect();
            backend.draw_lines(&segments, color);
            // mark both filament ends
            let mut ends = Vec::with_capacity(2);
            if let Some(&first) = filament.points.first() {
                ends.push(first);
            }
            if let Some(&last) = filament.points.last() {
                if filament.points.len() > 1 {
                    ends.push(last);
                }
            }
            backend.draw_points(&ends, color);
        }
        Ok(())
    }
}

/// Style 3: pseudo-solid tubes, stencil-assisted in 3D.
#[derive(Default)]
struct SolidStyle {
    state: StyleState,
}

const SOLID_PALETTE: [Color; 3] = [
    [0.8, 0.8, 0.85, 1.0],
    [0.35, 0.6, 0.95, 1.0],
    [0.95, 0.7, 0.25, 1.0],
];

impl DisplayStyle for SolidStyle {
    fn id(&self) -> StyleId {
        StyleId::Solid
    }

    fn set_pixel_factors(&mut self, factors: PixelFactors) {
        self.state.factors = factors;
    }

    fn set_stencil(&mut self, on: bool) {
        self.state.stencil = on;
    }

    fn prepare(
        &mut self,
        _sim: &dyn SimulationReader,
        props: &DisplayProps,
        cache: &mut PropCache,
    ) -> Result<(), RenderError> {
        derive_cache(&self.state, props, &SOLID_PALETTE, cache)
    }

    fn draw(
        &self,
        sim: &dyn SimulationReader,
        cache: &PropCache,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), RenderError> {
        backend.set_stencil(self.state.stencil);
        backend.set_point_size(cache.point_size);
        for (i, filament) in sim.filaments().iter().enumerate() {
            let color = cache.color(i);
            let segments: Vec<_> = filament.segments().collect();
            // dark halo pass, then the body on top
            backend.set_line_width(cache.line_width * 2.0);
            backend.draw_lines(
                &segments,
                [color[0] * 0.25, color[1] * 0.25, color[2] * 0.25, color[3]],
            );
            backend.set_line_width(cache.line_width);
            backend.draw_lines(&segments, color);
            backend.draw_points(&filament.points, color);
        }
        backend.set_stencil(false);
        Ok(())
    }
}

fn make_style(id: StyleId) -> Box<dyn DisplayStyle> {
    match id {
        StyleId::Line => Box::new(LineStyle::default()),
        StyleId::Flat => Box::new(FlatStyle::default()),
        StyleId::Solid => Box::new(SolidStyle::default()),
    }
}

/// The single owning slot for the active drawing strategy.
pub struct StyleManager {
    active: Box<dyn DisplayStyle>,
    /// Whether a context-state reservation (pushed attribs) is held.
    reserved: bool,
}

impl StyleManager {
    /// Creates a manager holding the default style. No context state is
    /// touched until the first [`StyleManager::set_style`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: make_style(StyleId::default()),
            reserved: false,
        }
    }

    /// The active strategy.
    #[must_use]
    pub fn active(&self) -> &dyn DisplayStyle {
        self.active.as_ref()
    }

    /// The active strategy, mutably.
    pub fn active_mut(&mut self) -> &mut dyn DisplayStyle {
        self.active.as_mut()
    }

    /// Selects a drawing strategy by configured index.
    ///
    /// Releases the previous strategy's context-state reservation,
    /// installs the new strategy, and re-initializes context state and
    /// viewport for every open surface, skipping surfaces without a
    /// live context. Safe to call at any time; an unrecognized index
    /// silently selects the default style.
    pub fn set_style(
        &mut self,
        index: i32,
        backend: &mut dyn RenderBackend,
        surfaces: &mut SurfaceRegistry,
    ) {
        let id = StyleId::from_index(index);
        debug!(index, ?id, "switching display style");

        // restore the context state the previous strategy reserved
        if self.reserved {
            backend.pop_attribs();
        }
        backend.push_attribs();
        self.reserved = true;
        self.active = make_style(id);

        for surface in surfaces.iter_mut() {
            if !surface.has_context() {
                continue;
            }
            surface.init_context(backend);
            let (w, h) = surface.dimensions();
            backend.set_viewport(0, 0, w, h);
        }
    }
}

impl Default for StyleManager {
    fn default() -> Self {
        Self::new()
    }
}
