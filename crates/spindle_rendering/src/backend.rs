//! The graphics context as a narrow interface.
//!
//! The player never talks to a GPU API directly: everything goes through
//! [`RenderBackend`]. The trait covers exactly what the display styles,
//! the composer and the export engine need: attribute state, primitive
//! emission, pixel readback, and an optional one-shot magnified capture
//! that the backend may refuse (which triggers the tiled fallback).
//!
//! [`SoftwareBackend`] is a minimal CPU rasterizer implementing the full
//! contract. It backs the headless snapshot tool and every test in the
//! workspace.

use spindle_shared::{Quaternion, Vec3};

use crate::error::CaptureError;

/// RGBA color, components in `[0, 1]`.
pub type Color = [f32; 4];

/// A CPU-side RGBA8 pixel buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Pixmap {
    /// Allocates a black, opaque pixmap.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let mut rgba = vec![0_u8; (width as usize) * (height as usize) * 4];
        for px in rgba.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self { width, height, rgba }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major from the top-left corner.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.rgba
    }

    /// Reads one pixel; out-of-bounds coordinates return opaque black.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 255];
        }
        let i = ((y * self.width + x) as usize) * 4;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }

    /// Writes one pixel, ignoring out-of-bounds coordinates.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = ((y * self.width + x) as usize) * 4;
        self.rgba[i..i + 4].copy_from_slice(&px);
    }

    /// Copies `src` into this pixmap with its top-left corner at
    /// `(dst_x, dst_y)`, clipping at the borders.
    pub fn blit(&mut self, src: &Self, dst_x: u32, dst_y: u32) {
        for y in 0..src.height {
            for x in 0..src.width {
                self.set_pixel(dst_x + x, dst_y + y, src.pixel(x, y));
            }
        }
    }

    /// Copies a rectangular region out of this pixmap, clipping at the
    /// borders (clipped pixels come out opaque black).
    #[must_use]
    pub fn region(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let mut out = Self::new(width, height);
        for oy in 0..height {
            for ox in 0..width {
                out.set_pixel(ox, oy, self.pixel(x + ox, y + oy));
            }
        }
        out
    }

    /// Box-downsamples by an integer factor. A factor of 0 or 1 returns
    /// an unmodified copy.
    #[must_use]
    pub fn downsampled(&self, factor: u32) -> Self {
        if factor <= 1 {
            return self.clone();
        }
        let w = (self.width / factor).max(1);
        let h = (self.height / factor).max(1);
        let mut out = Self::new(w, h);
        for oy in 0..h {
            for ox in 0..w {
                let mut acc = [0_u32; 4];
                for sy in 0..factor {
                    for sx in 0..factor {
                        let px = self.pixel(ox * factor + sx, oy * factor + sy);
                        for (a, p) in acc.iter_mut().zip(px) {
                            *a += u32::from(p);
                        }
                    }
                }
                let n = factor * factor;
                #[allow(clippy::cast_possible_truncation)]
                out.set_pixel(ox, oy, [
                    (acc[0] / n) as u8,
                    (acc[1] / n) as u8,
                    (acc[2] / n) as u8,
                    (acc[3] / n) as u8,
                ]);
            }
        }
        out
    }
}

/// The graphics-context contract consumed by styles, composer and export.
///
/// A backend owns a back buffer the size of the current window. All draw
/// calls write into it; [`RenderBackend::read_pixels`] reads it back.
pub trait RenderBackend {
    /// Fills the back buffer with `color`.
    fn clear(&mut self, color: Color);

    /// Sets the viewport. Negative origins and oversized extents are the
    /// mechanism behind tiled capture: only the part of the viewport that
    /// overlaps the back buffer produces pixels.
    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Current viewport as `(x, y, width, height)`.
    fn viewport(&self) -> (i32, i32, u32, u32);

    /// Sets the world-to-screen projection: `focus` maps to the viewport
    /// center, the conjugate of `rotation` orients the axes, and
    /// `view_size / zoom` world units span the smaller viewport side.
    fn set_projection(&mut self, focus: Vec3, rotation: Quaternion, view_size: f32, zoom: f32);

    /// Saves the current attribute state (widths, stipple, blend, stencil).
    fn push_attribs(&mut self);

    /// Restores the most recently saved attribute state.
    fn pop_attribs(&mut self);

    /// Line width in pixels for subsequent `draw_lines` calls.
    fn set_line_width(&mut self, width: f32);

    /// Point size in pixels for subsequent `draw_points` calls.
    fn set_point_size(&mut self, size: f32);

    /// Toggles dashed (stippled) line rasterization.
    fn set_stipple(&mut self, on: bool);

    /// Toggles color blending.
    fn set_blend(&mut self, on: bool);

    /// Toggles use of the stencil buffer.
    fn set_stencil(&mut self, on: bool);

    /// Draws world-space line segments.
    fn draw_lines(&mut self, segments: &[(Vec3, Vec3)], color: Color);

    /// Draws world-space points.
    fn draw_points(&mut self, points: &[Vec3], color: Color);

    /// Reads a rectangle of the back buffer.
    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32) -> Pixmap;

    /// Renders at `mag` times the `width` x `height` window resolution
    /// into a single buffer, invoking `draw` as many times as needed to
    /// fill it in backend-sized chunks.
    ///
    /// # Errors
    ///
    /// [`CaptureError::Unsupported`] when the requested buffer exceeds
    /// the backend's capability; the caller falls back to composite
    /// (tiled) capture.
    fn capture_magnified(
        &mut self,
        mag: u32,
        width: u32,
        height: u32,
        draw: &mut dyn FnMut(&mut dyn RenderBackend),
    ) -> Result<Pixmap, CaptureError>;
}

/// Attribute state saved/restored by `push_attribs` / `pop_attribs`.
#[derive(Clone, Copy, Debug)]
struct Attribs {
    line_width: f32,
    point_size: f32,
    stipple: bool,
    blend: bool,
    stencil: bool,
}

impl Default for Attribs {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            point_size: 1.0,
            stipple: false,
            blend: false,
            stencil: false,
        }
    }
}

/// World-to-screen projection parameters.
#[derive(Clone, Copy, Debug)]
struct Projection {
    focus: Vec3,
    rotation: Quaternion,
    view_size: f32,
    zoom: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            focus: Vec3::ZERO,
            rotation: Quaternion::IDENTITY,
            view_size: 10.0,
            zoom: 1.0,
        }
    }
}

/// A CPU rasterizer implementing the full backend contract.
///
/// Lines are drawn with a DDA walk, points as filled squares. Blending
/// is a 50/50 mix; stipple drops alternating 4-pixel runs. Good enough
/// for headless snapshots and for verifying capture geometry exactly.
pub struct SoftwareBackend {
    frame: Pixmap,
    viewport: (i32, i32, u32, u32),
    proj: Projection,
    attribs: Attribs,
    stack: Vec<Attribs>,
    /// Largest buffer dimension `capture_magnified` will allocate.
    max_capture_dim: u32,
}

impl SoftwareBackend {
    /// Creates a backend with a `width` x `height` back buffer.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: Pixmap::new(width, height),
            viewport: (0, 0, width, height),
            proj: Projection::default(),
            attribs: Attribs::default(),
            stack: Vec::new(),
            max_capture_dim: 16_384,
        }
    }

    /// Restricts the magnified-capture capability, forcing the composite
    /// fallback for requests above `limit` pixels per dimension.
    #[must_use]
    pub fn with_capture_limit(mut self, limit: u32) -> Self {
        self.max_capture_dim = limit;
        self
    }

    /// Depth of the saved-attribute stack. Diagnostic: a balanced
    /// render path leaves this where it found it.
    #[must_use]
    pub fn attrib_depth(&self) -> usize {
        self.stack.len()
    }

    /// Projects a world point to back-buffer pixel coordinates.
    fn project(&self, p: Vec3) -> (f32, f32) {
        let (vx, vy, vw, vh) = self.viewport;
        #[allow(clippy::cast_precision_loss)]
        let (vwf, vhf) = (vw as f32, vh as f32);
        let q = self.proj.rotation.conjugate().rotate(p - self.proj.focus);
        let side = vwf.min(vhf).max(1.0);
        let ppu = self.proj.zoom * side / self.proj.view_size;
        #[allow(clippy::cast_precision_loss)]
        let (vxf, vyf) = (vx as f32, vy as f32);
        (
            vxf + vwf * 0.5 + q.x * ppu,
            vyf + vhf * 0.5 - q.y * ppu,
        )
    }

    fn put(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 {
            return;
        }
        #[allow(clippy::cast_sign_loss)]
        let (ux, uy) = (x as u32, y as u32);
        if ux >= self.frame.width() || uy >= self.frame.height() {
            return;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut px = [
            (color[0].clamp(0.0, 1.0) * 255.0) as u8,
            (color[1].clamp(0.0, 1.0) * 255.0) as u8,
            (color[2].clamp(0.0, 1.0) * 255.0) as u8,
            (color[3].clamp(0.0, 1.0) * 255.0) as u8,
        ];
        if self.attribs.blend {
            let old = self.frame.pixel(ux, uy);
            for (n, o) in px.iter_mut().zip(old) {
                *n = ((u16::from(*n) + u16::from(o)) / 2) as u8;
            }
        }
        self.frame.set_pixel(ux, uy, px);
    }

    /// Stamps a square of the current line width centered on (x, y).
    fn stamp(&mut self, x: f32, y: f32, size: f32, color: Color) {
        let r = (size * 0.5).max(0.5);
        #[allow(clippy::cast_possible_truncation)]
        let (x0, x1) = ((x - r).floor() as i32, (x + r).ceil() as i32);
        #[allow(clippy::cast_possible_truncation)]
        let (y0, y1) = ((y - r).floor() as i32, (y + r).ceil() as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.put(px, py, color);
            }
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn clear(&mut self, color: Color) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let px = [
            (color[0].clamp(0.0, 1.0) * 255.0) as u8,
            (color[1].clamp(0.0, 1.0) * 255.0) as u8,
            (color[2].clamp(0.0, 1.0) * 255.0) as u8,
            (color[3].clamp(0.0, 1.0) * 255.0) as u8,
        ];
        let (w, h) = (self.frame.width(), self.frame.height());
        for y in 0..h {
            for x in 0..w {
                self.frame.set_pixel(x, y, px);
            }
        }
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = (x, y, width, height);
    }

    fn viewport(&self) -> (i32, i32, u32, u32) {
        self.viewport
    }

    fn set_projection(&mut self, focus: Vec3, rotation: Quaternion, view_size: f32, zoom: f32) {
        self.proj = Projection {
            focus,
            rotation,
            view_size: view_size.max(f32::EPSILON),
            zoom: if zoom > 0.0 { zoom } else { 1.0 },
        };
    }

    fn push_attribs(&mut self) {
        self.stack.push(self.attribs);
    }

    fn pop_attribs(&mut self) {
        if let Some(saved) = self.stack.pop() {
            self.attribs = saved;
        }
    }

    fn set_line_width(&mut self, width: f32) {
        self.attribs.line_width = width.max(0.0);
    }

    fn set_point_size(&mut self, size: f32) {
        self.attribs.point_size = size.max(0.0);
    }

    fn set_stipple(&mut self, on: bool) {
        self.attribs.stipple = on;
    }

    fn set_blend(&mut self, on: bool) {
        self.attribs.blend = on;
    }

    fn set_stencil(&mut self, on: bool) {
        self.attribs.stencil = on;
    }

    fn draw_lines(&mut self, segments: &[(Vec3, Vec3)], color: Color) {
        let width = self.attribs.line_width;
        let stipple = self.attribs.stipple;
        for &(a, b) in segments {
            let (x0, y0) = self.project(a);
            let (x1, y1) = self.project(b);
            let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let n = steps as u32;
            for i in 0..=n {
                // dashed lines drop alternating 4-pixel runs
                if stipple && (i / 4) % 2 == 1 {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let t = i as f32 / steps;
                self.stamp(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t, width, color);
            }
        }
    }

    fn draw_points(&mut self, points: &[Vec3], color: Color) {
        let size = self.attribs.point_size;
        for &p in points {
            let (x, y) = self.project(p);
            self.stamp(x, y, size, color);
        }
    }

    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32) -> Pixmap {
        self.frame.region(x, y, width, height)
    }

    fn capture_magnified(
        &mut self,
        mag: u32,
        width: u32,
        height: u32,
        draw: &mut dyn FnMut(&mut dyn RenderBackend),
    ) -> Result<Pixmap, CaptureError> {
        let (big_w, big_h) = (mag * width, mag * height);
        if big_w > self.max_capture_dim || big_h > self.max_capture_dim {
            return Err(CaptureError::Unsupported {
                width: big_w,
                height: big_h,
                limit: self.max_capture_dim,
            });
        }

        let saved_frame = std::mem::replace(&mut self.frame, Pixmap::new(width, height));
        let saved_viewport = self.viewport;
        let mut out = Pixmap::new(big_w, big_h);

        // fill the magnified buffer one window-sized piece at a time,
        // re-running the draw step with a shifted oversized viewport
        for row in 0..mag {
            for col in 0..mag {
                #[allow(clippy::cast_possible_wrap)]
                self.set_viewport(
                    -((col * width) as i32),
                    -((row * height) as i32),
                    big_w,
                    big_h,
                );
                draw(self);
                let piece = self.frame.region(0, 0, width, height);
                out.blit(&piece, col * width, row * height);
            }
        }

        self.frame = saved_frame;
        self.viewport = saved_viewport;
        Ok(out)
    }
}

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCommand {
    /// `clear` with a color.
    Clear(Color),
    /// `set_viewport`.
    SetViewport(i32, i32, u32, u32),
    /// `set_projection` (parameters elided).
    SetProjection,
    /// `push_attribs`.
    PushAttribs,
    /// `pop_attribs`.
    PopAttribs,
    /// `set_line_width`.
    SetLineWidth(f32),
    /// `set_point_size`.
    SetPointSize(f32),
    /// `set_stipple`.
    SetStipple(bool),
    /// `set_blend`.
    SetBlend(bool),
    /// `set_stencil`.
    SetStencil(bool),
    /// `draw_lines` with the segment count.
    DrawLines(usize),
    /// `draw_points` with the point count.
    DrawPoints(usize),
    /// `read_pixels`.
    ReadPixels,
}

/// Records the command stream and draws nothing, for assertions on
/// call order (same role as the mock reader on the simulation side).
/// Magnified capture always reports itself unsupported.
#[derive(Default)]
pub struct RecordingBackend {
    /// Every call in order.
    pub commands: Vec<BackendCommand>,
    viewport: (i32, i32, u32, u32),
}

impl RenderBackend for RecordingBackend {
    fn clear(&mut self, color: Color) {
        self.commands.push(BackendCommand::Clear(color));
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = (x, y, width, height);
        self.commands
            .push(BackendCommand::SetViewport(x, y, width, height));
    }

    fn viewport(&self) -> (i32, i32, u32, u32) {
        self.viewport
    }

    fn set_projection(&mut self, _: Vec3, _: Quaternion, _: f32, _: f32) {
        self.commands.push(BackendCommand::SetProjection);
    }

    fn push_attribs(&mut self) {
        self.commands.push(BackendCommand::PushAttribs);
    }

    fn pop_attribs(&mut self) {
        self.commands.push(BackendCommand::PopAttribs);
    }

    fn set_line_width(&mut self, width: f32) {
        self.commands.push(BackendCommand::SetLineWidth(width));
    }

    fn set_point_size(&mut self, size: f32) {
        self.commands.push(BackendCommand::SetPointSize(size));
    }

    fn set_stipple(&mut self, on: bool) {
        self.commands.push(BackendCommand::SetStipple(on));
    }

    fn set_blend(&mut self, on: bool) {
        self.commands.push(BackendCommand::SetBlend(on));
    }

    fn set_stencil(&mut self, on: bool) {
        self.commands.push(BackendCommand::SetStencil(on));
    }

    fn draw_lines(&mut self, segments: &[(Vec3, Vec3)], _color: Color) {
        self.commands.push(BackendCommand::DrawLines(segments.len()));
    }

    fn draw_points(&mut self, points: &[Vec3], _color: Color) {
        self.commands.push(BackendCommand::DrawPoints(points.len()));
    }

    fn read_pixels(&mut self, _x: u32, _y: u32, width: u32, height: u32) -> Pixmap {
        self.commands.push(BackendCommand::ReadPixels);
        Pixmap::new(width, height)
    }

    fn capture_magnified(
        &mut self,
        mag: u32,
        width: u32,
        height: u32,
        _draw: &mut dyn FnMut(&mut dyn RenderBackend),
    ) -> Result<Pixmap, CaptureError> {
        Err(CaptureError::Unsupported {
            width: mag * width,
            height: mag * height,
            limit: 0,
        })
    }
}
