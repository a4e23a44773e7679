//! Camera/projection state for one rendering surface.
//!
//! A `View` is created once per on-screen window and lives until the
//! window closes. It is mutated only by the rendering/export path: the
//! simulation thread never touches it.

use serde::{Deserialize, Serialize};
use spindle_shared::{Quaternion, Vec3};

use crate::backend::RenderBackend;

/// Bit-flags selecting the automatic tracking behaviors.
///
/// The three bits are independent and combinable. When CENTER is
/// combined with a rotational flag, recentering is applied first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackFlags(u8);

impl TrackFlags {
    /// No tracking.
    pub const NONE: Self = Self(0);
    /// Recenter on the centroid of trackable filaments.
    pub const CENTER: Self = Self(1);
    /// Rotate to align with the dominant nematic axis.
    pub const NEMATIC: Self = Self(2);
    /// Rotate to the principal axes of the second-moment tensor
    /// (the inverse rotation is applied, so the view counter-rotates).
    pub const MOMENT: Self = Self(4);

    /// Builds flags from a raw bit pattern, dropping unknown bits.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    /// Raw bit pattern.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if this set contains every bit of `other`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for TrackFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Camera, projection and overlay state for one window.
#[derive(Clone, Debug)]
pub struct View {
    /// World point at the center of the window.
    pub focus: Vec3,
    /// View orientation. The projection applies its conjugate, so this
    /// is "the rotation that carries camera axes onto world axes".
    pub rotation: Quaternion,
    /// Magnification on top of `view_size`.
    pub zoom: f32,
    /// Diameter of the visible region in world units at zoom 1.
    pub view_size: f32,
    /// Window dimensions in pixels. Never driven by the simulation's
    /// display directives.
    pub window_size: [u32; 2],
    /// Remaining auto-scale adjustments; decremented each frame until 0.
    pub auto_scale: u32,
    /// Automatic tracking flags.
    pub track: TrackFlags,
    /// Whether the stencil buffer may be used (3D solid style only).
    pub stencil: bool,
    /// Short status overlay (time, handle force, live/frame indicator).
    pub label: String,
    /// On-demand report overlay.
    pub message: String,
}

impl View {
    /// Creates a view for a `width` x `height` pixel window.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            focus: Vec3::ZERO,
            rotation: Quaternion::IDENTITY,
            zoom: 1.0,
            view_size: 10.0,
            window_size: [width, height],
            auto_scale: 0,
            track: TrackFlags::NONE,
            stencil: false,
            label: String::new(),
            message: String::new(),
        }
    }

    /// Window width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.window_size[0]
    }

    /// Window height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.window_size[1]
    }

    /// Physical size of one pixel in world units.
    #[must_use]
    pub fn pixel_size(&self) -> f32 {
        let side = self.window_size[0].min(self.window_size[1]).max(1);
        #[allow(clippy::cast_precision_loss)]
        let side = side as f32;
        self.view_size / (self.zoom * side)
    }

    /// Multiplies the zoom by `factor`.
    pub fn zoom_in(&mut self, factor: f32) {
        self.zoom *= factor;
    }

    /// Moves the view center to `point`.
    pub fn move_to(&mut self, point: Vec3) {
        self.focus = point;
    }

    /// Rotates the view so that `axis` lies along the screen X axis.
    pub fn align_with(&mut self, axis: Vec3) {
        self.rotation = Quaternion::rotation_between(Vec3::X, axis);
    }

    /// Applies this view's viewport and projection to the backend.
    pub fn apply(&self, backend: &mut dyn RenderBackend) {
        backend.set_viewport(0, 0, self.window_size[0], self.window_size[1]);
        backend.set_projection(self.focus, self.rotation, self.view_size, self.zoom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_flags() {
        let t = TrackFlags::CENTER | TrackFlags::MOMENT;
        assert!(t.contains(TrackFlags::CENTER));
        assert!(t.contains(TrackFlags::MOMENT));
        assert!(!t.contains(TrackFlags::NEMATIC));
        assert!(TrackFlags::NONE.is_empty());

        // unknown bits are dropped
        assert_eq!(TrackFlags::from_bits(0xF8), TrackFlags::NONE);
    }

    #[test]
    fn test_pixel_size() {
        let mut view = View::new(800, 400);
        view.view_size = 40.0;
        view.zoom = 1.0;
        // smaller window side rules the scale
        assert!((view.pixel_size() - 0.1).abs() < 1e-6);

        view.zoom_in(2.0);
        assert!((view.pixel_size() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_align_with() {
        let mut view = View::new(100, 100);
        view.align_with(Vec3::Y);
        let mapped = view.rotation.rotate(Vec3::X);
        assert!((mapped - Vec3::Y).length() < 1e-4);
    }
}
