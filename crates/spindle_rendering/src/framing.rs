//! Automatic view framing: fit-to-boundary zoom and object tracking.
//!
//! Both adjustments run at the start of frame preparation, before the
//! projection is applied, so a frame is never drawn under stale camera
//! parameters.

use spindle_shared::{Quaternion, SymMat3, Vec3};
use tracing::trace;

use crate::interop::FilamentInfo;
use crate::view::{TrackFlags, View};

/// Per-application zoom damping for the fit-to-boundary adjustment.
///
/// Applied once per frame while the countdown runs, it converges the
/// zoom smoothly onto the boundary instead of snapping.
pub const AUTO_SCALE_DAMPING: f32 = 0.933_033;

/// One step of the fit-to-boundary adjustment.
///
/// While `view.auto_scale` is non-zero, sets the view size to twice the
/// largest boundary extent, applies one damped zoom step, and counts
/// the adjustment down. Empty or degenerate extents leave the view and
/// the countdown untouched, so the fit retries once extents appear.
pub fn auto_scale(extents: &[f32], view: &mut View) {
    if view.auto_scale == 0 {
        return;
    }
    let largest = extents.iter().copied().fold(0.0_f32, f32::max);
    if largest > 0.0 {
        view.view_size = 2.0 * largest;
        view.zoom_in(AUTO_SCALE_DAMPING);
        trace!(view_size = view.view_size, zoom = view.zoom, "auto-scale step");
        view.auto_scale -= 1;
    }
}

fn centroid(filaments: &[FilamentInfo]) -> Option<Vec3> {
    let mut sum = Vec3::ZERO;
    let mut count = 0_u32;
    for f in filaments {
        for &p in &f.points {
            sum += p;
            count += 1;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    (count > 0).then(|| sum * (1.0 / count as f32))
}

/// Principal direction of the filament segments, sign-agnostic.
fn nematic_axis(filaments: &[FilamentInfo]) -> Option<Vec3> {
    // a second-order direction tensor, so antiparallel segments
    // reinforce instead of cancelling
    let mut tensor = SymMat3::ZERO;
    let mut count = 0_u32;
    for f in filaments {
        for (a, b) in f.segments() {
            if let Some(dir) = (b - a).normalized() {
                tensor.add_outer(dir, 1.0);
                count += 1;
            }
        }
    }
    if count == 0 {
        return None;
    }
    // traceless order tensor; the shift and scale leave the axes alone
    // but keep the entries in a well-conditioned range
    #[allow(clippy::cast_precision_loss)]
    tensor.scale(1.0 / count as f32);
    tensor.sub_diagonal(1.0 / 3.0);
    let (_, vectors) = tensor.principal_axes();
    Some(vectors.column(0))
}

/// Second moment of all filament points about their centroid.
fn moment_tensor(filaments: &[FilamentInfo], center: Vec3) -> SymMat3 {
    let mut tensor = SymMat3::ZERO;
    for f in filaments {
        for &p in &f.points {
            tensor.add_outer(p - center, 1.0);
        }
    }
    tensor
}

/// One step of object tracking: recenters and reorients the view to
/// follow the filament distribution, per `view.track`.
///
/// Centering moves the focus to the point centroid. Nematic alignment
/// rotates the horizontal axis onto the principal segment direction.
/// Moment alignment orients the view along the principal axes of the
/// second-moment tensor and takes precedence over nematic alignment
/// when both are requested. With no filaments the view is untouched.
pub fn auto_track(filaments: &[FilamentInfo], view: &mut View) {
    if view.track.is_empty() || filaments.is_empty() {
        return;
    }

    let center = centroid(filaments);

    if view.track.contains(TrackFlags::CENTER) {
        if let Some(c) = center {
            view.move_to(c);
        }
    }

    if view.track.contains(TrackFlags::NEMATIC) {
        if let Some(axis) = nematic_axis(filaments) {
            view.align_with(axis);
        }
    }

    if view.track.contains(TrackFlags::MOMENT) {
        if let Some(c) = center {
            let (_, vectors) = moment_tensor(filaments, c).principal_axes();
            // camera rotation is the inverse of the object orientation
            view.rotation = Quaternion::from_rotation_matrix(&vectors).conjugate();
        }
    }
}
