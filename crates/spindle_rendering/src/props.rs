//! Display and player property snapshots.
//!
//! The simulation embeds display directives as a TOML string. Whenever it
//! flags that string as fresh, the composer re-parses it into a new
//! [`DisplayProps`] value that replaces the previous one wholesale: a
//! frame only ever sees one complete configuration, never a half-updated
//! one.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::view::{TrackFlags, View};

/// Rendering configuration, replaced as a whole on reconfiguration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayProps {
    /// Requested display style index (see `StyleId::from_index`).
    pub style: i32,
    /// Line width. In pixels, unless `point_value` is set.
    pub line_width: f32,
    /// Point size. In pixels, unless `point_value` is set.
    pub point_size: f32,
    /// When positive, point/line sizes are given in physical units of
    /// this value instead of pixels.
    pub point_value: f32,
    /// Periodic-image tiling radius; 0 disables tiled drawing.
    pub tile: u32,
    /// Draw inter-entity constraint links as a dashed overlay.
    pub draw_links: bool,
    /// Rendering quality knob (segment subdivision and the like).
    pub quality: u32,
}

impl Default for DisplayProps {
    fn default() -> Self {
        Self {
            style: 1,
            line_width: 2.0,
            point_size: 5.0,
            point_value: 0.0,
            tile: 0,
            draw_links: false,
            quality: 1,
        }
    }
}

/// Player configuration: reports, image output, live stepping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayProps {
    /// Report request shown as the message overlay, as
    /// `"name options..."`; empty disables the report.
    pub report: String,
    /// Image format tag for exports (handed to the encoder).
    pub image_format: String,
    /// Output directory for exports; empty means the current directory.
    pub image_dir: String,
    /// Integer downsampling factor applied by the encoder.
    pub downsample: u32,
    /// Simulation steps per displayed frame while live.
    pub period: u32,
}

impl Default for PlayProps {
    fn default() -> Self {
        Self {
            report: String::new(),
            image_format: "png".to_owned(),
            image_dir: String::new(),
            downsample: 1,
            period: 1,
        }
    }
}

/// View settings that a display string may override.
///
/// Window dimensions are deliberately absent: the simulation never
/// drives the window size.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewDirectives {
    /// Zoom override.
    pub zoom: Option<f32>,
    /// Visible-region size override.
    pub view_size: Option<f32>,
    /// Number of auto-scale adjustments to schedule.
    pub auto_scale: Option<u32>,
    /// Raw tracking bits.
    pub track: Option<u8>,
    /// Stencil-buffer use.
    pub stencil: Option<bool>,
    /// View center override.
    pub focus: Option<[f32; 3]>,
}

impl ViewDirectives {
    /// Applies the overrides to `view`, preserving the current window
    /// pixel dimensions regardless of what the string specified.
    pub fn apply(&self, view: &mut View) {
        if let Some(zoom) = self.zoom {
            view.zoom = zoom;
        }
        if let Some(size) = self.view_size {
            view.view_size = size;
        }
        if let Some(n) = self.auto_scale {
            view.auto_scale = n;
        }
        if let Some(bits) = self.track {
            view.track = TrackFlags::from_bits(bits);
        }
        if let Some(stencil) = self.stencil {
            view.stencil = stencil;
        }
        if let Some(focus) = self.focus {
            view.focus = spindle_shared::Vec3::from_array(focus);
        }
    }
}

/// Parses a display string into a fresh property snapshot plus view
/// overrides.
///
/// Unknown keys are ignored so display properties and view directives
/// can share one string.
///
/// # Errors
///
/// [`ConfigError::Parse`] when the string is not valid TOML; the caller
/// keeps the previous configuration.
pub fn parse_display_string(s: &str) -> Result<(DisplayProps, ViewDirectives), ConfigError> {
    let props: DisplayProps = toml::from_str(s)?;
    let directives: ViewDirectives = toml::from_str(s)?;
    Ok((props, directives))
}

/// Per-frame draw parameters derived from the display properties during
/// scene preparation, consumed by the active style's draw pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropCache {
    /// Effective line width in pixels.
    pub line_width: f32,
    /// Effective point size in pixels.
    pub point_size: f32,
    /// Per-filament stroke colors, cycled by index.
    pub palette: Vec<crate::backend::Color>,
}

impl PropCache {
    /// Stroke color for filament `index`.
    #[must_use]
    pub fn color(&self, index: usize) -> crate::backend::Color {
        if self.palette.is_empty() {
            [1.0, 1.0, 1.0, 1.0]
        } else {
            self.palette[index % self.palette.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_display_string() {
        let (props, directives) = parse_display_string(
            "style = 2\nline_width = 3.5\ntile = 1\nzoom = 0.5\ntrack = 5\n",
        )
        .expect("valid TOML");
        assert_eq!(props.style, 2);
        assert!((props.line_width - 3.5).abs() < f32::EPSILON);
        assert_eq!(props.tile, 1);
        // defaults fill the rest
        assert!((props.point_size - 5.0).abs() < f32::EPSILON);

        let mut view = View::new(640, 480);
        directives.apply(&mut view);
        assert!((view.zoom - 0.5).abs() < f32::EPSILON);
        assert!(view.track.contains(TrackFlags::CENTER | TrackFlags::MOMENT));
        // window size untouched
        assert_eq!(view.window_size, [640, 480]);
    }

    #[test]
    fn test_parse_malformed_string() {
        assert!(parse_display_string("style = = 2").is_err());
    }

    #[test]
    fn test_prop_cache_palette() {
        let cache = PropCache {
            palette: vec![[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]],
            ..PropCache::default()
        };
        assert_eq!(cache.color(0), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(cache.color(3), [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(PropCache::default().color(7), [1.0, 1.0, 1.0, 1.0]);
    }
}
