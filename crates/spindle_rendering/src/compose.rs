//! Per-frame scene composition.
//!
//! The composer owns the display configuration and the active style,
//! and runs the fixed frame sequence:
//!
//! ```text
//!   fresh display string?  ->  re-parse, replace props, apply view
//!   auto-scale pending?    ->  fit view to boundary (damped)
//!   tracking requested?    ->  recenter / reorient view
//!   overlays               ->  label + report message
//!   pixel factors          ->  handed to the active style
//!   style prepare          ->  derives the frame's draw parameters
//! ```
//!
//! Any failing step is logged and skipped; the frame always completes
//! with whatever state is valid.

use tracing::{error, warn};

use crate::backend::RenderBackend;
use crate::framing::{auto_scale, auto_track};
use crate::interop::SimulationReader;
use crate::props::{parse_display_string, DisplayProps, PlayProps, PropCache};
use crate::style::{PixelFactors, StyleManager};
use crate::surfaces::SurfaceRegistry;
use crate::view::View;

/// Which built-in memo text to display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MemoKind {
    /// No memo.
    #[default]
    None,
    /// Program name and version.
    About,
    /// Key bindings.
    HelpKeys,
    /// Current player configuration.
    PlayParams,
    /// Current display configuration.
    DisplayParams,
}

/// Composes one frame at a time from a simulation snapshot.
pub struct SceneComposer {
    styles: StyleManager,
    props: DisplayProps,
    play: PlayProps,
    cache: PropCache,
}

impl SceneComposer {
    /// Creates a composer with default properties and the default style.
    #[must_use]
    pub fn new(play: PlayProps) -> Self {
        Self {
            styles: StyleManager::new(),
            props: DisplayProps::default(),
            play,
            cache: PropCache::default(),
        }
    }

    /// Current display configuration.
    #[must_use]
    pub const fn props(&self) -> &DisplayProps {
        &self.props
    }

    /// Current player configuration.
    #[must_use]
    pub const fn play(&self) -> &PlayProps {
        &self.play
    }

    /// Player configuration, mutably.
    pub fn play_mut(&mut self) -> &mut PlayProps {
        &mut self.play
    }

    /// Selects a drawing strategy by index (see `StyleId::from_index`)
    /// and records the choice in the display configuration.
    pub fn set_style(
        &mut self,
        index: i32,
        backend: &mut dyn RenderBackend,
        surfaces: &mut SurfaceRegistry,
    ) {
        self.props.style = index;
        self.styles.set_style(index, backend, surfaces);
    }

    /// Consumes a freshly flagged display string, if any.
    ///
    /// A valid string replaces the display configuration wholesale and
    /// applies its view directives; the window pixel size is preserved
    /// either way. A malformed string is logged and the previous
    /// configuration kept. Returns whether a new configuration was
    /// installed.
    pub fn handle_display_string(
        &mut self,
        sim: &mut dyn SimulationReader,
        view: &mut View,
        backend: &mut dyn RenderBackend,
        surfaces: &mut SurfaceRegistry,
    ) -> bool {
        let Some(text) = sim.fresh_display_string() else {
            return false;
        };
        match parse_display_string(&text) {
            Ok((props, directives)) => {
                let style_changed = props.style != self.props.style;
                self.props = props;
                directives.apply(view);
                if style_changed {
                    self.styles.set_style(self.props.style, backend, surfaces);
                }
                true
            }
            Err(err) => {
                warn!(%err, "ignoring malformed display string");
                false
            }
        }
    }

    /// Builds the status label: simulation time, the engaged-handle
    /// force if any, and a live/playback indicator.
    #[must_use]
    pub fn build_label(sim: &dyn SimulationReader) -> String {
        let mut label = format!("{:.3}s", sim.time());
        if let Some(force) = sim.handle_force() {
            label.push_str(&format!(" handle {force:.1}pN"));
        }
        if sim.is_live() {
            label.push_str(" live");
            let steps = sim.steps_per_frame();
            if steps > 1 {
                label.push_str(&format!(" ({steps}/frame)"));
            }
        } else {
            label.push_str(&format!(" frame {}", sim.current_frame()));
        }
        label
    }

    /// Builds the report overlay from a `"name options..."` request.
    ///
    /// The request splits at the first space; a failed report becomes
    /// its error text so the overlay always shows something actionable.
    #[must_use]
    pub fn build_report(sim: &dyn SimulationReader, request: &str) -> String {
        let request = request.trim();
        if request.is_empty() {
            return String::new();
        }
        let (name, options) = match request.split_once(' ') {
            Some((n, o)) => (n, o),
            None => (request, ""),
        };
        match sim.report(name, options) {
            Ok(text) => text.trim_start_matches('\n').to_owned(),
            Err(err) => err.to_string(),
        }
    }

    /// Renders one of the built-in memo texts.
    #[must_use]
    pub fn memo(&self, kind: MemoKind) -> String {
        match kind {
            MemoKind::None => String::new(),
            MemoKind::About => format!(
                "{} {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
            MemoKind::HelpKeys => concat!(
                "space  play/pause\n",
                "1-3    display style\n",
                "t      cycle tracking\n",
                "z      auto-scale\n",
                "y      save image\n",
                "Y      save magnified image\n",
            )
            .to_owned(),
            MemoKind::PlayParams => {
                toml::to_string(&self.play).unwrap_or_else(|err| err.to_string())
            }
            MemoKind::DisplayParams => {
                toml::to_string(&self.props).unwrap_or_else(|err| err.to_string())
            }
        }
    }

    /// Pixel-to-unit factors for this frame.
    ///
    /// With a positive `point_value`, configured sizes are physical
    /// lengths in multiples of that value; otherwise they are window
    /// pixels and scale directly with the magnification.
    fn pixel_factors(&self, view: &View, mag: u32) -> PixelFactors {
        #[allow(clippy::cast_precision_loss)]
        let mag = (mag.max(1)) as f32;
        let pix = view.pixel_size() / mag;
        if self.props.point_value > 0.0 {
            PixelFactors {
                pixel_size: pix,
                unit_size: self.props.point_value / pix,
            }
        } else {
            PixelFactors {
                pixel_size: pix,
                unit_size: mag,
            }
        }
    }

    /// Runs the full frame-preparation sequence at export magnification
    /// `mag` (1 for on-screen frames).
    pub fn prepare_display(&mut self, sim: &dyn SimulationReader, view: &mut View, mag: u32) {
        if view.auto_scale > 0 {
            auto_scale(&sim.boundary_extents(), view);
        }
        if !view.track.is_empty() {
            auto_track(&sim.filaments(), view);
        }

        view.label = Self::build_label(sim);
        view.message = if self.play.report.is_empty() {
            String::new()
        } else {
            Self::build_report(sim, &self.play.report)
        };

        let factors = self.pixel_factors(view, mag);
        let stencil = view.stencil && sim.dimensions() == 3;
        let style = self.styles.active_mut();
        style.set_pixel_factors(factors);
        style.set_stencil(stencil);
        if let Err(err) = style.prepare(sim, &self.props, &mut self.cache) {
            error!(%err, "scene preparation failed; keeping previous parameters");
        }
    }

    /// Draws the prepared scene into the backend.
    ///
    /// With periodic tiling enabled, the scene is re-drawn once per
    /// periodic shift with a translated projection. Constraint links go
    /// on top as a dashed, blended overlay.
    pub fn draw_scene(
        &self,
        sim: &dyn SimulationReader,
        view: &View,
        backend: &mut dyn RenderBackend,
    ) {
        let style = self.styles.active();

        let shifts = if self.props.tile > 0 {
            sim.periodic_shifts(self.props.tile)
        } else {
            Vec::new()
        };
        if shifts.is_empty() {
            if let Err(err) = style.draw(sim, &self.cache, backend) {
                error!(%err, "draw pass failed");
            }
        } else {
            for shift in shifts {
                backend.set_projection(
                    view.focus - shift,
                    view.rotation,
                    view.view_size,
                    view.zoom,
                );
                if let Err(err) = style.draw(sim, &self.cache, backend) {
                    error!(%err, "tiled draw pass failed");
                }
            }
            backend.set_projection(view.focus, view.rotation, view.view_size, view.zoom);
        }

        if self.props.draw_links {
            let links = sim.links();
            if !links.is_empty() {
                backend.push_attribs();
                backend.set_blend(true);
                backend.set_stipple(true);
                backend.set_line_width(4.0);
                backend.draw_lines(&links, [1.0, 1.0, 1.0, 0.6]);
                backend.pop_attribs();
            }
        }
    }

    /// Full display step: configuration hot-reload, preparation,
    /// projection, then the draw passes.
    pub fn display_scene(
        &mut self,
        sim: &mut dyn SimulationReader,
        view: &mut View,
        backend: &mut dyn RenderBackend,
        surfaces: &mut SurfaceRegistry,
        mag: u32,
    ) {
        self.handle_display_string(sim, view, backend, surfaces);
        self.prepare_display(sim, view, mag);
        view.apply(backend);
        self.draw_scene(sim, view, backend);
    }
}

impl Default for SceneComposer {
    fn default() -> Self {
        Self::new(PlayProps::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::interop::{FilamentInfo, MockSimulation};
    use crate::style::StyleId;
    use spindle_shared::Vec3;

    fn one_filament() -> Vec<FilamentInfo> {
        vec![FilamentInfo {
            points: vec![Vec3::new(-2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)],
        }]
    }

    #[test]
    fn test_label_live_and_playback() {
        let mut sim = MockSimulation {
            time: 1.25,
            live: true,
            period: 4,
            ..MockSimulation::default()
        };
        assert_eq!(SceneComposer::build_label(&sim), "1.250s live (4/frame)");

        // One step per frame is the norm and not worth announcing.
        sim.period = 1;
        assert_eq!(SceneComposer::build_label(&sim), "1.250s live");

        sim.live = false;
        sim.frame = 12;
        assert_eq!(SceneComposer::build_label(&sim), "1.250s frame 12");

        sim.handle_force = Some(3.14);
        assert_eq!(
            SceneComposer::build_label(&sim),
            "1.250s handle 3.1pN frame 12"
        );
    }

    #[test]
    fn test_report_splits_request_and_surfaces_errors() {
        let sim = MockSimulation {
            reports: vec![("fiber".to_owned(), "\nfiber data".to_owned())],
            ..MockSimulation::default()
        };
        // leading newline stripped
        assert_eq!(
            SceneComposer::build_report(&sim, "fiber length verbose=1"),
            "fiber data"
        );
        // unknown report becomes its error text
        let msg = SceneComposer::build_report(&sim, "nonsense");
        assert!(msg.contains("nonsense"), "msg = {msg}");
        assert_eq!(SceneComposer::build_report(&sim, "  "), "");
    }

    #[test]
    fn test_display_string_replaces_props_wholesale() {
        let mut composer = SceneComposer::default();
        composer.props.draw_links = true;
        let mut view = View::new(640, 480);
        let mut backend = SoftwareBackend::new(640, 480);
        let mut surfaces = SurfaceRegistry::new();

        let mut sim = MockSimulation {
            display_string: Some("style = 2\nzoom = 2.0".to_owned()),
            ..MockSimulation::default()
        };
        assert!(composer.handle_display_string(&mut sim, &mut view, &mut backend, &mut surfaces));

        // unmentioned keys return to their defaults
        assert!(!composer.props().draw_links);
        assert_eq!(composer.props().style, 2);
        assert_eq!(composer.styles.active().id(), StyleId::Flat);
        assert!((view.zoom - 2.0).abs() < f32::EPSILON);
        // the window size is never driven by the string
        assert_eq!(view.window_size, [640, 480]);
    }

    #[test]
    fn test_malformed_display_string_keeps_previous_props() {
        let mut composer = SceneComposer::default();
        composer.props.line_width = 9.0;
        let mut view = View::new(640, 480);
        let mut backend = SoftwareBackend::new(640, 480);
        let mut surfaces = SurfaceRegistry::new();

        let mut sim = MockSimulation {
            display_string: Some("style = = broken".to_owned()),
            ..MockSimulation::default()
        };
        assert!(!composer.handle_display_string(&mut sim, &mut view, &mut backend, &mut surfaces));
        assert!((composer.props().line_width - 9.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pixel_factors_point_value_branch() {
        let mut composer = SceneComposer::default();
        let mut view = View::new(100, 100);
        view.view_size = 10.0;
        view.zoom = 1.0;
        // pixel_size = 10 / 100 = 0.1

        let plain = composer.pixel_factors(&view, 1);
        assert!((plain.pixel_size - 0.1).abs() < 1e-6);
        assert!((plain.unit_size - 1.0).abs() < f32::EPSILON);

        // Pixel-unit sizes keep their on-screen weight when magnified.
        let plain_mag = composer.pixel_factors(&view, 2);
        assert!((plain_mag.pixel_size - 0.05).abs() < 1e-6);
        assert!((plain_mag.unit_size - 2.0).abs() < f32::EPSILON);

        composer.props.point_value = 0.5;
        let physical = composer.pixel_factors(&view, 1);
        assert!((physical.unit_size - 5.0).abs() < 1e-5);

        // magnified exports shrink the pixel, scaling strokes up
        let magnified = composer.pixel_factors(&view, 2);
        assert!((magnified.pixel_size - 0.05).abs() < 1e-6);
        assert!((magnified.unit_size - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_prepare_consumes_auto_adjustments() {
        let mut composer = SceneComposer::default();
        let mut view = View::new(100, 100);
        view.auto_scale = 1;
        view.track = crate::view::TrackFlags::CENTER;

        let sim = MockSimulation {
            extents: vec![6.0],
            filaments: vec![FilamentInfo {
                points: vec![Vec3::new(4.0, 4.0, 0.0)],
            }],
            ..MockSimulation::default()
        };
        composer.prepare_display(&sim, &mut view, 1);
        assert_eq!(view.auto_scale, 0);
        assert!((view.view_size - 12.0).abs() < 1e-5);
        assert!((view.focus - Vec3::new(4.0, 4.0, 0.0)).length() < 1e-6);
        assert!(!view.label.is_empty());
    }

    #[test]
    fn test_tiled_draw_restores_projection_and_covers_images() {
        let mut composer = SceneComposer::default();
        composer.props.tile = 1;
        let mut view = View::new(100, 100);
        view.view_size = 30.0;

        let sim = MockSimulation {
            filaments: one_filament(),
            period_vector: Some(Vec3::new(10.0, 0.0, 0.0)),
            ..MockSimulation::default()
        };
        let mut backend = SoftwareBackend::new(100, 100);
        backend.clear([0.0, 0.0, 0.0, 1.0]);
        composer.prepare_display(&sim, &mut view, 1);
        view.apply(&mut backend);
        composer.draw_scene(&sim, &view, &mut backend);

        // the filament spans x in [-2, 2]; with period 10 and tile 1 its
        // images appear shifted by -10 and +10 world units too
        let frame = backend.read_pixels(0, 0, 100, 100);
        let ppu = 100.0 / 30.0;
        for shift in [-10.0_f32, 0.0, 10.0] {
            let x = (50.0 + shift * ppu) as u32;
            assert_ne!(frame.pixel(x, 50), [0, 0, 0, 255], "shift {shift}");
        }
    }

    #[test]
    fn test_links_overlay_leaves_attribs_balanced() {
        let mut composer = SceneComposer::default();
        composer.props.draw_links = true;
        let mut view = View::new(64, 64);

        let sim = MockSimulation {
            filaments: one_filament(),
            links: vec![(Vec3::new(0.0, -2.0, 0.0), Vec3::new(0.0, 2.0, 0.0))],
            ..MockSimulation::default()
        };
        let mut backend = SoftwareBackend::new(64, 64);
        let depth = backend.attrib_depth();
        composer.prepare_display(&sim, &mut view, 1);
        view.apply(&mut backend);
        composer.draw_scene(&sim, &view, &mut backend);
        assert_eq!(backend.attrib_depth(), depth);
    }

    #[test]
    fn test_links_overlay_command_order() {
        use crate::backend::{BackendCommand, RecordingBackend};

        let mut composer = SceneComposer::default();
        composer.props.draw_links = true;
        let mut view = View::new(64, 64);
        let sim = MockSimulation {
            links: vec![(Vec3::ZERO, Vec3::Y)],
            ..MockSimulation::default()
        };
        let mut backend = RecordingBackend::default();
        composer.prepare_display(&sim, &mut view, 1);
        composer.draw_scene(&sim, &view, &mut backend);

        // the overlay is scoped: save state, blend + stipple + wide
        // lines, draw, restore
        let cmds = &backend.commands;
        let push = cmds
            .iter()
            .position(|c| *c == BackendCommand::PushAttribs)
            .expect("push");
        let pop = cmds
            .iter()
            .position(|c| *c == BackendCommand::PopAttribs)
            .expect("pop");
        assert!(push < pop);
        let scoped = &cmds[push..=pop];
        assert!(scoped.contains(&BackendCommand::SetBlend(true)));
        assert!(scoped.contains(&BackendCommand::SetStipple(true)));
        assert!(scoped.contains(&BackendCommand::SetLineWidth(4.0)));
        assert!(scoped.contains(&BackendCommand::DrawLines(1)));
    }

    #[test]
    fn test_memo_texts() {
        let composer = SceneComposer::default();
        assert_eq!(composer.memo(MemoKind::None), "");
        assert!(composer.memo(MemoKind::About).contains(env!("CARGO_PKG_VERSION")));
        assert!(composer.memo(MemoKind::HelpKeys).contains("display style"));
        assert!(composer.memo(MemoKind::PlayParams).contains("downsample"));
        assert!(composer.memo(MemoKind::DisplayParams).contains("line_width"));
    }
}
