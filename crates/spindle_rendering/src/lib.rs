//! # Spindle Rendering
//!
//! The visualization and export layer over a live filament simulation.
//! The simulation itself is a black box behind [`SimulationReader`];
//! this crate frames it, draws it, and writes it to image files.
//!
//! ## Frame Timeline
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │ display string fresh? -> re-parse, replace config wholesale    │
//! │ auto-scale pending?   -> fit view to boundary, damped          │
//! │ tracking flags set?   -> recenter / reorient the view          │
//! │ overlays              -> label + report message                │
//! │ style prepare         -> derive the frame's draw parameters    │
//! │ projection            -> viewport + world-to-screen mapping    │
//! │ draw passes           -> filaments (tiled if periodic), links  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Live frames run this under a `try_lock` and skip on contention;
//! exports hold the [`SimGate`] across every pass so a composite image
//! never mixes two simulation states.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod backend;
pub mod compose;
pub mod error;
pub mod export;
pub mod framing;
pub mod interop;
pub mod props;
pub mod style;
pub mod surfaces;
pub mod view;

pub use backend::{
    BackendCommand, Color, Pixmap, RecordingBackend, RenderBackend, SoftwareBackend,
};
pub use compose::{MemoKind, SceneComposer};
pub use error::{
    CaptureError, ConfigError, EncoderError, ExportError, RenderError, ReportError,
};
pub use export::{Exporter, ImageEncoder, SavedImage};
pub use framing::AUTO_SCALE_DAMPING;
pub use interop::{FilamentInfo, MockSimulation, SimGate, SimGuard, SimulationReader};
pub use props::{DisplayProps, PlayProps};
pub use style::{DisplayStyle, StyleId, StyleManager};
pub use surfaces::{
    HeadlessSurface, RedrawRequest, RedrawScheduler, Surface, SurfaceRegistry,
};
pub use view::{TrackFlags, View};
