//! # Spindle Player
//!
//! Assembles the rendering layer around a concrete simulation, image
//! encoder and surface set. The [`Player`] drives the live display
//! loop and the export paths; [`DemoSimulation`] is a small
//! deterministic filament world for headless runs and tests.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod demo;
pub mod encoder;
pub mod player;

pub use demo::DemoSimulation;
pub use encoder::PpmEncoder;
pub use player::Player;
