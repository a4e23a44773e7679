//! # SPINDLE Shared
//!
//! Common math and plain-data types used by the player and headless tools.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - a windowing toolkit
//! - any GPU or rendering crate
//!
//! If you need graphics types, put them in `spindle_rendering`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod math;

pub use math::{Mat3, Quaternion, SymMat3, Vec3};
