//! The windowing layer as a narrow interface.
//!
//! The event toolkit owns the real windows; the player only needs to
//! enumerate open rendering surfaces, re-initialize their context state
//! on style switches, and post redraw requests back to the event loop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::backend::RenderBackend;

/// One open rendering surface (a window's drawable area).
pub trait Surface {
    /// True when the surface is currently backed by a live context.
    /// Surfaces without one are skipped during re-initialization.
    fn has_context(&self) -> bool;

    /// Pixel dimensions of the surface.
    fn dimensions(&self) -> (u32, u32);

    /// Re-initializes per-surface context state after a style switch.
    fn init_context(&mut self, backend: &mut dyn RenderBackend);
}

/// All currently open surfaces, indexable and enumerable.
#[derive(Default)]
pub struct SurfaceRegistry {
    surfaces: Vec<Box<dyn Surface>>,
}

impl SurfaceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an open surface.
    pub fn push(&mut self, surface: Box<dyn Surface>) {
        self.surfaces.push(surface);
    }

    /// Number of registered surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// True when no surface is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Iterates over all surfaces mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Surface>> {
        self.surfaces.iter_mut()
    }
}

/// A request for the event loop to redraw the live display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RedrawRequest;

/// Posts redraw requests to the windowing layer's event loop.
///
/// Cloneable; the export engine keeps one to refresh the on-screen view
/// after an indexed magnified export.
#[derive(Clone)]
pub struct RedrawScheduler {
    tx: Sender<RedrawRequest>,
}

impl RedrawScheduler {
    /// Creates a scheduler and the receiver the event loop drains.
    #[must_use]
    pub fn channel() -> (Self, Receiver<RedrawRequest>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// Posts one redraw request. A disconnected event loop is ignored:
    /// the player may be shutting down.
    pub fn schedule(&self) {
        let _ = self.tx.send(RedrawRequest);
    }
}

/// A surface with no real window behind it, for headless use and tests.
pub struct HeadlessSurface {
    dimensions: (u32, u32),
    live: bool,
    init_count: Arc<AtomicUsize>,
}

impl HeadlessSurface {
    /// Creates a headless surface of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32, live: bool) -> Self {
        Self {
            dimensions: (width, height),
            live,
            init_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of context re-initializations, readable after the
    /// surface moved into a registry.
    #[must_use]
    pub fn init_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.init_count)
    }
}

impl Surface for HeadlessSurface {
    fn has_context(&self) -> bool {
        self.live
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn init_context(&mut self, _backend: &mut dyn RenderBackend) {
        self.init_count.fetch_add(1, Ordering::Relaxed);
    }
}
