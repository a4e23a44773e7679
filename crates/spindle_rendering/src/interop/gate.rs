//! The synchronization gate between simulation and rendering.
//!
//! Two independent activities share the simulation state: the
//! simulation thread that advances it, and the render/export path that
//! reads it. Exports must see an internally consistent snapshot across
//! potentially dozens of draw passes, so they hold this gate for the
//! whole capture-or-composite sequence. Live display never blocks on
//! it: it tries the gate and skips the frame when the simulation is
//! mid-step.
//!
//! ```text
//! simulation thread ──┐            ┌── export (blocking lock,
//!                     ├─ SimGate ──┤    held across all passes)
//!   step / step / …  ─┘            └── live frame (try_lock,
//!                                       skip on contention)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

/// Exclusive gate around the simulation state.
///
/// No timeout is applied: a blocked caller waits until the simulation
/// thread releases, which it does promptly between steps.
pub struct SimGate<S> {
    inner: Mutex<S>,
    /// Number of successful acquisitions, for diagnostics and tests.
    acquisitions: AtomicU64,
}

impl<S> SimGate<S> {
    /// Wraps a simulation state in a gate.
    #[must_use]
    pub fn new(sim: S) -> Self {
        Self {
            inner: Mutex::new(sim),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Acquires the gate, blocking until it is free.
    #[must_use]
    pub fn lock(&self) -> SimGuard<'_, S> {
        let guard = self.inner.lock();
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        SimGuard { guard }
    }

    /// Acquires the gate only if it is free right now.
    #[must_use]
    pub fn try_lock(&self) -> Option<SimGuard<'_, S>> {
        let guard = self.inner.try_lock()?;
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        Some(SimGuard { guard })
    }

    /// Number of successful acquisitions so far.
    #[must_use]
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

/// Guard proving exclusive access to the simulation state.
pub struct SimGuard<'a, S> {
    guard: MutexGuard<'a, S>,
}

impl<S> std::ops::Deref for SimGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.guard
    }
}

impl<S> std::ops::DerefMut for SimGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_exclusion() {
        let gate = SimGate::new(0_u32);
        let held = gate.lock();
        assert!(gate.try_lock().is_none());
        drop(held);
        assert!(gate.try_lock().is_some());
        assert_eq!(gate.acquisitions(), 2);
    }

    #[test]
    fn test_gate_mutation_through_guard() {
        let gate = SimGate::new(vec![1, 2, 3]);
        {
            let mut sim = gate.lock();
            sim.push(4);
        }
        assert_eq!(gate.lock().len(), 4);
    }
}
