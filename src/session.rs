//! Prover Session Manager
//!
//! The proving context builds its prover once, during bootstrap, and reuses it for
//! every unit. Before each unit the session asks the prover for a fresh generation
//! backed by the same resources and hands that generation out for the duration of
//! the unit only.
//!
//! No locking happens here. The router never overlaps dispatches within a context,
//! and the returned [`SessionGeneration`] borrows the session mutably, so a second
//! generation cannot exist while the first is alive.

use crate::engine::ProverEngine;
use tracing::debug;

/// Owns the prover of one proving context
pub struct ProverSession<P> {
    current: P,
    generation: u64,
}

impl<P: ProverEngine> ProverSession<P> {
    pub fn new(prover: P) -> Self {
        Self {
            current: prover,
            generation: 0,
        }
    }

    /// Number of generations handed out so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The prover as of the latest generation
    pub fn current(&self) -> &P {
        &self.current
    }

    /// Reset the prover and return the fresh generation for exclusive use by the
    /// current unit.
    pub fn prepare(&mut self) -> SessionGeneration<'_, P> {
        let fresh = self.current.reset();
        self.current = fresh;
        self.generation += 1;

        debug!(generation = self.generation, "Prepared prover generation");

        SessionGeneration {
            generation: self.generation,
            prover: &mut self.current,
        }
    }
}

/// A reset prover, valid until the unit that requested it settles
pub struct SessionGeneration<'a, P> {
    generation: u64,
    prover: &'a mut P,
}

impl<'a, P> SessionGeneration<'a, P> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn prover(&mut self) -> &mut P {
        self.prover
    }
}
