//! Time-weighted integrals and per-server counters.
//!
//! The core only accumulates. Dividing areas by elapsed time or by jobs served
//! is left to whoever consumes the snapshots.

use crate::time::{Delta, Time};

/// Time-weighted integrals of a node's population, queue and busy servers.
#[derive(Debug, Default, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Area {
    /// Integral of the number of jobs in the node.
    pub node: f64,
    /// Integral of the number of jobs waiting.
    pub queue: f64,
    /// Integral of the number of busy units.
    pub service: f64,
}

impl Area {
    pub(crate) fn accumulate(&mut self, dt: Delta, population: usize, busy: usize) {
        let dt = dt.into_f64();
        self.node += dt * population as f64;
        self.service += dt * busy as f64;
        self.queue += dt * population.saturating_sub(busy) as f64;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-server counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sum {
    /// Jobs (or bundled requests) served.
    pub served: u64,
    /// Cumulative service time.
    pub service: Delta,
}

impl Sum {
    pub(crate) fn record(&mut self, served: u64, service: Delta) {
        self.served += served;
        self.service += service;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A node-local clock plus the area accumulated up to it.
#[derive(Debug, Default, Clone)]
pub(crate) struct Integrator {
    pub(crate) clock: Time,
    pub(crate) area: Area,
}

impl Integrator {
    /// Advances the clock to `t`, charging the interval to the area. Readings at or
    /// before the current clock are ignored.
    pub(crate) fn integrate_to(&mut self, t: Time, population: usize, busy: usize) {
        if t <= self.clock {
            return;
        }
        self.area.accumulate(t - self.clock, population, busy);
        self.clock = t;
    }

    pub(crate) fn reset(&mut self) {
        self.clock = Time::ZERO;
        self.area.reset();
    }
}
