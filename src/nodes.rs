//! Queueing stations.
//!
//! Every station exposes the same capability set through [`Node`]. The scheduler
//! holds them as [`Station`]s so it can also reach the conventional-only
//! [`SimpleNode::generate_arrival`] when delivering feedback.

pub(crate) mod ride_sharing;
pub(crate) mod simple;
pub(crate) mod slot;

use std::fmt;

use crate::{
    data::NodeSnapshot,
    simulation::{
        event::{EventKind, Outcome},
        Context,
    },
    stats::{Area, Sum},
    time::Time,
};

pub use ride_sharing::{CapacityTier, FeedbackTargets, RideSharingNode, RideSharingParams};
pub use simple::{SimpleNode, SimpleParams};
pub use slot::{ArrivalEvent, SlotEvent};

identifier!(NodeId);
identifier!(SlotId);

pub trait Node: fmt::Debug {
    fn id(&self) -> NodeId;

    fn name(&self) -> &str;

    /// Time of the earliest armed event, or [`Time::INFINITY`] if none is armed.
    fn peek_next_event_time(&self) -> Time;

    /// The event that [`Node::process_next_event`] would handle. Ties go to the
    /// arrival, then to the lowest slot index.
    fn peek_next_event_type(&self) -> Option<EventKind>;

    /// Handles the earliest armed event at `ctx.cur_time`.
    #[must_use]
    fn process_next_event(&mut self, ctx: Context) -> Outcome;

    /// Advances the node's clock to `t`, accumulating its area integrals.
    fn integrate_to(&mut self, t: Time);

    fn area(&self) -> &Area;

    fn server_statistics(&self) -> &[Sum];

    fn population(&self) -> usize;

    /// Returns the node to its initial state, re-arming the arrival process.
    fn reset_state(&mut self);

    /// Clears integrals and counters without touching in-flight events.
    fn reset_statistics(&mut self);

    fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            node: self.id(),
            name: self.name().to_owned(),
            population: self.population(),
            area: *self.area(),
            servers: self.server_statistics().to_vec(),
        }
    }
}

#[derive(Debug, derive_more::From)]
pub enum Station {
    Simple(SimpleNode),
    RideSharing(RideSharingNode),
}

impl Station {
    pub fn node(&self) -> &dyn Node {
        match self {
            Station::Simple(n) => n,
            Station::RideSharing(n) => n,
        }
    }

    pub fn node_mut(&mut self) -> &mut dyn Node {
        match self {
            Station::Simple(n) => n,
            Station::RideSharing(n) => n,
        }
    }

    pub fn as_conventional_mut(&mut self) -> Option<&mut SimpleNode> {
        match self {
            Station::Simple(n) => Some(n),
            Station::RideSharing(_) => None,
        }
    }

    pub fn is_conventional(&self) -> bool {
        matches!(self, Station::Simple(_))
    }
}
