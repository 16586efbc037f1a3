use smallvec::SmallVec;

use crate::{
    nodes::{NodeId, SlotId},
    time::Time,
};

// A matching round rarely rejects more than a handful of requests
pub type FeedbackList = SmallVec<[Feedback; 4]>;

/// The kind of event a node will process next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The node's own arrival process.
    Arrival,
    /// An arrival handed over by another node.
    External,
    /// Service completion on a slot.
    Departure(SlotId),
}

/// A request rerouted to a conventional node.
#[derive(Debug, Clone, Copy, PartialEq, derive_new::new)]
pub struct Feedback {
    pub target: NodeId,
    /// Arrival time of the rerouted request.
    pub time: Time,
}

/// What processing one event produced.
#[derive(Debug, Default)]
pub struct Outcome {
    /// The slot that completed service, if the event was a departure.
    pub departed: Option<SlotId>,
    pub feedback: FeedbackList,
}

impl Outcome {
    pub fn is_departure(&self) -> bool {
        self.departed.is_some()
    }
}
