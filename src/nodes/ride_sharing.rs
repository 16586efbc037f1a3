//! Ride-sharing station.
//!
//! Requests accumulate in a pending queue while a matching window is open. Once
//! an arrival finds the window expired, the node drains the queue: each round
//! offers the head request to the busy vehicles first (best fit on remaining
//! seats, each vehicle accepting with probability `p_match_busy`) and falls back
//! to an idle vehicle (accepting with `p_match_idle`), which then sweeps the whole
//! queue for every request it can still seat. A head that no vehicle accepts is
//! fed back to a conventional node.

use tracing::{debug, trace};

use crate::{
    distribution::Distribution,
    error::ConfigError,
    queue::{PendingQ, Request},
    random::{Stream, Streams},
    simulation::{
        event::{EventKind, Outcome},
        Context,
    },
    stats::{Area, Integrator, Sum},
    time::{Delta, Time},
};

use super::{ArrivalEvent, Node, NodeId, SlotEvent, SlotId};

/// Cumulative seat-demand distribution: 1 seat w.p. 0.4, 2 w.p. 0.3, 3 w.p. 0.2,
/// 4 w.p. 0.1.
const SEAT_DEMAND: [(f64, u32); 4] = [(0.4, 1), (0.7, 2), (0.9, 3), (1.0, 4)];

/// The largest seat demand a request can make.
pub const MAX_SEATS: u32 = 4;

pub(crate) fn seats_for(u: f64) -> u32 {
    SEAT_DEMAND
        .iter()
        .find(|&&(threshold, _)| u < threshold)
        .map_or(MAX_SEATS, |&(_, seats)| seats)
}

/// `count` vehicles of `capacity` seats each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct CapacityTier {
    pub count: usize,
    pub capacity: u32,
}

/// Conventional nodes receiving rejected requests, by seat demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct FeedbackTargets {
    /// Requests of up to 3 seats.
    pub small: NodeId,
    /// Requests of exactly 4 seats.
    pub medium: NodeId,
    /// Anything larger.
    pub large: NodeId,
}

impl FeedbackTargets {
    pub fn route(&self, seats: u32) -> NodeId {
        match seats {
            0..=3 => self.small,
            4 => self.medium,
            _ => self.large,
        }
    }
}

#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct RideSharingParams {
    #[builder(setter(into))]
    pub name: String,
    pub arrivals: Distribution,
    pub service: Distribution,
    /// Routing draws below this leave the system.
    #[builder(default = 0.0)]
    #[serde(default)]
    pub p_exit: f64,
    /// Routing draws in `[p_exit, p_feedback)` are fed back without queueing.
    #[builder(default = 0.0)]
    #[serde(default)]
    pub p_feedback: f64,
    #[builder(default = 1.0)]
    #[serde(default = "always")]
    pub p_match_busy: f64,
    #[builder(default = 1.0)]
    #[serde(default = "always")]
    pub p_match_idle: f64,
    pub time_window: f64,
    pub tiers: Vec<CapacityTier>,
}

fn always() -> f64 {
    1.0
}

impl RideSharingParams {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("p_exit", self.p_exit),
            ("p_feedback", self.p_feedback),
            ("p_match_busy", self.p_match_busy),
            ("p_match_idle", self.p_match_idle),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability {
                    node: self.name.clone(),
                    name,
                    value,
                });
            }
        }
        if self.p_feedback < self.p_exit {
            return Err(ConfigError::ThresholdOrder {
                node: self.name.clone(),
                p_exit: self.p_exit,
                p_feedback: self.p_feedback,
            });
        }
        if !self.time_window.is_finite() || self.time_window < 0.0 {
            return Err(ConfigError::InvalidWindow {
                node: self.name.clone(),
                window: self.time_window,
            });
        }
        if self.tiers.is_empty() {
            return Err(ConfigError::NoCapacityTiers(self.name.clone()));
        }
        for (tier, t) in self.tiers.iter().enumerate() {
            if t.count == 0 || t.capacity == 0 {
                return Err(ConfigError::MalformedTier {
                    node: self.name.clone(),
                    tier,
                    count: t.count,
                    capacity: t.capacity,
                });
            }
        }
        let max_capacity = self.tiers.iter().map(|t| t.capacity).max().unwrap_or(0);
        if max_capacity < MAX_SEATS {
            return Err(ConfigError::CapacityBelowDemand {
                node: self.name.clone(),
                max_capacity,
                max_seats: MAX_SEATS,
            });
        }
        self.arrivals.validate("arrival")?;
        self.service.validate("service")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RideSharingNode {
    id: NodeId,
    params: RideSharingParams,
    feedback: FeedbackTargets,
    streams: Streams,

    arrival: ArrivalEvent,
    slots: Vec<SlotEvent>,
    pending: PendingQ,
    deadline: Option<Time>,
    population: usize,

    integrator: Integrator,
    sums: Vec<Sum>,
}

impl RideSharingNode {
    pub fn new(
        id: NodeId,
        params: RideSharingParams,
        feedback: FeedbackTargets,
        streams: Streams,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        let slots: Vec<SlotEvent> = params
            .tiers
            .iter()
            .flat_map(|t| std::iter::repeat(SlotEvent::idle(t.capacity)).take(t.count))
            .collect();
        let sums = vec![Sum::default(); slots.len()];
        let mut node = Self {
            id,
            params,
            feedback,
            streams,
            arrival: ArrivalEvent {
                time: Time::INFINITY,
                seats: 1,
            },
            slots,
            pending: PendingQ::new(),
            deadline: None,
            population: 0,
            integrator: Integrator::default(),
            sums,
        };
        node.arm_arrival(Time::ZERO);
        Ok(node)
    }

    pub fn slots(&self) -> &[SlotEvent] {
        &self.slots
    }

    pub fn pending(&self) -> impl Iterator<Item = &Request> + '_ {
        self.pending.iter()
    }

    /// Deadline of the open matching window, if any.
    pub fn deadline(&self) -> Option<Time> {
        self.deadline
    }

    /// Busy units: the number of requests on board across all vehicles.
    pub fn busy(&self) -> usize {
        self.slots.iter().map(|s| s.bundled as usize).sum()
    }

    fn arm_arrival(&mut self, now: Time) {
        let gap = self.params.arrivals.sample(self.streams.get(Stream::Arrival));
        let seats = seats_for(self.streams.uniform(Stream::Seats));
        self.arrival = ArrivalEvent {
            time: now + gap,
            seats,
        };
    }

    fn feed_back(&mut self, ctx: &mut Context, req: Request) {
        assert!(self.population > 0, "feedback from an empty node");
        self.population -= 1;
        let target = self.feedback.route(req.seats);
        debug!(node = %self.id, %target, seats = req.seats, "feeding request back");
        ctx.feed_back(target, req.arrival);
    }

    fn arrive(&mut self, ctx: &mut Context) {
        let now = ctx.cur_time;
        let req = Request::new(now, self.arrival.seats);
        self.population += 1;
        self.arm_arrival(now);

        let p = self.streams.uniform(Stream::Routing);
        if p < self.params.p_exit {
            self.population -= 1;
            trace!(node = %self.id, "request left the system");
            return;
        }
        if p < self.params.p_feedback {
            self.feed_back(ctx, req);
            return;
        }

        if self.pending.is_empty() {
            debug_assert!(self.deadline.is_none());
            let deadline = now + Delta::new(self.params.time_window);
            debug!(node = %self.id, %deadline, "opening matching window");
            self.deadline = Some(deadline);
        }
        self.pending.enqueue(req);

        if self.deadline.is_some_and(|deadline| now >= deadline) {
            self.drain(ctx);
        }
    }

    /// Matches or feeds back every pending request, then closes the window.
    fn drain(&mut self, ctx: &mut Context) {
        let now = ctx.cur_time;
        let queued = self.pending.len();
        let mut matched = 0;
        let mut rejected = 0;
        loop {
            let n = self.find_one(now);
            if n > 0 {
                matched += n;
                continue;
            }
            match self.pending.dequeue() {
                Some(req) => {
                    rejected += 1;
                    self.feed_back(ctx, req);
                }
                None => break,
            }
        }
        debug_assert!(self.pending.is_empty());
        self.deadline = None;
        debug!(node = %self.id, time = %now, queued, matched, rejected, "matching window closed");
    }

    /// One matching round for the head of the queue. Returns the number of requests
    /// matched, zero if the queue is empty or no vehicle accepted the head.
    fn find_one(&mut self, now: Time) -> usize {
        let Some(&head) = self.pending.head() else {
            return 0;
        };

        if let Some(idx) = self.best_fit(head.seats, true) {
            self.pending.dequeue();
            self.assign(idx, head, now);
            return 1;
        }

        let Some(idx) = self.best_fit(head.seats, false) else {
            return 0;
        };
        let riders = self.pending.take_fitting(self.slots[idx].remaining);
        debug_assert_eq!(riders.first(), Some(&head));
        let n = riders.len();
        for req in riders {
            self.assign(idx, req, now);
        }
        n
    }

    /// Among slots in the given state with room for `seats`, each accepting with the
    /// matching probability for that state, picks the one with the most seats left.
    /// Ties go to the lowest index.
    fn best_fit(&mut self, seats: u32, busy: bool) -> Option<usize> {
        let (p, stream) = if busy {
            (self.params.p_match_busy, Stream::MatchBusy)
        } else {
            (self.params.p_match_idle, Stream::MatchIdle)
        };
        let mut best: Option<(usize, u32)> = None;
        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.active != busy || slot.remaining < seats {
                continue;
            }
            if self.streams.uniform(stream) >= p {
                continue;
            }
            if best.map_or(true, |(_, cap)| slot.remaining > cap) {
                best = Some((idx, slot.remaining));
            }
        }
        best.map(|(idx, _)| idx)
    }

    fn assign(&mut self, idx: usize, req: Request, now: Time) {
        let fresh = self.params.service.sample(self.streams.get(Stream::Service));
        self.slots[idx].board(now, req.seats, fresh);
        trace!(
            node = %self.id,
            slot = idx,
            seats = req.seats,
            bundled = self.slots[idx].bundled,
            completion = %self.slots[idx].time,
            "request assigned"
        );
    }

    fn depart(&mut self, idx: usize) {
        let slot = self.slots[idx];
        let bundled = slot.bundled as usize;
        assert!(
            self.population >= bundled,
            "vehicle carries {bundled} requests but only {} are in the node",
            self.population
        );
        self.population -= bundled;
        self.sums[idx].record(u64::from(slot.bundled), slot.service);
        self.slots[idx].release();
    }
}

impl Node for RideSharingNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.params.name
    }

    fn peek_next_event_time(&self) -> Time {
        self.slots
            .iter()
            .filter(|s| s.active)
            .map(|s| s.time)
            .fold(self.arrival.time, std::cmp::min)
    }

    fn peek_next_event_type(&self) -> Option<EventKind> {
        let mut best = (self.arrival.time, EventKind::Arrival);
        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.active && slot.time < best.0 {
                best = (slot.time, EventKind::Departure(SlotId::new(idx)));
            }
        }
        best.0.is_finite().then_some(best.1)
    }

    fn process_next_event(&mut self, mut ctx: Context) -> Outcome {
        let now = ctx.cur_time;
        let Some(kind) = self.peek_next_event_type() else {
            return ctx.finish(None);
        };
        self.integrator.clock = now;
        trace!(node = %self.id, time = %now, ?kind, population = self.population);
        match kind {
            EventKind::Departure(slot) => {
                self.depart(slot.into_usize());
                ctx.finish(Some(slot))
            }
            EventKind::Arrival => {
                self.arrive(&mut ctx);
                ctx.finish(None)
            }
            EventKind::External => unreachable!("ride-sharing nodes take no external arrivals"),
        }
    }

    fn integrate_to(&mut self, t: Time) {
        let busy = self.busy();
        self.integrator.integrate_to(t, self.population, busy);
    }

    fn area(&self) -> &Area {
        &self.integrator.area
    }

    fn server_statistics(&self) -> &[Sum] {
        &self.sums
    }

    fn population(&self) -> usize {
        self.population
    }

    fn reset_state(&mut self) {
        self.population = 0;
        self.integrator.reset();
        self.pending.clear();
        self.deadline = None;
        self.slots.iter_mut().for_each(SlotEvent::release);
        self.sums.iter_mut().for_each(Sum::reset);
        self.arm_arrival(Time::ZERO);
    }

    fn reset_statistics(&mut self) {
        self.integrator.area.reset();
        self.sums.iter_mut().for_each(Sum::reset);
    }
}
