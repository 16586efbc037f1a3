use tracing::trace;

use crate::{
    distribution::Distribution,
    error::ConfigError,
    random::{Stream, Streams},
    simulation::{
        event::{EventKind, Outcome},
        schedule::Schedule,
        Context,
    },
    stats::{Area, Integrator, Sum},
    time::Time,
};

use super::{ArrivalEvent, Node, NodeId, SlotEvent, SlotId};

/// Parameters of a conventional multi-server FIFO node.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct SimpleParams {
    #[builder(setter(into))]
    pub name: String,
    pub servers: usize,
    pub arrivals: Distribution,
    pub service: Distribution,
}

impl SimpleParams {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.servers == 0 {
            return Err(ConfigError::NoServers(self.name.clone()));
        }
        self.arrivals.validate("arrival")?;
        self.service.validate("service")?;
        Ok(())
    }
}

/// A classic multi-server queue. Jobs wait in FIFO order for the first free
/// server. Besides its own arrival process it accepts arrivals handed over by
/// other nodes through [`SimpleNode::generate_arrival`].
#[derive(Debug, Clone)]
pub struct SimpleNode {
    id: NodeId,
    params: SimpleParams,
    streams: Streams,

    arrival: ArrivalEvent,
    external: Schedule,
    slots: Vec<SlotEvent>,
    population: usize,

    integrator: Integrator,
    sums: Vec<Sum>,
}

impl SimpleNode {
    pub fn new(id: NodeId, params: SimpleParams, streams: Streams) -> Result<Self, ConfigError> {
        params.validate()?;
        let servers = params.servers;
        let mut node = Self {
            id,
            params,
            streams,
            arrival: ArrivalEvent {
                time: Time::INFINITY,
                seats: 1,
            },
            external: Schedule::default(),
            slots: vec![SlotEvent::idle(1); servers],
            population: 0,
            integrator: Integrator::default(),
            sums: vec![Sum::default(); servers],
        };
        node.arm_arrival(Time::ZERO);
        Ok(node)
    }

    /// Accepts a job handed over by another node. The job arrives at `time`, or at
    /// the node's clock if `time` already lies in the past.
    pub fn generate_arrival(&mut self, time: Time) {
        let time = std::cmp::max(time, self.integrator.clock);
        self.external.push(time);
    }

    pub fn slots(&self) -> &[SlotEvent] {
        &self.slots
    }

    pub fn waiting(&self) -> usize {
        self.population.saturating_sub(self.busy())
    }

    fn busy(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    fn arm_arrival(&mut self, now: Time) {
        let gap = self.params.arrivals.sample(self.streams.get(Stream::Arrival));
        self.arrival = ArrivalEvent {
            time: now + gap,
            seats: 1,
        };
    }

    fn start_service(&mut self, idx: usize, now: Time) {
        let service = self.params.service.sample(self.streams.get(Stream::Service));
        self.slots[idx].board(now, 1, service);
    }

    fn admit(&mut self, now: Time) {
        self.population += 1;
        if let Some(idx) = self.slots.iter().position(SlotEvent::is_idle) {
            self.start_service(idx, now);
        }
    }

    fn depart(&mut self, idx: usize, now: Time) {
        let slot = self.slots[idx];
        assert!(self.population > 0, "departure from an empty node");
        self.sums[idx].record(1, slot.service);
        self.population -= 1;
        self.slots[idx].release();
        if self.population > self.busy() {
            self.start_service(idx, now);
        }
    }
}

impl Node for SimpleNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.params.name
    }

    fn peek_next_event_time(&self) -> Time {
        let slots = self.slots.iter().filter(|s| s.active).map(|s| s.time);
        let external = self.external.peek().unwrap_or(Time::INFINITY);
        slots.fold(std::cmp::min(self.arrival.time, external), std::cmp::min)
    }

    fn peek_next_event_type(&self) -> Option<EventKind> {
        let mut best = (self.arrival.time, EventKind::Arrival);
        if let Some(t) = self.external.peek() {
            if t < best.0 {
                best = (t, EventKind::External);
            }
        }
        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.active && slot.time < best.0 {
                best = (slot.time, EventKind::Departure(SlotId::new(idx)));
            }
        }
        best.0.is_finite().then_some(best.1)
    }

    fn process_next_event(&mut self, ctx: Context) -> Outcome {
        let now = ctx.cur_time;
        let Some(kind) = self.peek_next_event_type() else {
            return ctx.finish(None);
        };
        self.integrator.clock = now;
        trace!(node = %self.id, time = %now, ?kind, population = self.population);
        match kind {
            EventKind::Arrival => {
                self.arm_arrival(now);
                self.admit(now);
                ctx.finish(None)
            }
            EventKind::External => {
                self.external.pop();
                self.admit(now);
                ctx.finish(None)
            }
            EventKind::Departure(slot) => {
                self.depart(slot.into_usize(), now);
                ctx.finish(Some(slot))
            }
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
        self.external.clear();
        self.slots.iter_mut().for_each(SlotEvent::release);
        self.sums.iter_mut().for_each(Sum::reset);
        self.arm_arrival(Time::ZERO);
    }

    fn reset_statistics(&mut self) {
        self.integrator.area.reset();
        self.sums.iter_mut().for_each(Sum::reset);
    }
}
