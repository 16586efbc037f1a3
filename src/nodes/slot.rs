use crate::time::{Delta, Time};

// Below this much outstanding service a trip counts as finished
const EPSILON: f64 = 1e-6;

/// The next arrival of a node. It is always armed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrivalEvent {
    pub time: Time,
    /// Seats requested by this arrival.
    pub seats: u32,
}

/// A server slot: one server of a conventional node, or one vehicle of a
/// ride-sharing node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotEvent {
    /// Completion time. Meaningful only while `active`.
    pub time: Time,
    pub active: bool,
    pub capacity: u32,
    pub remaining: u32,
    /// Requests currently riding together.
    pub bundled: u32,
    /// Total seats taken by the bundled requests.
    pub seats_taken: u32,
    pub service: Delta,
    pub start: Time,
}

impl SlotEvent {
    pub fn idle(capacity: u32) -> Self {
        Self {
            time: Time::INFINITY,
            active: false,
            capacity,
            remaining: capacity,
            bundled: 0,
            seats_taken: 0,
            service: Delta::ZERO,
            start: Time::ZERO,
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.active
    }

    /// Starts a fresh trip at `now` lasting `service`.
    fn start_service(&mut self, now: Time, service: Delta) {
        self.start = now;
        self.service = service;
        self.time = now + service;
    }

    /// Puts a request of `seats` on this slot at `now`. `fresh` is the service time
    /// drawn for the newcomer.
    ///
    /// An empty slot starts a trip of exactly `fresh`. A trip that is still under way
    /// keeps its start time and has its service stretched to the elapsed time plus the
    /// running average of the old service and `fresh`, weighted by the requests
    /// already on board.
    pub(crate) fn board(&mut self, now: Time, seats: u32, fresh: Delta) {
        assert!(
            seats <= self.remaining,
            "{seats} seats assigned to a slot with {} left",
            self.remaining
        );
        if self.bundled == 0 {
            self.start_service(now, fresh);
        } else {
            let elapsed = now - self.start;
            let outstanding = self.service.saturating_sub(elapsed);
            if outstanding.into_f64() < EPSILON {
                self.start_service(now, fresh);
            } else {
                let k = f64::from(self.bundled);
                let blended = (self.service.into_f64() * k + fresh.into_f64()) / (k + 1.0);
                self.service = elapsed + Delta::new(blended);
                self.time = self.start + self.service;
            }
        }
        self.active = true;
        self.bundled += 1;
        self.remaining -= seats;
        self.seats_taken += seats;
    }

    /// Returns the slot to idle with its full capacity.
    pub(crate) fn release(&mut self) {
        *self = Self::idle(self.capacity);
    }
}
