pub(crate) mod event;
pub(crate) mod schedule;

use tracing::{debug, info, trace, warn};

use crate::{
    data::{Checkpoint, Snapshot},
    nodes::{NodeId, Station},
    time::{Delta, Time},
};

use self::event::{Feedback, FeedbackList, Outcome};

/// When a run ends.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stop {
    /// Finite horizon: stop once the next event lies beyond `time`.
    Horizon { time: f64 },
    /// Batch means: stop after `num_batches` batches of `batch_size` departures.
    Batches { batch_size: u64, num_batches: u64 },
}

#[derive(Debug, typed_builder::TypedBuilder)]
pub(crate) struct Simulation {
    // Run-time
    #[builder(default, setter(skip))]
    cur_time: Time,
    #[builder(default, setter(skip))]
    snapshots: Vec<Snapshot>,

    // Stations, indexed by `NodeId`
    nodes: Vec<Station>,

    // Checkpoints
    stop: Stop,
    #[builder(default)]
    report_interval: Option<Delta>,
    #[builder(default)]
    replication: usize,

    // Batch bookkeeping
    #[builder(default, setter(skip))]
    departures: u64,
    #[builder(default, setter(skip))]
    batches: u64,
    #[builder(default, setter(skip))]
    batch_start: Time,
    #[builder(default, setter(skip))]
    reports: usize,
}

impl Simulation {
    pub(crate) fn run(mut self) -> Vec<Snapshot> {
        info!(
            replication = self.replication,
            nodes = self.nodes.len(),
            stop = ?self.stop,
            "starting run"
        );
        let mut next_report = self.report_interval.map(Delta::into_time);
        loop {
            if let Stop::Batches { num_batches, .. } = self.stop {
                if self.batches >= num_batches {
                    break;
                }
            }
            let (idx, tmin) = self.next_event();

            // Report checkpoints never displace an event
            if let (Some(report), Some(interval)) = (next_report, self.report_interval) {
                if report <= tmin && self.report_due(report, tmin) {
                    self.report(report);
                    next_report = Some(report + interval);
                    continue;
                }
            }

            match self.stop {
                Stop::Horizon { time } => {
                    if tmin > Time::new(time) {
                        self.close_horizon(Time::new(time));
                        break;
                    }
                }
                Stop::Batches { .. } => {
                    if !tmin.is_finite() {
                        warn!(time = %self.cur_time, "no pending events, ending batch run early");
                        break;
                    }
                }
            }

            self.step(idx, tmin);
        }
        info!(
            replication = self.replication,
            time = %self.cur_time,
            snapshots = self.snapshots.len(),
            "run finished"
        );
        self.snapshots
    }

    /// The node holding the globally earliest event. Ties go to the lowest index.
    fn next_event(&self) -> (usize, Time) {
        let mut best = (0, Time::INFINITY);
        for (idx, station) in self.nodes.iter().enumerate() {
            let t = station.node().peek_next_event_time();
            if t < best.1 {
                best = (idx, t);
            }
        }
        best
    }

    fn report_due(&self, report: Time, tmin: Time) -> bool {
        match self.stop {
            Stop::Horizon { time } => report <= Time::new(time),
            // A stalled batch run has no next event to report against
            Stop::Batches { .. } => tmin.is_finite(),
        }
    }

    fn step(&mut self, idx: usize, time: Time) {
        assert!(self.cur_time <= time, "time went backwards: {} > {time}", self.cur_time);
        self.advance(time);

        let ctx = Context::new(time);
        let outcome = self.nodes[idx].node_mut().process_next_event(ctx);
        trace!(node = idx, %time, departed = ?outcome.departed, feedback = outcome.feedback.len());
        let departed = outcome.is_departure();
        self.deliver(outcome.feedback);

        if departed {
            self.departures += 1;
            if let Stop::Batches { batch_size, .. } = self.stop {
                if self.departures >= batch_size {
                    self.close_batch();
                }
            }
        }
    }

    fn advance(&mut self, time: Time) {
        for station in self.nodes.iter_mut() {
            station.node_mut().integrate_to(time);
        }
        self.cur_time = time;
    }

    fn deliver(&mut self, feedback: FeedbackList) {
        for Feedback { target, time } in feedback {
            self.nodes[target.into_usize()]
                .as_conventional_mut()
                .expect("feedback targets are validated when the network is built")
                .generate_arrival(time);
        }
    }

    fn snapshot(&self, checkpoint: Checkpoint, start: Time) -> Snapshot {
        Snapshot {
            replication: self.replication,
            checkpoint,
            start,
            end: self.cur_time,
            nodes: self.nodes.iter().map(|s| s.node().snapshot()).collect(),
        }
    }

    fn report(&mut self, time: Time) {
        self.advance(time);
        self.reports += 1;
        debug!(report = self.reports, %time, "report checkpoint");
        // Statistics run from the last batch boundary, or the start of the run
        let snapshot = self.snapshot(Checkpoint::Report(self.reports), self.batch_start);
        self.snapshots.push(snapshot);
    }

    fn close_batch(&mut self) {
        self.batches += 1;
        debug!(batch = self.batches, time = %self.cur_time, "batch complete");
        let snapshot = self.snapshot(Checkpoint::Batch(self.batches), self.batch_start);
        self.snapshots.push(snapshot);
        for station in self.nodes.iter_mut() {
            station.node_mut().reset_statistics();
        }
        self.departures = 0;
        self.batch_start = self.cur_time;
    }

    fn close_horizon(&mut self, horizon: Time) {
        self.advance(horizon);
        let snapshot = self.snapshot(Checkpoint::Final, Time::ZERO);
        self.snapshots.push(snapshot);
    }
}

/// Per-event handle passed to a node. Collects the feedback the node emits while
/// processing.
#[derive(Debug)]
pub struct Context {
    pub cur_time: Time,
    feedback: FeedbackList,
}

impl Context {
    pub fn new(cur_time: Time) -> Self {
        Self {
            cur_time,
            feedback: FeedbackList::new(),
        }
    }

    pub(crate) fn feed_back(&mut self, target: NodeId, time: Time) {
        self.feedback.push(Feedback::new(target, time));
    }

    pub(crate) fn finish(self, departed: Option<crate::nodes::SlotId>) -> Outcome {
        Outcome {
            departed,
            feedback: self.feedback,
        }
    }
}
