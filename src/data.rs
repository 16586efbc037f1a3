use crate::{
    nodes::NodeId,
    stats::{Area, Sum},
    time::{Delta, Time},
};

/// What produced a snapshot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, derivative::Derivative, serde::Serialize, serde::Deserialize,
)]
#[derivative(Default)]
pub enum Checkpoint {
    /// The `k`-th periodic report. Cumulative since the start of the run.
    Report(usize),
    /// The `k`-th batch of a batch-means run. Covers only that batch.
    Batch(u64),
    /// End of a finite-horizon run.
    #[derivative(Default)]
    Final,
}

/// Statistics of one node at a checkpoint.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeSnapshot {
    pub node: NodeId,
    pub name: String,
    /// Jobs in the node when the snapshot was taken.
    pub population: usize,
    pub area: Area,
    pub servers: Vec<Sum>,
}

impl NodeSnapshot {
    /// Jobs served across all servers.
    pub fn served(&self) -> u64 {
        self.servers.iter().map(|s| s.served).sum()
    }

    pub fn busy_time(&self) -> Delta {
        self.servers.iter().map(|s| s.service).sum()
    }
}

/// The state of every node at a checkpoint. Statistics cover `[start, end]`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub replication: usize,
    pub checkpoint: Checkpoint,
    pub start: Time,
    pub end: Time,
    pub nodes: Vec<NodeSnapshot>,
}

impl Snapshot {
    pub fn elapsed(&self) -> Delta {
        self.end - self.start
    }

    /// Per-node means, skipping nodes with nothing to average over.
    pub fn metrics(&self) -> Vec<(NodeId, Option<NodeMetrics>)> {
        let elapsed = self.elapsed();
        self.nodes
            .iter()
            .map(|n| (n.node, NodeMetrics::from_snapshot(n, elapsed)))
            .collect()
    }
}

/// Long-run means of a node over an observation period.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeMetrics {
    /// E[Ts]
    pub response_time: f64,
    /// E[Tq]
    pub queue_time: f64,
    /// E[S]
    pub service_time: f64,
    /// E[N]
    pub population: f64,
    /// E[Nq]
    pub queue_population: f64,
    /// Utilization, per server.
    pub utilization: f64,
    /// Departures per unit time.
    pub throughput: f64,
}

impl NodeMetrics {
    /// Computes the means over `elapsed`. Returns `None` if the node served no jobs
    /// or no time has passed.
    pub fn from_snapshot(node: &NodeSnapshot, elapsed: Delta) -> Option<Self> {
        let served = node.served();
        let elapsed = elapsed.into_f64();
        if served == 0 || elapsed <= 0.0 || node.servers.is_empty() {
            return None;
        }
        let served = served as f64;
        let service_time = node.area.service / served;
        let throughput = served / elapsed;
        Some(Self {
            response_time: node.area.node / served,
            queue_time: node.area.queue / served,
            service_time,
            population: node.area.node / elapsed,
            queue_population: node.area.queue / elapsed,
            utilization: throughput * service_time / node.servers.len() as f64,
            throughput,
        })
    }
}
