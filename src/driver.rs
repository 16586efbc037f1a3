use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::info;

use crate::{
    data::Snapshot,
    error::{ConfigError, Error},
    nodes::{
        FeedbackTargets, NodeId, RideSharingNode, RideSharingParams, SimpleNode, SimpleParams,
        Station,
    },
    random::Streams,
    simulation::{Simulation, Stop},
    time::Delta,
};

/// A network description plus how to run it.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub seed: u64,
    /// Stations in index order. Ties between simultaneous events go to the
    /// earlier station.
    pub nodes: Vec<NodeConfig>,
    pub stop: Stop,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub report_interval: Option<f64>,
    /// Independent replications of a finite-horizon run.
    #[builder(default = 1)]
    #[serde(default = "one")]
    pub replications: usize,
}

fn one() -> usize {
    1
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeConfig {
    Simple(SimpleParams),
    RideSharing(RideSharingConfig),
}

impl NodeConfig {
    pub fn name(&self) -> &str {
        match self {
            NodeConfig::Simple(p) => &p.name,
            NodeConfig::RideSharing(c) => &c.params.name,
        }
    }
}

#[derive(Debug, Clone, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct RideSharingConfig {
    #[serde(flatten)]
    pub params: RideSharingParams,
    pub feedback: FeedbackNames,
}

/// Feedback targets by node name.
#[derive(Debug, Clone, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct FeedbackNames {
    pub small: String,
    pub medium: String,
    pub large: String,
}

/// Runs every replication of a finite-horizon config, or the single run of a
/// batch-means config, and returns all snapshots in order.
pub fn run(cfg: &Config) -> Result<Vec<Snapshot>, Error> {
    validate(cfg)?;
    let runs = match cfg.stop {
        Stop::Horizon { .. } => cfg.replications,
        Stop::Batches { .. } => 1,
    };
    let mut snapshots = Vec::new();
    for replication in 1..=runs {
        let seed = match cfg.stop {
            Stop::Horizon { .. } => cfg.seed.wrapping_add(replication as u64),
            Stop::Batches { .. } => cfg.seed,
        };
        info!(replication, seed, "building network");
        let nodes = build_network(cfg, seed)?;
        let sim = Simulation::builder()
            .nodes(nodes)
            .stop(cfg.stop)
            .report_interval(cfg.report_interval.map(Delta::new))
            .replication(replication)
            .build();
        snapshots.extend(sim.run());
    }
    Ok(snapshots)
}

/// Validates `cfg` and builds its stations, seeding every random stream from
/// `seed`.
pub fn build_network(cfg: &Config, seed: u64) -> Result<Vec<Station>, Error> {
    validate(cfg)?;

    let mut index = FxHashMap::default();
    for (idx, node) in cfg.nodes.iter().enumerate() {
        if index.insert(node.name(), idx).is_some() {
            return Err(ConfigError::DuplicateNode(node.name().to_owned()).into());
        }
    }

    let resolve = |node: &str, target: &str| -> Result<NodeId, ConfigError> {
        let &idx = index.get(target).ok_or_else(|| ConfigError::UnknownTarget {
            node: node.to_owned(),
            target: target.to_owned(),
        })?;
        match cfg.nodes[idx] {
            NodeConfig::Simple(_) => Ok(NodeId::new(idx)),
            NodeConfig::RideSharing(_) => Err(ConfigError::NotConventional {
                node: node.to_owned(),
                target: target.to_owned(),
            }),
        }
    };

    let stations = cfg
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            let id = NodeId::new(idx);
            let streams = Streams::new(seed, id);
            let station: Station = match node {
                NodeConfig::Simple(params) => SimpleNode::new(id, params.clone(), streams)?.into(),
                NodeConfig::RideSharing(c) => {
                    let name = c.params.name.as_str();
                    let targets = FeedbackTargets::new(
                        resolve(name, &c.feedback.small)?,
                        resolve(name, &c.feedback.medium)?,
                        resolve(name, &c.feedback.large)?,
                    );
                    RideSharingNode::new(id, c.params.clone(), targets, streams)?.into()
                }
            };
            Ok(station)
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    Ok(stations)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.nodes.is_empty() {
        return Err(ConfigError::NoNodes);
    }
    match cfg.stop {
        Stop::Horizon { time } if !time.is_finite() || time <= 0.0 => {
            return Err(ConfigError::InvalidStop("horizon must be finite and positive"));
        }
        Stop::Batches { batch_size: 0, .. } => {
            return Err(ConfigError::InvalidStop("batch size must be positive"));
        }
        Stop::Batches { num_batches: 0, .. } => {
            return Err(ConfigError::InvalidStop("at least one batch is required"));
        }
        _ => {}
    }
    if let Some(interval) = cfg.report_interval {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(ConfigError::InvalidReportInterval(interval));
        }
    }
    if cfg.replications == 0 {
        return Err(ConfigError::NoReplications);
    }
    Ok(())
}

pub fn read_config(path: impl AsRef<Path>) -> Result<Config, Error> {
    let s = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&s)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        distribution::Distribution,
        nodes::CapacityTier,
    };

    fn simple(name: &str) -> NodeConfig {
        NodeConfig::Simple(
            SimpleParams::builder()
                .name(name)
                .servers(2)
                .arrivals(Distribution::Exponential { mean: 2.0 })
                .service(Distribution::Exponential { mean: 1.0 })
                .build(),
        )
    }

    fn pool(small: &str, medium: &str, large: &str) -> NodeConfig {
        let params = RideSharingParams::builder()
            .name("pool")
            .arrivals(Distribution::Exponential { mean: 0.5 })
            .service(Distribution::Exponential { mean: 4.0 })
            .p_exit(0.05)
            .p_feedback(0.1)
            .time_window(1.0)
            .tiers(vec![CapacityTier::new(3, 3), CapacityTier::new(3, 4)])
            .build();
        NodeConfig::RideSharing(RideSharingConfig::new(
            params,
            FeedbackNames::new(small.to_owned(), medium.to_owned(), large.to_owned()),
        ))
    }

    fn config(nodes: Vec<NodeConfig>) -> Config {
        Config::builder()
            .seed(7)
            .nodes(nodes)
            .stop(Stop::Horizon { time: 100.0 })
            .build()
    }

    #[test]
    fn builds_in_declaration_order() {
        let cfg = config(vec![pool("a", "b", "b"), simple("a"), simple("b")]);
        let nodes = build_network(&cfg, 1).expect("valid config");
        assert_eq!(nodes.len(), 3);
        assert!(!nodes[0].is_conventional());
        assert!(nodes[1].is_conventional());
        assert_eq!(nodes[2].node().id(), NodeId::new(2));
        assert_eq!(nodes[2].node().name(), "b");
    }

    #[test]
    fn rejects_unknown_target() {
        let cfg = config(vec![pool("a", "b", "nowhere"), simple("a"), simple("b")]);
        let err = build_network(&cfg, 1).expect_err("unknown target");
        assert!(matches!(
            err,
            Error::Config(ConfigError::UnknownTarget { ref target, .. }) if target == "nowhere"
        ));
    }

    #[test]
    fn rejects_ride_sharing_target() {
        let cfg = config(vec![pool("pool", "a", "a"), simple("a")]);
        let err = build_network(&cfg, 1).expect_err("not conventional");
        assert!(matches!(err, Error::Config(ConfigError::NotConventional { .. })));
    }

    #[test]
    fn rejects_duplicate_names() {
        let cfg = config(vec![simple("a"), simple("a")]);
        let err = build_network(&cfg, 1).expect_err("duplicate");
        assert!(matches!(err, Error::Config(ConfigError::DuplicateNode(ref n)) if n == "a"));
    }

    #[test]
    fn rejects_bad_run_parameters() {
        let mut cfg = config(vec![simple("a")]);
        cfg.stop = Stop::Batches {
            batch_size: 0,
            num_batches: 3,
        };
        assert!(matches!(
            run(&cfg),
            Err(Error::Config(ConfigError::InvalidStop(_)))
        ));

        let mut cfg = config(vec![simple("a")]);
        cfg.report_interval = Some(0.0);
        assert!(matches!(
            run(&cfg),
            Err(Error::Config(ConfigError::InvalidReportInterval(_)))
        ));

        let mut cfg = config(vec![simple("a")]);
        cfg.replications = 0;
        assert!(matches!(run(&cfg), Err(Error::Config(ConfigError::NoReplications))));

        let cfg = config(vec![]);
        assert!(matches!(run(&cfg), Err(Error::Config(ConfigError::NoNodes))));
    }

    #[test]
    fn replications_are_tagged_and_independent() {
        let mut cfg = config(vec![pool("a", "b", "b"), simple("a"), simple("b")]);
        cfg.replications = 3;
        let snapshots = run(&cfg).expect("valid config");
        let tags: Vec<usize> = snapshots.iter().map(|s| s.replication).collect();
        assert_eq!(tags, vec![1, 2, 3]);
        assert_ne!(snapshots[0].nodes, snapshots[1].nodes);
    }

    #[test]
    fn parses_json_config() {
        let json = r#"{
            "seed": 42,
            "stop": { "kind": "horizon", "time": 500.0 },
            "report_interval": 50.0,
            "nodes": [
                {
                    "type": "ride_sharing",
                    "name": "pool",
                    "arrivals": { "kind": "exponential", "mean": 0.5 },
                    "service": { "kind": "uniform", "low": 2.0, "high": 6.0 },
                    "p_exit": 0.1,
                    "p_feedback": 0.2,
                    "p_match_busy": 0.6,
                    "p_match_idle": 0.9,
                    "time_window": 2.0,
                    "tiers": [
                        { "count": 10, "capacity": 3 },
                        { "count": 5, "capacity": 4 },
                        { "count": 2, "capacity": 8 }
                    ],
                    "feedback": { "small": "taxi", "medium": "van", "large": "van" }
                },
                {
                    "type": "simple",
                    "name": "taxi",
                    "servers": 20,
                    "arrivals": { "kind": "exponential", "mean": 1.0 },
                    "service": { "kind": "exponential", "mean": 12.0 }
                },
                {
                    "type": "simple",
                    "name": "van",
                    "servers": 5,
                    "arrivals": { "kind": "deterministic", "value": 30.0 },
                    "service": { "kind": "exponential", "mean": 15.0 }
                }
            ]
        }"#;
        let cfg: Config = serde_json::from_str(json).expect("valid json");
        assert_eq!(cfg.replications, 1);
        assert_eq!(cfg.report_interval, Some(50.0));
        let NodeConfig::RideSharing(ref pool) = cfg.nodes[0] else {
            panic!("first node is the pool");
        };
        assert_eq!(pool.params.tiers.len(), 3);
        assert_eq!(pool.params.p_match_busy, 0.6);
        assert_eq!(pool.feedback.medium, "van");
        let nodes = build_network(&cfg, cfg.seed).expect("valid config");
        assert_eq!(nodes.len(), 3);
    }
}
