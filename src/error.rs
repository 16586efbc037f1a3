use crate::distribution::Distribution;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    #[error("serde error")]
    Serde(#[from] serde_json::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

/// Rejected configurations. All of these are fatal at startup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("the network has no nodes")]
    NoNodes,

    #[error("node `{0}` is declared more than once")]
    DuplicateNode(String),

    #[error("node `{0}` has no servers")]
    NoServers(String),

    #[error("node `{node}`: {name} = {value} is not a probability")]
    InvalidProbability {
        node: String,
        name: &'static str,
        value: f64,
    },

    #[error("node `{node}`: feedback threshold {p_feedback} is below exit threshold {p_exit}")]
    ThresholdOrder {
        node: String,
        p_exit: f64,
        p_feedback: f64,
    },

    #[error("node `{0}` has no capacity tiers")]
    NoCapacityTiers(String),

    #[error("node `{node}`: capacity tier {tier} is malformed (count {count}, capacity {capacity})")]
    MalformedTier {
        node: String,
        tier: usize,
        count: usize,
        capacity: u32,
    },

    #[error("node `{node}`: largest vehicle seats {max_capacity}, but requests may need {max_seats}")]
    CapacityBelowDemand {
        node: String,
        max_capacity: u32,
        max_seats: u32,
    },

    #[error("node `{node}`: matching window {window} must be finite and non-negative")]
    InvalidWindow { node: String, window: f64 },

    #[error("invalid {what} distribution {distribution:?}")]
    InvalidDistribution {
        what: &'static str,
        distribution: Distribution,
    },

    #[error("node `{node}` routes feedback to unknown node `{target}`")]
    UnknownTarget { node: String, target: String },

    #[error("node `{node}` routes feedback to `{target}`, which is not a conventional node")]
    NotConventional { node: String, target: String },

    #[error("invalid stopping condition: {0}")]
    InvalidStop(&'static str),

    #[error("report interval {0} must be finite and positive")]
    InvalidReportInterval(f64),

    #[error("at least one replication is required")]
    NoReplications,
}
