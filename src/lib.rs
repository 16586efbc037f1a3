#[macro_use]
mod ident;

pub mod distribution;
pub mod driver;
pub mod error;
pub mod nodes;
pub mod random;
pub mod stats;
pub mod time;

pub(crate) mod data;
pub(crate) mod queue;
pub(crate) mod simulation;

pub use data::{Checkpoint, NodeMetrics, NodeSnapshot, Snapshot};
pub use driver::{
    build_network, read_config, run, Config, FeedbackNames, NodeConfig, RideSharingConfig,
};
pub use error::{ConfigError, Error};
pub use queue::Request;
pub use simulation::{
    event::{EventKind, Feedback, FeedbackList, Outcome},
    Context, Stop,
};
