//! Independent random streams.
//!
//! Every node owns one generator per decision category. All generators of a
//! replication share the same seed and are separated by ChaCha stream id, so
//! drawing from one category never shifts the sequence seen by another.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::nodes::NodeId;

/// A decision category with its own random stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Arrival = 0,
    Service = 1,
    Routing = 2,
    Seats = 3,
    MatchBusy = 4,
    MatchIdle = 5,
}

impl Stream {
    pub const COUNT: usize = 6;

    const ALL: [Stream; Stream::COUNT] = [
        Stream::Arrival,
        Stream::Service,
        Stream::Routing,
        Stream::Seats,
        Stream::MatchBusy,
        Stream::MatchIdle,
    ];
}

#[derive(Debug, Clone)]
pub struct Streams {
    rngs: [ChaCha8Rng; Stream::COUNT],
}

impl Streams {
    pub fn new(seed: u64, node: NodeId) -> Self {
        let rngs = Stream::ALL.map(|stream| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(node.into_u64() * Stream::COUNT as u64 + stream as u64);
            rng
        });
        Self { rngs }
    }

    pub fn get(&mut self, stream: Stream) -> &mut ChaCha8Rng {
        &mut self.rngs[stream as usize]
    }

    /// Draws a uniform value in `[0, 1)` from `stream`.
    pub fn uniform(&mut self, stream: Stream) -> f64 {
        self.get(stream).gen::<f64>()
    }
}
