// Value generators behind each signal

use rand::rngs::StdRng;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::format::Distribution;

/// Produces the next value for a signal on each tick.
pub trait SampleSource: Send {
    fn next_value(&mut self, rng: &mut StdRng) -> f64;
}

/// Uniform in `[low, high)`. Bounds are checked when the config is validated.
#[derive(Debug, Clone, Copy)]
pub struct UniformSource {
    low: f64,
    high: f64,
}

impl UniformSource {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

impl SampleSource for UniformSource {
    fn next_value(&mut self, rng: &mut StdRng) -> f64 {
        rng.gen_range(self.low..self.high)
    }
}

#[derive(Debug, Default)]
struct FeedState {
    pending: VecDeque<f64>,
    last: f64,
}

/// Source fed from outside the stream. Each tick takes the oldest pushed
/// value, or repeats the previous one when nothing new has arrived.
#[derive(Debug, Clone, Default)]
pub struct ExternalSource {
    state: Arc<Mutex<FeedState>>,
}

impl ExternalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(&self) -> FeedSender {
        FeedSender {
            state: self.state.clone(),
        }
    }
}

impl SampleSource for ExternalSource {
    fn next_value(&mut self, _rng: &mut StdRng) -> f64 {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = state.pending.pop_front() {
            state.last = value;
        }
        state.last
    }
}

/// Producer side of an [`ExternalSource`].
#[derive(Debug, Clone)]
pub struct FeedSender {
    state: Arc<Mutex<FeedState>>,
}

impl FeedSender {
    pub fn push(&self, value: f64) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .push_back(value);
    }

    /// Values pushed but not yet taken by a tick.
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }
}

/// Builds the source for a distribution. External sources also hand back
/// their feed.
pub fn source_for(distribution: Distribution) -> (Box<dyn SampleSource>, Option<FeedSender>) {
    match distribution {
        Distribution::Uniform { low, high } => (Box::new(UniformSource::new(low, high)), None),
        Distribution::External => {
            let source = ExternalSource::new();
            let sender = source.sender();
            (Box::new(source), Some(sender))
        }
    }
}
