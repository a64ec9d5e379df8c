// Bounded, chronologically ordered sample window

use serde::{Serialize, Serializer};
use std::collections::VecDeque;

use crate::core::format::Sample;

/// Rolling buffer holding the most recent `capacity` samples of one signal.
///
/// Samples are appended at the back and evicted from the front, so the window
/// is always in insertion order and never longer than its capacity.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be at least 1");
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Appends `sample` and trims from the front back down to capacity.
    /// Returns the evicted samples, oldest first.
    pub fn push(&mut self, sample: Sample) -> Vec<Sample> {
        self.samples.push_back(sample);
        let mut evicted = Vec::new();
        while self.samples.len() > self.capacity {
            if let Some(old) = self.samples.pop_front() {
                evicted.push(old);
            }
        }
        evicted
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }
}

impl Serialize for SampleWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.samples.iter())
    }
}
