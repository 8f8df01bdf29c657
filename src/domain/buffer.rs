// Rolling buffer backing the live chart
use super::telemetry::TelemetrySample;
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 120;

/// The most recent `capacity` samples in arrival order, oldest first.
///
/// The buffer never sorts; it trusts that producers append in timestamp order.
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    capacity: usize,
    samples: VecDeque<TelemetrySample>,
}

impl RollingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Append one sample, evicting from the front once over capacity.
    pub fn append(&mut self, sample: TelemetrySample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn extend<I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = TelemetrySample>,
    {
        for sample in samples {
            self.append(sample);
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TelemetrySample> {
        self.samples.iter()
    }

    pub fn to_vec(&self) -> Vec<TelemetrySample> {
        let mut samples = Vec::with_capacity(self.len());
        samples.extend(self.iter().cloned());
        samples
    }
}

impl Default for RollingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
