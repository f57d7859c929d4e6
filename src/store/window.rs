//! Bounded rolling window of observations for one `(rank_group, duration_bucket)`.

use crate::domain::{Month, Observation};

/// Holds at most `capacity` observations; once full, every insert first
/// evicts the observation with the oldest month.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    capacity: usize,
    observations: Vec<Observation>,
}

impl Window {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            observations: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.observations.len() >= self.capacity
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.observations.iter().map(|o| o.value)
    }

    /// Index of the first observation with the minimal month.
    fn oldest_index(&self) -> Option<usize> {
        let mut best: Option<(usize, Month)> = None;
        for (i, o) in self.observations.iter().enumerate() {
            match best {
                Some((_, m)) if o.month >= m => {}
                _ => best = Some((i, o.month)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Insert `obs`, returning the evicted observation if the window was full.
    pub fn insert(&mut self, obs: Observation) -> Option<Observation> {
        let evicted = if self.is_full() {
            // Linear scan is fine at these sizes (capacity ~20).
            self.oldest_index().map(|i| self.observations.remove(i))
        } else {
            None
        };
        self.observations.push(obs);
        evicted
    }
}
