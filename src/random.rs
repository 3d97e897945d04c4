//! Injectable sources of uniform samples in `[0, 1)`

use rand::RngExt;
use std::sync::{Arc, Mutex};

pub trait RandomSource {
    /// Next sample, uniformly distributed in `[0, 1)`
    fn sample(&mut self) -> f64;
}

/// A source shared between request handlers
pub type SharedRandom = Arc<Mutex<dyn RandomSource + Send>>;

pub fn shared(source: impl RandomSource + Send + 'static) -> SharedRandom {
    Arc::new(Mutex::new(source))
}

/// Thread-local RNG from `rand`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn sample(&mut self) -> f64 {
        rand::rng().random_range(0.0..1.0)
    }
}

/// Always returns the same value
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub f64);

impl RandomSource for FixedSource {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// Cycles through a fixed list of samples
#[derive(Debug, Clone)]
pub struct SequenceSource {
    values: Vec<f64>,
    next: usize,
}

impl SequenceSource {
    /// # Panics
    /// Panics if `values` is empty.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "SequenceSource needs at least one value");
        Self { values, next: 0 }
    }
}

impl RandomSource for SequenceSource {
    fn sample(&mut self) -> f64 {
        let value = self.values[self.next];
        self.next = (self.next + 1) % self.values.len();
        value
    }
}

impl<F: FnMut() -> f64> RandomSource for F {
    fn sample(&mut self) -> f64 {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_random_in_unit_interval() {
        let mut source = ThreadRandom;
        for _ in 0..1000 {
            let v = source.sample();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_sequence_cycles() {
        let mut source = SequenceSource::new(vec![0.1, 0.9]);
        assert_eq!(source.sample(), 0.1);
        assert_eq!(source.sample(), 0.9);
        assert_eq!(source.sample(), 0.1);
    }

    #[test]
    fn test_closure_source() {
        let mut calls = 0;
        let mut source = || {
            calls += 1;
            0.25
        };
        assert_eq!(source.sample(), 0.25);
        assert_eq!(RandomSource::sample(&mut source), 0.25);
        drop(source);
        assert_eq!(calls, 2);
    }
}
