//! Draw sources: where the monkey layer gets its uniform `[0, 1)` values
//!
//! Production uses the thread-local RNG. Tests inject a seeded generator or a
//! fixed sequence so behavior selection is reproducible.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Uniform random values in `[0, 1)`, shareable across concurrent requests
pub trait DrawSource: Send + Sync + fmt::Debug {
    fn draw(&self) -> f64;
}

/// Thread-local RNG; no shared state between request threads
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngDraws;

impl DrawSource for ThreadRngDraws {
    fn draw(&self) -> f64 {
        rand::thread_rng().r#gen::<f64>()
    }
}

/// Deterministic stream from a seed
#[derive(Debug)]
pub struct SeededDraws {
    rng: Mutex<SmallRng>,
}

impl SeededDraws {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }
}

impl DrawSource for SeededDraws {
    fn draw(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.r#gen::<f64>()
    }
}

/// Replays a fixed sequence, cycling when exhausted
#[derive(Debug)]
pub struct FixedDraws {
    draws: Vec<f64>,
    cursor: AtomicUsize,
}

impl FixedDraws {
    /// # Panics
    ///
    /// Panics if `draws` is empty.
    #[must_use]
    pub fn new(draws: Vec<f64>) -> Self {
        assert!(!draws.is_empty(), "FixedDraws needs at least one value");
        Self {
            draws,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Every draw is `value`
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl DrawSource for FixedDraws {
    fn draw(&self) -> f64 {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.draws[i % self.draws.len()]
    }
}
