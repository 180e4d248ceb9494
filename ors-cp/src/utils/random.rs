#[cfg(test)]
#[path = "../../tests/unit/utils/random_test.rs"]
mod random_test;

use rand::prelude::*;
use std::cell::RefCell;

/// Provides the way to use randomized values in a generic way.
pub trait Random: Send + Sync {
    /// Produces an integral random value, uniformly distributed on the closed
    /// interval `[min, max]`.
    fn uniform_int(&self, min: i64, max: i64) -> i64;

    /// Produces a real random value, uniformly distributed on `[min, max)`.
    fn uniform_real(&self, min: f64, max: f64) -> f64;

    /// Tests a probability value in the `[0., 1.]` range.
    fn is_hit(&self, probability: f64) -> bool;
}

thread_local! {
    /// Random generator seeded from thread_rng to make runs non-repeatable.
    static RANDOMIZED_RNG: RefCell<SmallRng> =
        RefCell::new(SmallRng::from_rng(thread_rng()).expect("cannot get RNG from thread rng"));

    /// Random generator seeded with 0 to make runs repeatable.
    static REPEATABLE_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::seed_from_u64(0));
}

/// A default random implementation. The repeatable flavor shares one fixed
/// seed per thread, which is what the tests rely on.
#[derive(Clone, Copy, Debug)]
pub struct DefaultRandom {
    use_repeatable: bool,
}

impl DefaultRandom {
    /// Creates an instance with a randomized seed.
    pub fn new_randomized() -> Self {
        Self { use_repeatable: false }
    }

    /// Creates an instance with a fixed seed.
    pub fn new_repeatable() -> Self {
        Self { use_repeatable: true }
    }

    fn with_rng<R>(&self, action: impl FnOnce(&mut SmallRng) -> R) -> R {
        if self.use_repeatable {
            REPEATABLE_RNG.with(|rng| action(&mut rng.borrow_mut()))
        } else {
            RANDOMIZED_RNG.with(|rng| action(&mut rng.borrow_mut()))
        }
    }
}

impl Default for DefaultRandom {
    fn default() -> Self {
        Self::new_randomized()
    }
}

impl Random for DefaultRandom {
    fn uniform_int(&self, min: i64, max: i64) -> i64 {
        if min == max {
            return min;
        }
        assert!(min < max);
        self.with_rng(|rng| rng.gen_range(min..=max))
    }

    fn uniform_real(&self, min: f64, max: f64) -> f64 {
        if (min - max).abs() < f64::EPSILON {
            return min;
        }
        assert!(min < max);
        self.with_rng(|rng| rng.gen_range(min..max))
    }

    fn is_hit(&self, probability: f64) -> bool {
        self.with_rng(|rng| rng.gen_bool(probability.clamp(0., 1.)))
    }
}
