use rand::Rng;

/// Injected randomness capability
///
/// Sampling, the backlink/forward-link coin flip, and the candidate shuffle
/// all draw from this trait rather than an ambient generator, so tests can
/// supply a seeded source and pin outcomes.
pub trait RandomSource: Send + Sync {
    /// Uniform float in `[0, 1)`.
    fn next_f64(&self) -> f64;

    /// Uniform index in `[0, n)`. `n` must be nonzero.
    fn pick(&self, n: usize) -> usize {
        debug_assert!(n > 0);
        let index = (self.next_f64() * n as f64) as usize;
        index.min(n - 1)
    }
}

/// Production source backed by the thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}
