#![forbid(unsafe_code)]

//! Uniform index sources for winner resolution and shuffling.
//!
//! [`SystemRandom`] draws from the operating system (or `crypto.getRandomValues`
//! on the web) and degrades to a seeded [`SmallRng`] when that source fails.
//! The degradation is logged once per instance and never surfaces as an error.
//!
//! [`SeededRandom`] and [`ScriptedRandom`] give tests and replays a fully
//! deterministic sequence.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::logging::TARGET_RANDOM;

/// Source of uniformly distributed indices.
pub trait RandomSource {
    /// Return an index in `[0, bound)`, every value equally likely.
    fn next_index(&mut self, bound: NonZeroUsize) -> usize;

    /// Whether this source is currently backed by a cryptographic generator.
    fn is_secure(&self) -> bool {
        false
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_index(&mut self, bound: NonZeroUsize) -> usize {
        (**self).next_index(bound)
    }

    fn is_secure(&self) -> bool {
        (**self).is_secure()
    }
}

/// Map a stream of uniform `u64` draws onto `[0, bound)` without modulo bias.
///
/// Values in the incomplete top bucket are rejected and redrawn.
fn unbiased_below<E>(
    bound: NonZeroUsize,
    mut draw: impl FnMut() -> Result<u64, E>,
) -> Result<usize, E> {
    let bound = bound.get() as u64;
    let zone = u64::MAX - (u64::MAX % bound);
    loop {
        let value = draw()?;
        if value < zone {
            return Ok((value % bound) as usize);
        }
    }
}

/// Draw of one uniform `u64` from a secure source.
type SecureDraw = fn() -> Result<u64, getrandom::Error>;

/// Cryptographic index source with a pseudo-random fallback.
#[derive(Debug)]
pub struct SystemRandom {
    secure: SecureDraw,
    fallback: Option<SmallRng>,
}

impl SystemRandom {
    #[must_use]
    pub fn new() -> Self {
        Self::with_secure_source(getrandom::u64)
    }

    /// Source drawing from `secure` until it first fails.
    pub(crate) fn with_secure_source(secure: SecureDraw) -> Self {
        Self {
            secure,
            fallback: None,
        }
    }

    /// True once the secure path has failed and the PRNG took over.
    #[must_use]
    pub fn degraded(&self) -> bool {
        self.fallback.is_some()
    }

    fn fallback_rng(&mut self, cause: &getrandom::Error) -> &mut SmallRng {
        self.fallback.get_or_insert_with(|| {
            tracing::warn!(
                target: TARGET_RANDOM,
                error = %cause,
                "secure random source unavailable, falling back to pseudo-random generator"
            );
            SmallRng::seed_from_u64(fallback_seed())
        })
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandom {
    fn next_index(&mut self, bound: NonZeroUsize) -> usize {
        if let Some(rng) = self.fallback.as_mut() {
            return rng.random_range(0..bound.get());
        }
        match unbiased_below(bound, self.secure) {
            Ok(index) => index,
            Err(err) => self.fallback_rng(&err).random_range(0..bound.get()),
        }
    }

    fn is_secure(&self) -> bool {
        self.fallback.is_none()
    }
}

/// Seed for the fallback generator when the OS source is gone.
fn fallback_seed() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9E37_79B9_7F4A_7C15)
}

/// Deterministic source for tests, replays, and fairness sampling.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    seed: u64,
    rng: SmallRng,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn next_index(&mut self, bound: NonZeroUsize) -> usize {
        self.rng.random_range(0..bound.get())
    }
}

/// Replays a fixed list of indices, each reduced modulo the requested bound.
///
/// Once the script is exhausted every draw returns `0`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    script: VecDeque<usize>,
    draws: usize,
}

impl ScriptedRandom {
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = usize>) -> Self {
        Self {
            script: script.into_iter().collect(),
            draws: 0,
        }
    }

    /// Number of draws served so far.
    #[must_use]
    pub const fn draws(&self) -> usize {
        self.draws
    }
}

impl RandomSource for ScriptedRandom {
    fn next_index(&mut self, bound: NonZeroUsize) -> usize {
        self.draws += 1;
        self.script.pop_front().unwrap_or(0) % bound.get()
    }
}
