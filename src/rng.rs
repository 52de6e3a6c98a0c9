//! The single per-match random source.
//!
//! Design Notes (§9) call for one cryptographic RNG per match, seeded once
//! at `MatchInit` and reused for both the shoe shuffle and every bot
//! decision, so a fixed seed reproduces an entire match deterministically.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Shared RNG handle. Not `Clone`/`Copy` on purpose — a match owns exactly
/// one instance, threaded by `&mut` into the shoe and the bot scheduler.
pub struct MatchRng(ChaCha8Rng);

impl MatchRng {
    /// Seeds the RNG from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(ChaCha8Rng::from_os_rng())
    }

    /// Seeds the RNG deterministically, for tests and reproducible replays.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Borrows the inner generator, e.g. to build a [`crate::card::Shoe`].
    pub fn inner_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.0
    }

    /// Rolls a `[0, 100)` percentage check, used throughout the bot's
    /// randomness layer (§4.6).
    pub fn roll_percent(&mut self) -> u8 {
        self.0.random_range(0..100)
    }

    /// Returns a uniformly random integer in `[low, high]` inclusive.
    pub fn range_inclusive(&mut self, low: i64, high: i64) -> i64 {
        if high <= low {
            return low;
        }
        self.0.random_range(low..=high)
    }
}
