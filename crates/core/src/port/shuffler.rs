// Shuffler Port (for deterministic testing)

use crate::domain::Participant;
use rand::seq::SliceRandom;

/// Permutes member order when a queue starts with shuffle enabled.
///
/// Implementations must produce a permutation: same members, same count.
pub trait Shuffler: Send + Sync {
    fn shuffle(&self, members: &mut [Participant]);
}

/// Fisher-Yates over the thread-local RNG (production)
pub struct RandomShuffler;

impl Shuffler for RandomShuffler {
    fn shuffle(&self, members: &mut [Participant]) {
        members.shuffle(&mut rand::thread_rng());
    }
}

/// Reverses member order. Deterministic stand-in for tests.
pub struct ReverseShuffler;

impl Shuffler for ReverseShuffler {
    fn shuffle(&self, members: &mut [Participant]) {
        members.reverse();
    }
}
