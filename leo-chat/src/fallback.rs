//! Canned replies returned when the upstream model fails.

use leo_common::config::DEFAULT_FALLBACK_RESPONSES;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Chooses an index in `0..len`. `len` is always at least 1.
pub trait FallbackSelector: Send + Sync {
    fn pick(&self, len: usize) -> usize;
}

/// Uniform choice from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl FallbackSelector for RandomSelector {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Reproducible choice from a seeded RNG.
#[derive(Debug)]
pub struct SeededSelector {
    rng: Mutex<StdRng>,
}

impl SeededSelector {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl FallbackSelector for SeededSelector {
    fn pick(&self, len: usize) -> usize {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..len),
            Err(poisoned) => poisoned.into_inner().gen_range(0..len),
        }
    }
}

/// Always the same index.
#[derive(Debug, Clone, Copy)]
pub struct FixedSelector(pub usize);

impl FallbackSelector for FixedSelector {
    fn pick(&self, _len: usize) -> usize {
        self.0
    }
}

/// The fallback reply set plus the selector that picks from it.
#[derive(Clone)]
pub struct FallbackReplies {
    replies: Vec<String>,
    selector: Arc<dyn FallbackSelector>,
}

impl FallbackReplies {
    /// Empty `replies` falls back to the built-in set.
    pub fn new(replies: Vec<String>, selector: Arc<dyn FallbackSelector>) -> Self {
        let replies: Vec<String> = replies
            .into_iter()
            .filter(|r| !r.trim().is_empty())
            .collect();
        let replies = if replies.is_empty() {
            DEFAULT_FALLBACK_RESPONSES.iter().map(|s| (*s).to_string()).collect()
        } else {
            replies
        };
        Self { replies, selector }
    }

    pub fn replies(&self) -> &[String] {
        &self.replies
    }

    /// Pick one reply. Out-of-range selector output is clamped.
    pub fn choose(&self) -> &str {
        let idx = self.selector.pick(self.replies.len()).min(self.replies.len() - 1);
        &self.replies[idx]
    }
}

impl std::fmt::Debug for FallbackReplies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackReplies")
            .field("replies", &self.replies)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_three_replies() {
        let fallback = FallbackReplies::new(Vec::new(), Arc::new(RandomSelector));
        assert_eq!(fallback.replies().len(), 3);
        assert!(fallback.replies().iter().any(|r| r == fallback.choose()));
    }

    #[test]
    fn test_fixed_selector() {
        let fallback = FallbackReplies::new(Vec::new(), Arc::new(FixedSelector(1)));
        assert_eq!(fallback.choose(), DEFAULT_FALLBACK_RESPONSES[1]);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let fallback = FallbackReplies::new(
            vec!["a".into(), "b".into()],
            Arc::new(FixedSelector(99)),
        );
        assert_eq!(fallback.choose(), "b");
    }

    #[test]
    fn test_blank_replies_use_defaults() {
        let fallback = FallbackReplies::new(vec!["  ".into()], Arc::new(FixedSelector(0)));
        assert_eq!(fallback.choose(), DEFAULT_FALLBACK_RESPONSES[0]);
    }

    #[test]
    fn test_seeded_selector_is_reproducible() {
        let a = SeededSelector::new(42);
        let b = SeededSelector::new(42);
        let seq_a: Vec<usize> = (0..20).map(|_| a.pick(3)).collect();
        let seq_b: Vec<usize> = (0..20).map(|_| b.pick(3)).collect();
        assert_eq!(seq_a, seq_b);
        assert!(seq_a.iter().all(|&i| i < 3));
    }

    #[test]
    fn test_random_selector_covers_all_replies() {
        let selector = RandomSelector;
        let mut seen = [false; 3];
        for _ in 0..500 {
            seen[selector.pick(3)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
