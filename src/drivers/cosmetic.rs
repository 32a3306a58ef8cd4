//! Non-authoritative randomness for simulated log lines.
//!
//! Whether a tick emits a line and what the line says are decided by two
//! separate sources. Neither one is consulted for timing or step order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub trait EmissionGate: Send {
    /// Decide whether tick number `tick` (starting at 1) emits a detail line.
    fn should_emit(&mut self, tick: u64) -> bool;
}

pub trait DetailSource: Send {
    fn pick(&mut self, pool: &[String]) -> Option<String>;
    fn word_count(&mut self) -> u32;
}

pub struct ProbabilityGate {
    probability: f64,
    rng: StdRng,
}

impl ProbabilityGate {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(probability: f64, seed: u64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl EmissionGate for ProbabilityGate {
    fn should_emit(&mut self, _tick: u64) -> bool {
        self.rng.gen_bool(self.probability)
    }
}

pub struct AlwaysEmit;

impl EmissionGate for AlwaysEmit {
    fn should_emit(&mut self, _tick: u64) -> bool {
        true
    }
}

pub struct NeverEmit;

impl EmissionGate for NeverEmit {
    fn should_emit(&mut self, _tick: u64) -> bool {
        false
    }
}

const MIN_WORDS: u32 = 120;
const MAX_WORDS: u32 = 900;

pub struct RandomDetails {
    rng: StdRng,
}

impl RandomDetails {
    pub fn new() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for RandomDetails {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailSource for RandomDetails {
    fn pick(&mut self, pool: &[String]) -> Option<String> {
        pool.choose(&mut self.rng).cloned()
    }

    fn word_count(&mut self) -> u32 {
        self.rng.gen_range(MIN_WORDS..=MAX_WORDS)
    }
}

/// Cycles through the pool in order with a constant word count.
pub struct FixedDetails {
    next: usize,
    words: u32,
}

impl FixedDetails {
    pub fn new(words: u32) -> Self {
        Self { next: 0, words }
    }
}

impl DetailSource for FixedDetails {
    fn pick(&mut self, pool: &[String]) -> Option<String> {
        if pool.is_empty() {
            return None;
        }
        let detail = pool[self.next % pool.len()].clone();
        self.next += 1;
        Some(detail)
    }

    fn word_count(&mut self) -> u32 {
        self.words
    }
}

pub fn format_detail_line(clock: &str, agent_name: &str, detail: &str, words: u32) -> String {
    format!("[{}] [{}] {} ({} words)", clock, agent_name, detail, words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_seeded_gate_is_reproducible() {
        let mut g1 = ProbabilityGate::seeded(0.3, 7);
        let mut g2 = ProbabilityGate::seeded(0.3, 7);
        let a: Vec<bool> = (1..=50).map(|t| g1.should_emit(t)).collect();
        let b: Vec<bool> = (1..=50).map(|t| g2.should_emit(t)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_probability_bounds() {
        let mut never = ProbabilityGate::seeded(0.0, 1);
        let mut always = ProbabilityGate::seeded(5.0, 1);
        assert!((1..=100).all(|t| !never.should_emit(t)));
        assert!((1..=100).all(|t| always.should_emit(t)));
    }

    #[test]
    fn test_random_details_pick_from_pool() {
        let mut details = RandomDetails::seeded(3);
        let p = pool();
        for _ in 0..20 {
            let d = details.pick(&p).unwrap();
            assert!(p.contains(&d));
            let w = details.word_count();
            assert!((MIN_WORDS..=MAX_WORDS).contains(&w));
        }
        assert!(details.pick(&[]).is_none());
    }

    #[test]
    fn test_fixed_details_cycle() {
        let mut details = FixedDetails::new(200);
        let p = pool();
        assert_eq!(details.pick(&p).as_deref(), Some("a"));
        assert_eq!(details.pick(&p).as_deref(), Some("b"));
        assert_eq!(details.pick(&p).as_deref(), Some("a"));
        assert_eq!(details.word_count(), 200);
    }

    #[test]
    fn test_format_detail_line() {
        assert_eq!(
            format_detail_line("10:00:00", "Reader", "Found 3 clauses", 240),
            "[10:00:00] [Reader] Found 3 clauses (240 words)"
        );
    }
}
