use std::collections::BTreeSet;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::fast_hash_map::{FastHashMap, FastHashSet};
use crate::key::AnonKey;

/// Per-phase state of an integer engine. Each phase owns exactly the data
/// that phase needs, so crossing phases cannot leave stale assignments
/// behind.
enum Phase {
    Init { marked: BTreeSet<u64> },
    NonLex { forward: FastHashMap<u64, u64>, taken: FastHashSet<u64> },
    Lex { assigned: FastHashMap<u64, u64> },
}

/// Maps unsigned 64-bit integers to pseudonyms drawn uniformly, without
/// replacement, from a caller-supplied range `[lower, upper]`.
///
/// In the default mode every previously unseen input gets a fresh uniform
/// pseudonym. In the order-preserving mode, mark all inputs with
/// [`set_used`](Self::set_used) first; the first [`map_lex`](Self::map_lex)
/// call then draws one pseudonym per marked input and hands them out in
/// matching order.
///
/// Attaching a key with [`set_key`](Self::set_key) seeds the generator from
/// the key, making the assignment reproducible across runs.
pub struct U64Anonymizer {
    lower: u64,
    upper: u64,
    rng: Box<dyn RngCore>,
    phase: Phase,
}

impl U64Anonymizer {
    /// Panics if `lower > upper`.
    pub fn new(lower: u64, upper: u64) -> Self {
        Self::with_rng(lower, upper, Box::new(StdRng::from_os_rng()))
    }

    /// Like [`new`](Self::new), with a caller-supplied randomness source.
    pub fn with_rng(lower: u64, upper: u64, rng: Box<dyn RngCore>) -> Self {
        assert!(
            lower <= upper,
            "invalid pseudonym range: lower {lower} > upper {upper}"
        );
        Self {
            lower,
            upper,
            rng,
            phase: Phase::Init {
                marked: BTreeSet::new(),
            },
        }
    }

    /// Seed the generator from the key, so that pseudonyms are reproducible
    /// under the key. Must happen before any mapping.
    pub fn set_key(&mut self, key: &AnonKey) {
        assert!(
            matches!(self.phase, Phase::Init { .. }),
            "the key must be attached before any mapping"
        );
        self.rng = Box::new(StdRng::from_seed(key.seed()));
    }

    /// Number of pseudonyms in the range.
    fn range_width(&self) -> u128 {
        u128::from(self.upper - self.lower) + 1
    }

    /// Record that `n` will be mapped in order-preserving mode. Idempotent.
    pub fn set_used(&mut self, n: u64) {
        let width = self.range_width();
        let Phase::Init { marked } = &mut self.phase else {
            panic!("set_used is only valid before mapping starts");
        };
        marked.insert(n);
        assert!(
            marked.len() as u128 <= width,
            "more distinct inputs than the {width} available pseudonyms"
        );
    }

    /// Map `n` to its pseudonym, assigning a fresh uniform one on first
    /// sight.
    pub fn map(&mut self, n: u64) -> u64 {
        if matches!(self.phase, Phase::Init { .. }) {
            self.phase = Phase::NonLex {
                forward: FastHashMap::default(),
                taken: FastHashSet::default(),
            };
        }
        let width = self.range_width();
        let (lower, upper) = (self.lower, self.upper);
        let Phase::NonLex { forward, taken } = &mut self.phase else {
            panic!("map called on an engine already in order-preserving mode");
        };
        if let Some(&m) = forward.get(&n) {
            return m;
        }
        assert!(
            (forward.len() as u128) < width,
            "more distinct inputs than the {width} available pseudonyms"
        );
        let m = loop {
            let candidate = self.rng.random_range(lower..=upper);
            if taken.insert(candidate) {
                break candidate;
            }
        };
        forward.insert(n, m);
        m
    }

    /// The order-preserving map: for marked inputs `x < y`,
    /// `map_lex(x) < map_lex(y)`. Panics on inputs that were not marked.
    pub fn map_lex(&mut self, n: u64) -> u64 {
        self.map_lex_inner(n)
            .unwrap_or_else(|| panic!("{n} was not marked before order-preserving mapping"))
    }

    pub(crate) fn map_lex_inner(&mut self, n: u64) -> Option<u64> {
        if matches!(self.phase, Phase::Init { .. }) {
            self.install_assignment();
        }
        let Phase::Lex { assigned } = &self.phase else {
            panic!("map_lex called on an engine already in non-order-preserving mode");
        };
        assigned.get(&n).copied()
    }

    /// Freeze the marked set: draw as many distinct pseudonyms, sort them,
    /// and pair them positionally with the marked inputs in ascending order.
    fn install_assignment(&mut self) {
        let placeholder = Phase::Lex {
            assigned: FastHashMap::default(),
        };
        let Phase::Init { marked } = std::mem::replace(&mut self.phase, placeholder) else {
            unreachable!("install_assignment is only called from the initial phase");
        };
        let pseudonyms = self.draw_distinct_sorted(marked.len());
        debug!("assigned {} order-preserving pseudonyms", marked.len());
        let assigned = marked.into_iter().zip(pseudonyms).collect();
        self.phase = Phase::Lex { assigned };
    }

    /// Draw `count` distinct values from `[lower, upper]`, sorted ascending.
    ///
    /// Floyd's sampling: for the last `count` candidate positions, draw into
    /// the growing prefix and fall back to the position's own value on
    /// collision. Terminates in exactly `count` draws even when `count`
    /// equals the full range width.
    fn draw_distinct_sorted(&mut self, count: usize) -> Vec<u64> {
        let width = self.range_width();
        assert!(count as u128 <= width);
        let mut chosen = FastHashSet::default();
        let mut out = Vec::with_capacity(count);
        for j in (width - count as u128)..width {
            let position = self.lower + j as u64;
            let candidate = self.rng.random_range(self.lower..=position);
            let value = if chosen.insert(candidate) {
                candidate
            } else {
                chosen.insert(position);
                position
            };
            out.push(value);
        }
        out.sort_unstable();
        out
    }
}

/// Signed companion of [`U64Anonymizer`]. Comparisons and the pseudonym
/// range are numeric; internally the values travel through the
/// order-preserving sign-bit bijection onto `u64`.
pub struct I64Anonymizer {
    inner: U64Anonymizer,
}

fn to_ordered(n: i64) -> u64 {
    (n as u64) ^ (1 << 63)
}

fn from_ordered(n: u64) -> i64 {
    (n ^ (1 << 63)) as i64
}

impl I64Anonymizer {
    /// Panics if `lower > upper`.
    pub fn new(lower: i64, upper: i64) -> Self {
        assert!(
            lower <= upper,
            "invalid pseudonym range: lower {lower} > upper {upper}"
        );
        Self {
            inner: U64Anonymizer::new(to_ordered(lower), to_ordered(upper)),
        }
    }

    pub fn with_rng(lower: i64, upper: i64, rng: Box<dyn RngCore>) -> Self {
        assert!(
            lower <= upper,
            "invalid pseudonym range: lower {lower} > upper {upper}"
        );
        Self {
            inner: U64Anonymizer::with_rng(to_ordered(lower), to_ordered(upper), rng),
        }
    }

    pub fn set_key(&mut self, key: &AnonKey) {
        self.inner.set_key(key);
    }

    pub fn set_used(&mut self, n: i64) {
        self.inner.set_used(to_ordered(n));
    }

    pub fn map(&mut self, n: i64) -> i64 {
        from_ordered(self.inner.map(to_ordered(n)))
    }

    pub fn map_lex(&mut self, n: i64) -> i64 {
        let m = self
            .inner
            .map_lex_inner(to_ordered(n))
            .unwrap_or_else(|| panic!("{n} was not marked before order-preserving mapping"));
        from_ordered(m)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn keyed(lower: u64, upper: u64) -> U64Anonymizer {
        let mut engine = U64Anonymizer::new(lower, upper);
        engine.set_key(&AnonKey::from_passphrase("test"));
        engine
    }

    #[test]
    fn outputs_stay_in_range() {
        let mut engine = keyed(100, 199);
        for n in 0..100 {
            let m = engine.map(n);
            assert!((100..=199).contains(&m));
        }
    }

    #[test]
    fn injective_and_stable() {
        let mut engine = keyed(0, 1000);
        let mut seen = FastHashSet::default();
        for n in 0..500 {
            let m = engine.map(n);
            assert!(seen.insert(m), "pseudonym {m} assigned twice");
            assert_eq!(engine.map(n), m);
        }
    }

    #[test]
    fn exhausting_the_range_is_fine() {
        let mut engine = keyed(10, 13);
        let mut outs: Vec<u64> = (0..4).map(|n| engine.map(n)).collect();
        outs.sort_unstable();
        assert_eq!(outs, vec![10, 11, 12, 13]);
    }

    #[test]
    #[should_panic(expected = "available pseudonyms")]
    fn overflowing_the_range_is_rejected() {
        let mut engine = keyed(10, 13);
        for n in 0..5 {
            engine.map(n);
        }
    }

    #[test]
    fn lex_mode_orders_marked_inputs() {
        let mut engine = keyed(100, 199);
        for n in [42, 5, 77] {
            engine.set_used(n);
        }
        let a = engine.map_lex(5);
        let b = engine.map_lex(42);
        let c = engine.map_lex(77);
        assert!(a < b && b < c);
        for m in [a, b, c] {
            assert!((100..=199).contains(&m));
        }
    }

    #[test]
    fn lex_mode_with_marked_set_equal_to_range() {
        let mut engine = keyed(50, 53);
        for n in [9, 3, 7, 1] {
            engine.set_used(n);
        }
        let outs: Vec<u64> = [1, 3, 7, 9].iter().map(|&n| engine.map_lex(n)).collect();
        assert_eq!(outs, vec![50, 51, 52, 53]);
    }

    #[test]
    fn marking_is_idempotent() {
        let mut engine = keyed(0, 1);
        engine.set_used(7);
        engine.set_used(7);
        engine.set_used(9);
        assert!(engine.map_lex(7) < engine.map_lex(9));
    }

    #[test]
    fn full_u64_range_works() {
        let mut engine = keyed(0, u64::MAX);
        let a = engine.map(1);
        let b = engine.map(2);
        assert_ne!(a, b);
    }

    #[test]
    #[should_panic(expected = "not marked")]
    fn unmarked_lex_input_is_rejected() {
        let mut engine = keyed(100, 199);
        engine.set_used(5);
        engine.set_used(42);
        engine.map_lex(1000);
    }

    #[test]
    #[should_panic(expected = "order-preserving")]
    fn mixing_modes_is_rejected() {
        let mut engine = keyed(0, 10);
        engine.set_used(1);
        engine.map_lex(1);
        engine.map(1);
    }

    #[test]
    #[should_panic(expected = "invalid pseudonym range")]
    fn inverted_range_is_rejected() {
        U64Anonymizer::new(10, 9);
    }

    #[test]
    fn reproducible_under_key() {
        let mut a = keyed(0, u64::MAX);
        let mut b = keyed(0, u64::MAX);
        for n in [3, 1, 4, 1, 5, 9, 2, 6] {
            assert_eq!(a.map(n), b.map(n));
        }
    }

    #[test]
    fn signed_ranges_are_numeric() {
        let mut engine = I64Anonymizer::new(-100, -1);
        engine.set_key(&AnonKey::from_passphrase("test"));
        for n in [-5i64, 0, 3] {
            engine.set_used(n);
        }
        let a = engine.map_lex(-5);
        let b = engine.map_lex(0);
        let c = engine.map_lex(3);
        assert!(a < b && b < c);
        for m in [a, b, c] {
            assert!((-100..=-1).contains(&m));
        }
    }

    #[test]
    fn signed_full_range() {
        let mut engine = I64Anonymizer::new(i64::MIN, i64::MAX);
        engine.set_key(&AnonKey::from_passphrase("test"));
        assert_ne!(engine.map(-1), engine.map(1));
    }
}
