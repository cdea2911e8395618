use std::collections::BTreeSet;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::fast_hash_map::{FastHashMap, FastHashSet};
use crate::key::AnonKey;

/// The character classes the engine preserves. Bytes outside all classes
/// pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ByteClass {
    Lower,
    Upper,
    Digit,
}

impl ByteClass {
    fn of(byte: u8) -> Option<Self> {
        match byte {
            b'a'..=b'z' => Some(Self::Lower),
            b'A'..=b'Z' => Some(Self::Upper),
            b'0'..=b'9' => Some(Self::Digit),
            _ => None,
        }
    }

    fn first(self) -> u8 {
        match self {
            Self::Lower => b'a',
            Self::Upper => b'A',
            Self::Digit => b'0',
        }
    }

    fn size(self) -> u8 {
        match self {
            Self::Lower | Self::Upper => 26,
            Self::Digit => 10,
        }
    }
}

/// An injective byte-to-byte mapping within one class at one position.
#[derive(Default)]
struct ClassMap {
    forward: FastHashMap<u8, u8>,
    /// Bitmask over the class alphabet of already-assigned targets.
    taken: u32,
}

impl ClassMap {
    fn get_or_assign(&mut self, byte: u8, class: ByteClass, rng: &mut dyn RngCore) -> u8 {
        if let Some(&mapped) = self.forward.get(&byte) {
            return mapped;
        }
        let target = loop {
            let slot = rng.random_range(0..class.size());
            if self.taken & (1 << slot) == 0 {
                self.taken |= 1 << slot;
                break class.first() + slot;
            }
        };
        self.forward.insert(byte, target);
        target
    }

    fn from_pairs(pairs: impl Iterator<Item = (u8, u8)>, class: ByteClass) -> Self {
        let mut map = Self::default();
        for (byte, target) in pairs {
            map.taken |= 1 << (target - class.first());
            map.forward.insert(byte, target);
        }
        map
    }

    fn get(&self, byte: u8) -> Option<u8> {
        self.forward.get(&byte).copied()
    }
}

enum Phase {
    Init {
        marked: BTreeSet<Vec<u8>>,
    },
    NonLex {
        tables: FastHashMap<(usize, ByteClass), ClassMap>,
    },
    Lex {
        tables: FastHashMap<(usize, ByteClass), ClassMap>,
        domain: FastHashSet<Vec<u8>>,
    },
}

/// Anonymizer for octet strings.
///
/// Outputs have the same length as their input, and every position keeps its
/// character class: lowercase stays lowercase, uppercase stays uppercase,
/// digits stay digits, and everything else passes through unchanged. The
/// within-class substitution is random but consistent across all inputs the
/// engine sees.
///
/// The order-preserving mode installs a monotone substitution per position
/// and class, which makes the whole map monotone under bytewise
/// lexicographic order across the marked set: the three classes occupy
/// disjoint, ordered byte ranges and map into themselves, so order at the
/// first differing position is preserved whether or not the two bytes share
/// a class.
pub struct OctetStringAnonymizer {
    rng: Box<dyn RngCore>,
    phase: Phase,
}

impl OctetStringAnonymizer {
    pub fn new() -> Self {
        Self::with_rng(Box::new(StdRng::from_os_rng()))
    }

    /// Like [`new`](Self::new), with a caller-supplied randomness source.
    pub fn with_rng(rng: Box<dyn RngCore>) -> Self {
        Self {
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

    /// Record that `input` will be mapped in order-preserving mode.
    /// Idempotent.
    pub fn set_used(&mut self, input: &[u8]) {
        let Phase::Init { marked } = &mut self.phase else {
            panic!("set_used is only valid before mapping starts");
        };
        if !marked.contains(input) {
            marked.insert(input.to_vec());
        }
    }

    /// Map `input` to its pseudonym, extending the per-position substitution
    /// tables on first sight of a byte.
    pub fn map(&mut self, input: &[u8]) -> Vec<u8> {
        if matches!(self.phase, Phase::Init { .. }) {
            self.phase = Phase::NonLex {
                tables: FastHashMap::default(),
            };
        }
        let Phase::NonLex { tables } = &mut self.phase else {
            panic!("map called on an engine already in order-preserving mode");
        };
        input
            .iter()
            .enumerate()
            .map(|(position, &byte)| match ByteClass::of(byte) {
                None => byte,
                Some(class) => tables
                    .entry((position, class))
                    .or_default()
                    .get_or_assign(byte, class, &mut *self.rng),
            })
            .collect()
    }

    /// The order-preserving map. Panics on inputs that were not marked.
    pub fn map_lex(&mut self, input: &[u8]) -> Vec<u8> {
        if matches!(self.phase, Phase::Init { .. }) {
            self.install_assignment();
        }
        let Phase::Lex { tables, domain } = &self.phase else {
            panic!("map_lex called on an engine already in non-order-preserving mode");
        };
        assert!(
            domain.contains(input),
            "{:?} was not marked before order-preserving mapping",
            String::from_utf8_lossy(input)
        );
        input
            .iter()
            .enumerate()
            .map(|(position, &byte)| match ByteClass::of(byte) {
                None => byte,
                Some(class) => tables[&(position, class)]
                    .get(byte)
                    .expect("marked bytes always have a table entry"),
            })
            .collect()
    }

    /// Freeze the marked set and install, for every position and class, a
    /// monotone substitution from the observed bytes onto freshly drawn
    /// distinct bytes of the same class.
    fn install_assignment(&mut self) {
        let placeholder = Phase::Lex {
            tables: FastHashMap::default(),
            domain: FastHashSet::default(),
        };
        let Phase::Init { marked } = std::mem::replace(&mut self.phase, placeholder) else {
            unreachable!("install_assignment is only called from the initial phase");
        };
        let mut observed: FastHashMap<(usize, ByteClass), BTreeSet<u8>> = FastHashMap::default();
        for input in &marked {
            for (position, &byte) in input.iter().enumerate() {
                if let Some(class) = ByteClass::of(byte) {
                    observed.entry((position, class)).or_default().insert(byte);
                }
            }
        }
        debug!(
            "assigned order-preserving substitutions for {} marked strings",
            marked.len()
        );
        let mut tables = FastHashMap::default();
        for ((position, class), bytes) in observed {
            let targets = draw_distinct_sorted(&mut *self.rng, class, bytes.len());
            let map = ClassMap::from_pairs(bytes.into_iter().zip(targets), class);
            tables.insert((position, class), map);
        }
        let domain = marked.into_iter().collect();
        self.phase = Phase::Lex { tables, domain };
    }
}

impl Default for OctetStringAnonymizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw `count` distinct bytes of `class`, sorted ascending: a partial
/// Fisher-Yates over the class alphabet.
fn draw_distinct_sorted(rng: &mut dyn RngCore, class: ByteClass, count: usize) -> Vec<u8> {
    let mut alphabet: Vec<u8> = (0..class.size()).map(|i| class.first() + i).collect();
    debug_assert!(count <= alphabet.len());
    for i in 0..count {
        let j = rng.random_range(i..alphabet.len());
        alphabet.swap(i, j);
    }
    let mut chosen = alphabet[..count].to_vec();
    chosen.sort_unstable();
    chosen
}
