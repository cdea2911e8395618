use std::net::{Ipv4Addr, Ipv6Addr};

use log::debug;

use crate::key::AnonKey;
use crate::prf::Prf;
use crate::trie::PrefixTrie;

/// Which family of map an engine has committed to. Engines start out
/// uncommitted; the first `map_pref` or `map_pref_lex` call decides, and the
/// two families cannot be mixed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Init,
    NonLex,
    Lex,
}

pub(crate) struct Keyed {
    pub prf: Prf,
    pub pad: u128,
}

/// The engine core shared by the IPv4, IPv6 and MAC anonymizers: a prefix
/// trie plus key material and the phase state machine, operating on
/// width-bit values carried in a `u128`.
pub(crate) struct AddrAnonymizer {
    trie: PrefixTrie,
    keyed: Option<Keyed>,
    phase: Phase,
}

impl AddrAnonymizer {
    pub fn new(width: u32, preserved: u32) -> Self {
        Self {
            trie: PrefixTrie::new(width, preserved),
            keyed: None,
            phase: Phase::Init,
        }
    }

    pub fn set_key(&mut self, key: &AnonKey) {
        assert!(
            self.phase == Phase::Init,
            "the key must be attached before any mapping"
        );
        self.keyed = Some(Keyed {
            prf: Prf::new(key),
            pad: u128::from_be_bytes(key.pad()),
        });
    }

    pub fn set_used(&mut self, value: u128, prefix_len: u32) {
        assert!(
            self.phase == Phase::Init,
            "set_used is only valid before mapping starts"
        );
        self.trie.mark(value, prefix_len);
    }

    pub fn map_pref(&mut self, value: u128) -> u128 {
        match self.phase {
            Phase::Init => self.phase = Phase::NonLex,
            Phase::NonLex => {}
            Phase::Lex => panic!("map_pref called on an engine already in order-preserving mode"),
        }
        let keyed = self.keyed.as_ref().expect("no key attached");
        self.trie.map(value, &keyed.prf, keyed.pad)
    }

    pub fn map_pref_lex(&mut self, value: u128) -> u128 {
        match self.phase {
            Phase::Init => {
                let keyed = self.keyed.as_ref().expect("no key attached");
                self.trie.install_lex_bits(&keyed.prf, keyed.pad);
                debug!(
                    "installed order-preserving bits over {} trie nodes",
                    self.trie.len()
                );
                self.phase = Phase::Lex;
            }
            Phase::Lex => {}
            Phase::NonLex => {
                panic!("map_pref_lex called on an engine already in non-order-preserving mode")
            }
        }
        let keyed = self.keyed.as_ref().expect("no key attached");
        self.trie.map(value, &keyed.prf, keyed.pad)
    }

    pub fn nodes_count(&self) -> usize {
        self.trie.len()
    }
}

/// Prefix-preserving anonymizer for IPv4 addresses.
///
/// Two addresses sharing a k-bit prefix map to outputs sharing a k-bit
/// prefix, for every k. Outputs are deterministic under the attached key.
///
/// In the order-preserving mode, call [`set_used`](Self::set_used) for every
/// address first, then [`map_pref_lex`](Self::map_pref_lex); the outputs are
/// additionally numerically ordered like the marked inputs. Bits beyond a
/// marked prefix fall back to the plain prefix-preserving map.
pub struct Ipv4Anonymizer {
    inner: AddrAnonymizer,
}

impl Ipv4Anonymizer {
    pub fn new() -> Self {
        Self {
            inner: AddrAnonymizer::new(32, 0),
        }
    }

    /// Attach the key. Must happen before any mapping.
    pub fn set_key(&mut self, key: &AnonKey) {
        self.inner.set_key(key);
    }

    /// Record that `addr`, truncated to its high `prefix_len` bits, will be
    /// mapped in order-preserving mode later. A no-op for engines that end up
    /// in the non-order-preserving mode.
    pub fn set_used(&mut self, addr: Ipv4Addr, prefix_len: u32) {
        self.inner.set_used(u128::from(u32::from(addr)), prefix_len);
    }

    /// The prefix-preserving map.
    pub fn map_pref(&mut self, addr: Ipv4Addr) -> Ipv4Addr {
        Ipv4Addr::from(self.inner.map_pref(u128::from(u32::from(addr))) as u32)
    }

    /// The prefix- and order-preserving map. The first call freezes the
    /// marked set and installs the order-preserving bit assignment; later
    /// calls look it up.
    pub fn map_pref_lex(&mut self, addr: Ipv4Addr) -> Ipv4Addr {
        Ipv4Addr::from(self.inner.map_pref_lex(u128::from(u32::from(addr))) as u32)
    }

    /// Number of trie nodes allocated so far.
    pub fn nodes_count(&self) -> usize {
        self.inner.nodes_count()
    }
}

impl Default for Ipv4Anonymizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefix-preserving anonymizer for IPv6 addresses. See [`Ipv4Anonymizer`];
/// the two differ only in address width.
pub struct Ipv6Anonymizer {
    inner: AddrAnonymizer,
}

impl Ipv6Anonymizer {
    pub fn new() -> Self {
        Self {
            inner: AddrAnonymizer::new(128, 0),
        }
    }

    pub fn set_key(&mut self, key: &AnonKey) {
        self.inner.set_key(key);
    }

    pub fn set_used(&mut self, addr: Ipv6Addr, prefix_len: u32) {
        self.inner.set_used(u128::from(addr), prefix_len);
    }

    pub fn map_pref(&mut self, addr: Ipv6Addr) -> Ipv6Addr {
        Ipv6Addr::from(self.inner.map_pref(u128::from(addr)))
    }

    pub fn map_pref_lex(&mut self, addr: Ipv6Addr) -> Ipv6Addr {
        Ipv6Addr::from(self.inner.map_pref_lex(u128::from(addr)))
    }

    pub fn nodes_count(&self) -> usize {
        self.inner.nodes_count()
    }
}

impl Default for Ipv6Anonymizer {
    fn default() -> Self {
        Self::new()
    }
}
