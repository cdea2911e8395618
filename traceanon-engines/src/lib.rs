//! Deterministic, key-derived pseudonyms for the sensitive identifiers found
//! in network traces: IPv4 and IPv6 addresses, MAC addresses, 64-bit
//! integers, and arbitrary octet strings.
//!
//! Two families of mapping are offered. The address engines are
//! *structure-preserving*: two inputs sharing an n-bit prefix map to outputs
//! sharing an n-bit prefix (the Xu/Fan/Ammar/Moon construction over an
//! AES-128 PRF). The integer and octet-string engines draw pseudonyms
//! uniformly without replacement from their codomain. Every engine has an
//! additional order-preserving mode that keeps the outputs sorted like the
//! inputs, driven by a two-pass protocol: mark every input with `set_used`
//! first, then map.
//!
//! All engines are deterministic under an [`AnonKey`], so re-running a trace
//! with the same key reproduces the same pseudonyms. The mapping is one-way
//! for anyone without the key.
//!
//! ## Example
//!
//! ```
//! use std::net::Ipv4Addr;
//! use traceanon_engines::{AnonKey, Ipv4Anonymizer};
//!
//! let key = AnonKey::from_passphrase("correct horse battery staple");
//! let mut engine = Ipv4Anonymizer::new();
//! engine.set_key(&key);
//!
//! let a = engine.map_pref(Ipv4Addr::new(10, 0, 0, 1));
//! let b = engine.map_pref(Ipv4Addr::new(10, 0, 0, 2));
//! // The two inputs share 30 bits, so the two outputs do as well.
//! assert_eq!(u32::from(a) >> 2, u32::from(b) >> 2);
//! ```

mod fast_hash_map;
mod int;
mod ip;
mod key;
mod mac;
mod octets;
mod prf;
mod trie;

pub use int::{I64Anonymizer, U64Anonymizer};
pub use ip::{Ipv4Anonymizer, Ipv6Anonymizer};
pub use key::{AnonKey, PAD_LEN, SECRET_LEN};
pub use mac::{MacAddr, MacAnonymizer, ParseMacAddrError};
pub use octets::OctetStringAnonymizer;
