use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Block};

use crate::key::AnonKey;

/// The keyed pseudorandom function driving the prefix-preserving engines:
/// AES-128 over a single 16-byte block (ECB on exactly one block).
///
/// The block layout is big-endian, so bit 0 of the input value is the first
/// bit fed to the cipher.
#[derive(Clone)]
pub struct Prf {
    cipher: Aes128,
}

impl Prf {
    pub fn new(key: &AnonKey) -> Self {
        let cipher = Aes128::new(&key.cipher_key().into());
        Self { cipher }
    }

    /// Evaluate the PRF on one block.
    pub fn eval(&self, block: u128) -> u128 {
        let mut buf = Block::from(block.to_be_bytes());
        self.cipher.encrypt_block(&mut buf);
        u128::from_be_bytes(buf.into())
    }

    /// The single pseudorandom bit consumed per trie node: the high bit of
    /// the PRF output.
    pub fn top_bit(&self, block: u128) -> u8 {
        (self.eval(block) >> 127) as u8
    }
}
