use std::fmt;

use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Length of the secret half of the key material, in bytes.
pub const SECRET_LEN: usize = 32;

/// Length of the padding block, in bytes. This matches the PRF block size.
pub const PAD_LEN: usize = 16;

/// The key material shared by all anonymization engines.
///
/// A key consists of a 32-byte secret and a 16-byte padding block. The secret
/// keys the PRF that drives the prefix-preserving address engines and seeds
/// the random number generator of the integer and octet-string engines; the
/// padding block fills the unused tail of each PRF input.
///
/// Keys are immutable after construction. Use [`AnonKey::from_passphrase`]
/// when runs must be reproducible, or [`AnonKey::from_random`] for a
/// throwaway key. The material is zeroized when the last clone is dropped.
#[derive(Clone)]
pub struct AnonKey {
    secret: Zeroizing<[u8; SECRET_LEN]>,
    pad: Zeroizing<[u8; PAD_LEN]>,
}

impl AnonKey {
    /// Derive a key deterministically from a passphrase.
    ///
    /// The material is a SHA-256 digest stream: block zero is the digest of
    /// the passphrase, and each following block is the digest of the previous
    /// block plus a one-byte counter. A single digest yields 32 bytes and we
    /// need 48, so exactly one chained block is consumed today; the loop
    /// keeps working if the material ever grows.
    pub fn from_passphrase(passphrase: impl AsRef<[u8]>) -> Self {
        let mut material = Zeroizing::new([0u8; SECRET_LEN + PAD_LEN]);
        let mut block: Zeroizing<[u8; 32]> =
            Zeroizing::new(Sha256::digest(passphrase.as_ref()).into());
        let mut filled = 0;
        let mut counter = 0u8;
        while filled < material.len() {
            let take = (material.len() - filled).min(block.len());
            material[filled..filled + take].copy_from_slice(&block[..take]);
            filled += take;
            let mut hasher = Sha256::new();
            hasher.update(&block[..]);
            hasher.update([counter]);
            *block = hasher.finalize().into();
            counter = counter.wrapping_add(1);
        }
        Self::from_material(&material)
    }

    /// Draw a fresh key from the operating system's CSPRNG.
    pub fn from_random() -> Self {
        let mut material = Zeroizing::new([0u8; SECRET_LEN + PAD_LEN]);
        rand::rng().fill_bytes(&mut material[..]);
        Self::from_material(&material)
    }

    fn from_material(material: &[u8; SECRET_LEN + PAD_LEN]) -> Self {
        let mut secret = Zeroizing::new([0u8; SECRET_LEN]);
        let mut pad = Zeroizing::new([0u8; PAD_LEN]);
        secret.copy_from_slice(&material[..SECRET_LEN]);
        pad.copy_from_slice(&material[SECRET_LEN..]);
        Self { secret, pad }
    }

    /// The 32-byte secret.
    pub fn secret(&self) -> &[u8; SECRET_LEN] {
        &self.secret
    }

    /// The 16-byte padding block.
    pub fn pad(&self) -> [u8; PAD_LEN] {
        *self.pad
    }

    /// The first 16 bytes of the secret, used as the AES-128 key of the PRF.
    pub(crate) fn cipher_key(&self) -> [u8; 16] {
        let mut key = [0u8; 16];
        key.copy_from_slice(&self.secret[..16]);
        key
    }

    /// The full secret, used to seed the RNG of the non-PRF engines.
    pub(crate) fn seed(&self) -> [u8; SECRET_LEN] {
        *self.secret
    }
}

impl fmt::Debug for AnonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        f.write_str("AnonKey(..)")
    }
}
