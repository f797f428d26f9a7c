use sha2::{Digest, Sha256};

/// Digest length in bytes (SHA-256)
pub const DIGEST_SIZE: usize = 32;

/* -------------------------------- */
/// SHA-256 digest over exact file bytes.
///
/// Both ends compute this independently: the sender over the file it is about
/// to sign, the receiver over the plaintext it just decrypted. The digest
/// itself is never transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentDigest([u8; DIGEST_SIZE]);

impl ContentDigest {
  /// Compute the digest of the given content. The digest of zero bytes is
  /// well defined, so empty files work like any other.
  pub fn compute(content: &[u8]) -> Self {
    let hash = <Sha256 as Digest>::digest(content);
    Self(hash.into())
  }

  pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
    &self.0
  }

  /// Lowercase hex rendering, as reported to callers during preparation
  pub fn to_hex(&self) -> String {
    hex::encode(self.0)
  }
}
