mod asymmetric;
mod digest;
mod symmetric;

use crate::error::SealResult;

pub use asymmetric::{PublicKey, SecretKey, RSA_KEY_BITS};
pub use digest::{ContentDigest, DIGEST_SIZE};
pub use symmetric::{decrypt, encrypt, SymmetricKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/* -------------------------------- */
/// Sign over a precomputed content digest
pub trait SigningKey {
  fn sign(&self, digest: &ContentDigest) -> SealResult<Vec<u8>>;
}

/// Verify a signature over a precomputed content digest.
///
/// `Ok(false)` means the signature is well-formed but does not match; errors
/// are reserved for blobs that could never be a signature.
pub trait VerifyingKey {
  fn verify(&self, digest: &ContentDigest, signature: &[u8]) -> SealResult<bool>;
}
