use crate::error::{SealError, SealResult};
use aes_gcm::{
  aead::{Aead, KeyInit},
  Aes256Gcm, Nonce as AesNonce,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::ZeroizeOnDrop;

/// Symmetric key length in bytes (256 bits)
pub const KEY_SIZE: usize = 32;
/// AES-GCM nonce length in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;
/// AES-GCM authentication tag length in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/* -------------------------------- */
/// 256-bit AES key, generated once per message exchange.
///
/// Zeroized when dropped. Hex is the boundary encoding for this key, matching
/// what external callers paste between the generation and sealing steps.
#[derive(ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
  /// Draw a fresh key from the process CSPRNG
  pub fn generate() -> SealResult<Self> {
    let mut bytes = [0u8; KEY_SIZE];
    OsRng
      .try_fill_bytes(&mut bytes)
      .map_err(|e| SealError::KeyGen(e.to_string()))?;
    Ok(Self(bytes))
  }

  pub fn from_bytes(bytes: &[u8]) -> SealResult<Self> {
    if bytes.len() != KEY_SIZE {
      return Err(SealError::InvalidKeyLength {
        expected: KEY_SIZE,
        actual: bytes.len(),
      });
    }
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(bytes);
    Ok(Self(key))
  }

  pub fn from_hex(hex_str: &str) -> SealResult<Self> {
    let bytes = hex::decode(hex_str.trim())?;
    Self::from_bytes(&bytes)
  }

  pub fn to_hex(&self) -> String {
    hex::encode(self.0)
  }

  pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
    &self.0
  }
}

/* -------------------------------- */
/// Nonce for one AES-GCM call. Never reused under the same key; random
/// 96-bit nonces keep collisions negligible for up to 2^32 messages per key.
#[derive(Clone, Copy, Debug)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
  /// Generate a cryptographically random nonce
  pub fn random() -> SealResult<Self> {
    let mut bytes = [0u8; NONCE_SIZE];
    OsRng
      .try_fill_bytes(&mut bytes)
      .map_err(|e| SealError::Encrypt(format!("nonce generation: {e}")))?;
    Ok(Self(bytes))
  }

  pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
    &self.0
  }
}

/* -------------------------------- */
/// Encrypt with AES-256-GCM under a fresh random nonce.
///
/// Returns the single blob `nonce || ciphertext || tag`; everything the
/// matching [`decrypt`] call needs travels inside it.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> SealResult<Vec<u8>> {
  let nonce = Nonce::random()?;
  let cipher = Aes256Gcm::new(key.as_bytes().into());

  let ciphertext = cipher
    .encrypt(AesNonce::from_slice(nonce.as_bytes()), plaintext)
    .map_err(|e| SealError::Encrypt(e.to_string()))?;

  let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
  blob.extend_from_slice(nonce.as_bytes());
  blob.extend_from_slice(&ciphertext);
  Ok(blob)
}

/// Decrypt a `nonce || ciphertext || tag` blob.
///
/// A tag mismatch (tampered bytes or the wrong key) surfaces as
/// [`SealError::AuthenticationFailed`], never as a generic failure, and is
/// terminal for the attempt: nothing here retries with different material.
pub fn decrypt(key: &SymmetricKey, blob: &[u8]) -> SealResult<Vec<u8>> {
  if blob.len() < NONCE_SIZE + TAG_SIZE {
    return Err(SealError::TruncatedPayload(blob.len()));
  }
  let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
  let cipher = Aes256Gcm::new(key.as_bytes().into());

  cipher
    .decrypt(AesNonce::from_slice(nonce), ciphertext)
    .map_err(|_| SealError::AuthenticationFailed)
}

/* ----------------------------------------------------------------- */
#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn test_encrypt_decrypt_round_trip() {
    let key = SymmetricKey::from_bytes(&[42u8; KEY_SIZE]).unwrap();
    let plaintext = b"hello world";

    let blob = encrypt(&key, plaintext).unwrap();
    assert_eq!(blob.len(), NONCE_SIZE + plaintext.len() + TAG_SIZE);
    let decrypted = decrypt(&key, &blob).unwrap();
    assert_eq!(decrypted, plaintext);
  }

  #[test]
  fn test_encrypt_decrypt_empty() {
    let key = SymmetricKey::from_bytes(&[42u8; KEY_SIZE]).unwrap();

    let blob = encrypt(&key, b"").unwrap();
    assert_eq!(blob.len(), NONCE_SIZE + TAG_SIZE);
    let decrypted = decrypt(&key, &blob).unwrap();
    assert!(decrypted.is_empty());
  }

  #[test]
  fn test_tampered_ciphertext_fails_authentication() {
    let key = SymmetricKey::from_bytes(&[42u8; KEY_SIZE]).unwrap();
    let blob = encrypt(&key, b"hello world").unwrap();

    // flip one bit in every position past the nonce, one at a time
    for i in NONCE_SIZE..blob.len() {
      let mut tampered = blob.clone();
      tampered[i] ^= 0x01;
      let result = decrypt(&key, &tampered);
      assert!(matches!(result, Err(SealError::AuthenticationFailed)));
    }
  }

  #[test]
  fn test_tampered_nonce_fails_authentication() {
    let key = SymmetricKey::from_bytes(&[42u8; KEY_SIZE]).unwrap();
    let mut blob = encrypt(&key, b"hello world").unwrap();
    blob[0] ^= 0xFF;
    assert!(matches!(decrypt(&key, &blob), Err(SealError::AuthenticationFailed)));
  }

  #[test]
  fn test_wrong_key_fails_authentication() {
    let key = SymmetricKey::from_bytes(&[42u8; KEY_SIZE]).unwrap();
    let other = SymmetricKey::from_bytes(&[43u8; KEY_SIZE]).unwrap();
    let blob = encrypt(&key, b"secret").unwrap();
    assert!(matches!(decrypt(&other, &blob), Err(SealError::AuthenticationFailed)));
  }

  #[test]
  fn test_truncated_blob_rejected() {
    let key = SymmetricKey::from_bytes(&[42u8; KEY_SIZE]).unwrap();
    let result = decrypt(&key, &[0u8; NONCE_SIZE + TAG_SIZE - 1]);
    assert!(matches!(result, Err(SealError::TruncatedPayload(27))));
  }

  #[test]
  fn test_decrypt_failures_name_the_decryption_stage() {
    let key = SymmetricKey::from_bytes(&[42u8; KEY_SIZE]).unwrap();
    let other = SymmetricKey::from_bytes(&[43u8; KEY_SIZE]).unwrap();
    let blob = encrypt(&key, b"secret").unwrap();

    let err = decrypt(&other, &blob).unwrap_err();
    assert_eq!(err.stage(), "decryption");
    let err = decrypt(&key, &blob[..NONCE_SIZE + 1]).unwrap_err();
    assert_eq!(err.stage(), "decryption");
  }

  #[test]
  fn test_nonce_uniqueness_over_many_calls() {
    let key = SymmetricKey::from_bytes(&[42u8; KEY_SIZE]).unwrap();
    let mut nonces = HashSet::new();
    for _ in 0..10_000 {
      let blob = encrypt(&key, b"same plaintext").unwrap();
      let nonce: [u8; NONCE_SIZE] = blob[..NONCE_SIZE].try_into().unwrap();
      assert!(nonces.insert(nonce), "nonce repeated");
    }
    assert_eq!(nonces.len(), 10_000);
  }

  #[test]
  fn test_same_plaintext_different_ciphertext() {
    let key = SymmetricKey::from_bytes(&[42u8; KEY_SIZE]).unwrap();
    let a = encrypt(&key, b"hello world").unwrap();
    let b = encrypt(&key, b"hello world").unwrap();
    assert_ne!(a, b);
  }

  #[test]
  fn test_key_generation_is_not_repeating() {
    let a = SymmetricKey::generate().unwrap();
    let b = SymmetricKey::generate().unwrap();
    assert_ne!(a.as_bytes(), b.as_bytes());
  }

  #[test]
  fn test_key_hex_round_trip() {
    let key = SymmetricKey::generate().unwrap();
    let restored = SymmetricKey::from_hex(&key.to_hex()).unwrap();
    assert_eq!(key.as_bytes(), restored.as_bytes());
  }

  #[test]
  fn test_key_wrong_length_rejected() {
    let result = SymmetricKey::from_bytes(&[0u8; 16]);
    assert!(matches!(
      result,
      Err(SealError::InvalidKeyLength { expected: 32, actual: 16 })
    ));
  }
}
