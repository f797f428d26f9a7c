use thiserror::Error;

/// Result type for envelope operations
pub type SealResult<T> = std::result::Result<T, SealError>;

/// Error type for envelope operations
#[derive(Error, Debug)]
pub enum SealError {
  #[error("Base64 decode error: {0}")]
  Base64Decode(#[from] base64::DecodeError),
  #[error("Hex decode error: {0}")]
  HexDecode(#[from] hex::FromHexError),

  /// Required input was not supplied
  #[error("Missing input: {0}")]
  MissingInput(String),

  /* ----- Key material errors ----- */
  /// Entropy source failed while generating a key
  #[error("Failed to generate key: {0}")]
  KeyGen(String),
  /// Invalid private key PEM
  #[error("Failed to parse private key: {0}")]
  ParsePrivateKey(String),
  /// Invalid public key PEM
  #[error("Failed to parse public key: {0}")]
  ParsePublicKey(String),
  /// Symmetric key of the wrong length
  #[error("Symmetric key must be {expected} bytes, got {actual}")]
  InvalidKeyLength { expected: usize, actual: usize },

  /* ----- Signature errors ----- */
  #[error("Failed to sign digest: {0}")]
  Sign(String),
  /// Signature blob does not have the shape of a signature at all
  #[error("Malformed signature: {0}")]
  MalformedSignature(String),
  /// Signature is well formed but does not match content and key
  #[error("Digital signature is invalid")]
  InvalidSignature,

  /* ----- Symmetric cipher errors ----- */
  #[error("Encryption failed: {0}")]
  Encrypt(String),
  /// AES-GCM tag mismatch: tampered ciphertext or wrong key
  #[error("Authentication failed: payload was tampered with or the key is wrong")]
  AuthenticationFailed,
  /// Payload too short to even hold nonce and tag
  #[error("Encrypted payload truncated: {0} bytes")]
  TruncatedPayload(usize),

  /* ----- Key wrapping errors ----- */
  #[error("Failed to wrap symmetric key: {0}")]
  Wrap(String),
  /// Wrong private key or corrupted wrapped-key blob
  #[error("Failed to unwrap symmetric key: {0}")]
  Unwrap(String),

  /* ----- Packaging errors ----- */
  #[error("Malformed package: {0}")]
  MalformedPackage(String),

  /* ----- Pipeline errors ----- */
  /// A pipeline stage was invoked before its predecessor completed
  #[error("Stage not ready: {0}")]
  StageNotReady(String),
}

impl SealError {
  /// Name of the pipeline stage the failure belongs to, so callers can tell
  /// whether to regenerate keys, reselect a file, or abort.
  pub fn stage(&self) -> &'static str {
    match self {
      Self::Base64Decode(_) | Self::HexDecode(_) | Self::MissingInput(_) => "input-validation",
      Self::KeyGen(_) => "key-generation",
      Self::ParsePrivateKey(_) | Self::ParsePublicKey(_) | Self::InvalidKeyLength { .. } => "key-parsing",
      Self::Sign(_) => "signing",
      Self::MalformedSignature(_) | Self::InvalidSignature => "verification",
      Self::Encrypt(_) => "encryption",
      Self::AuthenticationFailed | Self::TruncatedPayload(_) => "decryption",
      Self::Wrap(_) => "wrapping",
      Self::Unwrap(_) => "unwrapping",
      Self::MalformedPackage(_) => "packaging",
      Self::StageNotReady(_) => "pipeline",
    }
  }
}
