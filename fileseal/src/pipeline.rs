use crate::{
  crypto::{self, ContentDigest, PublicKey, SecretKey, SigningKey, SymmetricKey, VerifyingKey},
  error::{SealError, SealResult},
  package,
  trace::*,
};

/* -------------------------------- */
/// Stages of the sender flow, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderStage {
  Idle,
  KeysReady,
  FileSelected,
  Signed,
  Encrypted,
  KeyWrapped,
  Packaged,
}

/// Sender-side orchestration of one envelope.
///
/// Stages advance strictly in order and only on success. A failed stage
/// leaves the pipeline where it was, with no partial artifact stored, so the
/// caller re-invokes the same stage with corrected input. Stages never run
/// out of order; that is [`SealError::StageNotReady`].
pub struct SenderPipeline {
  stage: SenderStage,
  sender_secret: Option<SecretKey>,
  recipient_public: Option<PublicKey>,
  content: Option<Vec<u8>>,
  signature: Option<Vec<u8>>,
  symmetric_key: Option<SymmetricKey>,
  payload: Option<Vec<u8>>,
  wrapped_key: Option<Vec<u8>>,
}

impl SenderPipeline {
  pub fn new() -> Self {
    Self {
      stage: SenderStage::Idle,
      sender_secret: None,
      recipient_public: None,
      content: None,
      signature: None,
      symmetric_key: None,
      payload: None,
      wrapped_key: None,
    }
  }

  pub fn stage(&self) -> SenderStage {
    self.stage
  }

  /// Parse the sender's secret key and the recipient's public key
  pub fn load_keys(&mut self, sender_secret_pem: &str, recipient_public_pem: &str) -> SealResult<()> {
    self.require_stage(SenderStage::Idle, "load_keys")?;
    let secret = SecretKey::from_pem(sender_secret_pem)?;
    let public = PublicKey::from_pem(recipient_public_pem)?;
    self.sender_secret = Some(secret);
    self.recipient_public = Some(public);
    self.advance(SenderStage::KeysReady);
    Ok(())
  }

  /// Take ownership of the file bytes to be sealed
  pub fn select_file(&mut self, content: Vec<u8>) -> SealResult<()> {
    self.require_stage(SenderStage::KeysReady, "select_file")?;
    self.content = Some(content);
    self.advance(SenderStage::FileSelected);
    Ok(())
  }

  /// Sign the digest of the selected file with the sender's secret key
  pub fn sign(&mut self) -> SealResult<()> {
    self.require_stage(SenderStage::FileSelected, "sign")?;
    let secret = self.sender_secret.as_ref().ok_or_else(|| not_loaded("sender secret key"))?;
    let content = self.content.as_ref().ok_or_else(|| not_loaded("file content"))?;
    let digest = ContentDigest::compute(content);
    self.signature = Some(secret.sign(&digest)?);
    self.advance(SenderStage::Signed);
    Ok(())
  }

  /// Encrypt the file under a fresh symmetric key.
  ///
  /// The key is drawn here, once per envelope. It is held only until
  /// `wrap_key` has protected it for the recipient.
  pub fn encrypt(&mut self) -> SealResult<()> {
    self.require_stage(SenderStage::Signed, "encrypt")?;
    let content = self.content.as_ref().ok_or_else(|| not_loaded("file content"))?;
    let key = SymmetricKey::generate()?;
    self.payload = Some(crypto::encrypt(&key, content)?);
    self.symmetric_key = Some(key);
    self.advance(SenderStage::Encrypted);
    Ok(())
  }

  /// Wrap the symmetric key under the recipient's public key
  pub fn wrap_key(&mut self) -> SealResult<()> {
    self.require_stage(SenderStage::Encrypted, "wrap_key")?;
    let public = self.recipient_public.as_ref().ok_or_else(|| not_loaded("recipient public key"))?;
    let key = self.symmetric_key.as_ref().ok_or_else(|| not_loaded("symmetric key"))?;
    self.wrapped_key = Some(public.wrap_key(key)?);
    self.advance(SenderStage::KeyWrapped);
    Ok(())
  }

  /// Assemble payload, signature and wrapped key into the final package
  pub fn package(&mut self) -> SealResult<Vec<u8>> {
    self.require_stage(SenderStage::KeyWrapped, "package")?;
    let payload = self.payload.as_ref().ok_or_else(|| not_loaded("encrypted payload"))?;
    let signature = self.signature.as_ref().ok_or_else(|| not_loaded("signature"))?;
    let wrapped_key = self.wrapped_key.as_ref().ok_or_else(|| not_loaded("wrapped key"))?;
    let archive = package::pack(payload, signature, wrapped_key)?;
    self.advance(SenderStage::Packaged);
    Ok(archive)
  }

  fn require_stage(&self, expected: SenderStage, operation: &str) -> SealResult<()> {
    if self.stage != expected {
      return Err(SealError::StageNotReady(format!(
        "{operation} runs at stage {expected:?}, pipeline is at {:?}",
        self.stage
      )));
    }
    Ok(())
  }

  fn advance(&mut self, next: SenderStage) {
    debug!("sender pipeline: {:?} -> {next:?}", self.stage);
    self.stage = next;
  }
}

impl Default for SenderPipeline {
  fn default() -> Self {
    Self::new()
  }
}

/* -------------------------------- */
/// Stages of the receiver flow, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverStage {
  PackageReceived,
  Unpacked,
  KeyUnwrapped,
  Decrypted,
  Verified,
}

/// Receiver-side orchestration of one envelope.
///
/// `Verified` is the terminal success stage. A failed stage leaves the
/// pipeline where it was; cryptographic failures are deterministic, so the
/// attempt is over and a fresh pipeline is needed for a corrected package.
/// In particular a failed decryption keeps verification unreachable.
pub struct ReceiverPipeline {
  stage: ReceiverStage,
  recipient_secret: SecretKey,
  sender_public: PublicKey,
  archive: Vec<u8>,
  payload: Option<Vec<u8>>,
  signature: Option<Vec<u8>>,
  wrapped_key: Option<Vec<u8>>,
  symmetric_key: Option<SymmetricKey>,
  content: Option<Vec<u8>>,
}

impl ReceiverPipeline {
  /// Parse the recipient's secret key and the sender's public key and take
  /// custody of the received package bytes.
  pub fn new(recipient_secret_pem: &str, sender_public_pem: &str, archive: Vec<u8>) -> SealResult<Self> {
    let recipient_secret = SecretKey::from_pem(recipient_secret_pem)?;
    let sender_public = PublicKey::from_pem(sender_public_pem)?;
    Ok(Self {
      stage: ReceiverStage::PackageReceived,
      recipient_secret,
      sender_public,
      archive,
      payload: None,
      signature: None,
      wrapped_key: None,
      symmetric_key: None,
      content: None,
    })
  }

  pub fn stage(&self) -> ReceiverStage {
    self.stage
  }

  /// Decrypted file bytes, available once the pipeline reaches `Decrypted`
  pub fn content(&self) -> Option<&[u8]> {
    self.content.as_deref()
  }

  /// Split the package into payload, signature and wrapped key
  pub fn unpack(&mut self) -> SealResult<()> {
    self.require_stage(ReceiverStage::PackageReceived, "unpack")?;
    let contents = package::unpack(&self.archive)?;
    self.payload = Some(contents.payload);
    self.signature = Some(contents.signature);
    self.wrapped_key = Some(contents.wrapped_key);
    self.advance(ReceiverStage::Unpacked);
    Ok(())
  }

  /// Recover the symmetric key with the recipient's secret key
  pub fn unwrap_key(&mut self) -> SealResult<()> {
    self.require_stage(ReceiverStage::Unpacked, "unwrap_key")?;
    let wrapped = self.wrapped_key.as_ref().ok_or_else(|| not_loaded("wrapped key"))?;
    self.symmetric_key = Some(self.recipient_secret.unwrap_key(wrapped)?);
    self.advance(ReceiverStage::KeyUnwrapped);
    Ok(())
  }

  /// Decrypt the payload under the recovered symmetric key
  pub fn decrypt(&mut self) -> SealResult<()> {
    self.require_stage(ReceiverStage::KeyUnwrapped, "decrypt")?;
    let key = self.symmetric_key.as_ref().ok_or_else(|| not_loaded("symmetric key"))?;
    let payload = self.payload.as_ref().ok_or_else(|| not_loaded("encrypted payload"))?;
    self.content = Some(crypto::decrypt(key, payload)?);
    self.advance(ReceiverStage::Decrypted);
    Ok(())
  }

  /// Check the sender's signature against the digest of the decrypted bytes.
  ///
  /// `Ok(false)` is a clean mismatch; the pipeline stays at `Decrypted` and
  /// does not reach the terminal stage.
  pub fn verify(&mut self) -> SealResult<bool> {
    self.require_stage(ReceiverStage::Decrypted, "verify")?;
    let content = self.content.as_ref().ok_or_else(|| not_loaded("decrypted content"))?;
    let signature = self.signature.as_ref().ok_or_else(|| not_loaded("signature"))?;
    let digest = ContentDigest::compute(content);
    let accepted = self.sender_public.verify(&digest, signature)?;
    if accepted {
      self.advance(ReceiverStage::Verified);
    } else {
      warn!("signature mismatch, receiver pipeline stays at {:?}", self.stage);
    }
    Ok(accepted)
  }

  fn require_stage(&self, expected: ReceiverStage, operation: &str) -> SealResult<()> {
    if self.stage != expected {
      return Err(SealError::StageNotReady(format!(
        "{operation} runs at stage {expected:?}, pipeline is at {:?}",
        self.stage
      )));
    }
    Ok(())
  }

  fn advance(&mut self, next: ReceiverStage) {
    debug!("receiver pipeline: {:?} -> {next:?}", self.stage);
    self.stage = next;
  }
}

fn not_loaded(what: &str) -> SealError {
  SealError::StageNotReady(format!("{what} is not loaded"))
}

/* ----------------------------------------------------------------- */
