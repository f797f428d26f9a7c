use crate::error::{SealError, SealResult};

/// First bytes of every package: `FSL` plus a format version
pub const PACKAGE_MAGIC: [u8; 4] = [0x46, 0x53, 0x4C, 0x01];
/// File extension used when a package is served as an attachment
pub const PACKAGE_EXTENSION: &str = "fsc";

/// AES-GCM payload entry name
pub const ENTRY_PAYLOAD: &str = "encrypted_file.bin";
/// Sender signature entry name
pub const ENTRY_SIGNATURE: &str = "signature.sig";
/// RSA-wrapped symmetric key entry name
pub const ENTRY_WRAPPED_KEY: &str = "encrypted_key.key";

/* -------------------------------- */
/// Builder for the flat named-entry container.
///
/// Layout: magic, a one-byte entry count, then per entry a little-endian u16
/// name length, the UTF-8 name, a little-endian u32 data length and the data.
/// No compression, no padding between entries.
#[derive(Debug, Default)]
pub struct PackageWriter {
  entries: Vec<(String, Vec<u8>)>,
}

impl PackageWriter {
  pub fn new() -> Self {
    Self { entries: Vec::new() }
  }

  /// Append a named entry
  pub fn entry(mut self, name: &str, data: Vec<u8>) -> Self {
    self.entries.push((name.to_owned(), data));
    self
  }

  /// Serialize all entries into the container bytes
  pub fn finish(self) -> SealResult<Vec<u8>> {
    let count = u8::try_from(self.entries.len())
      .map_err(|_| SealError::MalformedPackage(format!("too many entries: {}", self.entries.len())))?;
    let total: usize = self.entries.iter().map(|(name, data)| 6 + name.len() + data.len()).sum();
    let mut out = Vec::with_capacity(PACKAGE_MAGIC.len() + 1 + total);
    out.extend_from_slice(&PACKAGE_MAGIC);
    out.push(count);
    for (name, data) in &self.entries {
      let name_len = u16::try_from(name.len())
        .map_err(|_| SealError::MalformedPackage(format!("entry name too long: {} bytes", name.len())))?;
      let data_len = u32::try_from(data.len())
        .map_err(|_| SealError::MalformedPackage(format!("entry too large: {} bytes", data.len())))?;
      out.extend_from_slice(&name_len.to_le_bytes());
      out.extend_from_slice(name.as_bytes());
      out.extend_from_slice(&data_len.to_le_bytes());
      out.extend_from_slice(data);
    }
    Ok(out)
  }
}

/* -------------------------------- */
/// The three blobs a sealed package carries
#[derive(Debug)]
pub struct PackageContents {
  pub payload: Vec<u8>,
  pub signature: Vec<u8>,
  pub wrapped_key: Vec<u8>,
}

/// Assemble the three sealed-envelope blobs into a package
pub fn pack(payload: &[u8], signature: &[u8], wrapped_key: &[u8]) -> SealResult<Vec<u8>> {
  PackageWriter::new()
    .entry(ENTRY_PAYLOAD, payload.to_vec())
    .entry(ENTRY_SIGNATURE, signature.to_vec())
    .entry(ENTRY_WRAPPED_KEY, wrapped_key.to_vec())
    .finish()
}

/// Parse a container into its named entries, in file order.
///
/// Checks the magic, the declared count, per-entry bounds and that no bytes
/// trail the last entry. Entry names are not interpreted here.
pub fn read_entries(archive: &[u8]) -> SealResult<Vec<(String, Vec<u8>)>> {
  let mut cursor = Cursor { buf: archive, pos: 0 };
  let magic = cursor.take(PACKAGE_MAGIC.len())?;
  if magic != PACKAGE_MAGIC {
    return Err(SealError::MalformedPackage("not a sealed package (bad magic)".to_owned()));
  }
  let count = cursor.take(1)?[0];

  let mut entries = Vec::with_capacity(count as usize);
  for _ in 0..count {
    let name_len = cursor.take_u16()? as usize;
    let name = std::str::from_utf8(cursor.take(name_len)?)
      .map_err(|_| SealError::MalformedPackage("entry name is not UTF-8".to_owned()))?
      .to_owned();
    let data_len = cursor.take_u32()? as usize;
    let data = cursor.take(data_len)?.to_vec();
    entries.push((name, data));
  }
  if cursor.pos != archive.len() {
    return Err(SealError::MalformedPackage(format!(
      "{} trailing bytes after the last entry",
      archive.len() - cursor.pos
    )));
  }
  Ok(entries)
}

/// Split a sealed package back into its three blobs.
///
/// On top of [`read_entries`], an unknown or repeated entry name and a
/// missing entry are rejected as [`SealError::MalformedPackage`].
pub fn unpack(archive: &[u8]) -> SealResult<PackageContents> {
  let mut payload = None;
  let mut signature = None;
  let mut wrapped_key = None;
  for (name, data) in read_entries(archive)? {
    let slot = match name.as_str() {
      ENTRY_PAYLOAD => &mut payload,
      ENTRY_SIGNATURE => &mut signature,
      ENTRY_WRAPPED_KEY => &mut wrapped_key,
      _ => return Err(SealError::MalformedPackage(format!("unexpected entry: {name}"))),
    };
    if slot.replace(data).is_some() {
      return Err(SealError::MalformedPackage(format!("duplicate entry: {name}")));
    }
  }

  let require = |slot: Option<Vec<u8>>, name: &str| {
    slot.ok_or_else(|| SealError::MalformedPackage(format!("missing entry: {name}")))
  };
  Ok(PackageContents {
    payload: require(payload, ENTRY_PAYLOAD)?,
    signature: require(signature, ENTRY_SIGNATURE)?,
    wrapped_key: require(wrapped_key, ENTRY_WRAPPED_KEY)?,
  })
}

/* -------------------------------- */
struct Cursor<'a> {
  buf: &'a [u8],
  pos: usize,
}

impl<'a> Cursor<'a> {
  fn take(&mut self, n: usize) -> SealResult<&'a [u8]> {
    let end = self
      .pos
      .checked_add(n)
      .ok_or_else(|| SealError::MalformedPackage("entry length overflow".to_owned()))?;
    if end > self.buf.len() {
      return Err(SealError::MalformedPackage(format!(
        "need {n} bytes at offset {}, {} remain",
        self.pos,
        self.buf.len() - self.pos
      )));
    }
    let out = &self.buf[self.pos..end];
    self.pos = end;
    Ok(out)
  }

  fn take_u16(&mut self) -> SealResult<u16> {
    let b = self.take(2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
  }

  fn take_u32(&mut self) -> SealResult<u32> {
    let b = self.take(4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
  }
}

/* ----------------------------------------------------------------- */
#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pack_unpack_round_trip() {
    let archive = pack(b"ciphertext bytes", b"signature bytes", b"wrapped key bytes").unwrap();
    assert_eq!(&archive[..4], &PACKAGE_MAGIC);

    let contents = unpack(&archive).unwrap();
    assert_eq!(contents.payload, b"ciphertext bytes");
    assert_eq!(contents.signature, b"signature bytes");
    assert_eq!(contents.wrapped_key, b"wrapped key bytes");
  }

  #[test]
  fn test_empty_blobs_round_trip() {
    let archive = pack(b"", b"", b"").unwrap();
    let contents = unpack(&archive).unwrap();
    assert!(contents.payload.is_empty());
    assert!(contents.signature.is_empty());
    assert!(contents.wrapped_key.is_empty());
  }

  #[test]
  fn test_unpack_rejects_bad_magic() {
    let mut archive = pack(b"a", b"b", b"c").unwrap();
    archive[0] ^= 0xFF;
    assert!(matches!(unpack(&archive), Err(SealError::MalformedPackage(_))));
  }

  #[test]
  fn test_unpack_rejects_every_truncation() {
    let archive = pack(b"payload", b"sig", b"key").unwrap();
    for len in 0..archive.len() {
      assert!(
        matches!(unpack(&archive[..len]), Err(SealError::MalformedPackage(_))),
        "prefix of {len} bytes was accepted"
      );
    }
  }

  #[test]
  fn test_unpack_rejects_trailing_bytes() {
    let mut archive = pack(b"a", b"b", b"c").unwrap();
    archive.push(0);
    assert!(matches!(unpack(&archive), Err(SealError::MalformedPackage(_))));
  }

  #[test]
  fn test_unpack_rejects_missing_entry() {
    let archive = PackageWriter::new()
      .entry(ENTRY_PAYLOAD, b"a".to_vec())
      .entry(ENTRY_SIGNATURE, b"b".to_vec())
      .finish()
      .unwrap();
    let err = unpack(&archive).unwrap_err();
    assert!(err.to_string().contains(ENTRY_WRAPPED_KEY));
  }

  #[test]
  fn test_unpack_rejects_unknown_entry() {
    let archive = PackageWriter::new()
      .entry(ENTRY_PAYLOAD, b"a".to_vec())
      .entry(ENTRY_SIGNATURE, b"b".to_vec())
      .entry("virus.exe", b"c".to_vec())
      .finish()
      .unwrap();
    let err = unpack(&archive).unwrap_err();
    assert!(err.to_string().contains("virus.exe"));
  }

  #[test]
  fn test_unpack_rejects_duplicate_entry() {
    let archive = PackageWriter::new()
      .entry(ENTRY_PAYLOAD, b"a".to_vec())
      .entry(ENTRY_PAYLOAD, b"a".to_vec())
      .entry(ENTRY_SIGNATURE, b"b".to_vec())
      .entry(ENTRY_WRAPPED_KEY, b"c".to_vec())
      .finish()
      .unwrap();
    let err = unpack(&archive).unwrap_err();
    assert!(err.to_string().contains("duplicate"));
  }

  #[test]
  fn test_unpack_rejects_non_utf8_name() {
    let mut archive = Vec::new();
    archive.extend_from_slice(&PACKAGE_MAGIC);
    archive.push(1);
    archive.extend_from_slice(&2u16.to_le_bytes());
    archive.extend_from_slice(&[0xFF, 0xFE]);
    archive.extend_from_slice(&0u32.to_le_bytes());
    let err = unpack(&archive).unwrap_err();
    assert!(err.to_string().contains("UTF-8"));
  }

  #[test]
  fn test_writer_rejects_oversized_name() {
    let long = "x".repeat(u16::MAX as usize + 1);
    let archive = PackageWriter::new().entry(&long, Vec::new()).finish();
    assert!(matches!(archive, Err(SealError::MalformedPackage(_))));
  }
}
