//! Request/response mapping for the envelope operations.
//!
//! Handlers parse multipart or JSON input, call into `fileseal::ops` and wrap
//! the result in the `{ok, data, error}` envelope. Nothing cryptographic
//! happens in this module.

use axum::{
  extract::Multipart,
  http::{header, StatusCode},
  response::IntoResponse,
  Json,
};
use fileseal::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

/* -------------------------------- */
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
  pub ok: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRequest {
  pub encrypted_file: String,
  pub signature: String,
  pub encrypted_key: String,
}

fn ok_response<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
  (
    StatusCode::OK,
    Json(ApiResponse {
      ok: true,
      data: Some(data),
      error: None,
    }),
  )
}

fn error_response<T: Serialize>(status: StatusCode, msg: &str) -> (StatusCode, Json<ApiResponse<T>>) {
  (
    status,
    Json(ApiResponse {
      ok: false,
      data: None,
      error: Some(msg.to_string()),
    }),
  )
}

/// Map an operation failure onto a status code and a caller-facing message
/// that names the failed stage.
///
/// Bad input, bad key material and failed integrity checks are the caller's
/// problem (400); only failures of the server's own crypto operations are
/// reported as 500.
fn seal_error_response<T: Serialize>(err: SealError) -> (StatusCode, Json<ApiResponse<T>>) {
  let status = match &err {
    SealError::KeyGen(_) | SealError::Sign(_) | SealError::Encrypt(_) | SealError::Wrap(_) => {
      StatusCode::INTERNAL_SERVER_ERROR
    }
    _ => StatusCode::BAD_REQUEST,
  };
  if status.is_server_error() {
    tracing::error!(error = %err, stage = err.stage(), "Operation failed");
  } else {
    tracing::debug!(error = %err, stage = err.stage(), "Rejected request");
  }
  error_response(status, &format!("{err} (stage: {})", err.stage()))
}

fn attachment_response(filename: &str, content_type: &str, body: Vec<u8>) -> impl IntoResponse {
  (
    StatusCode::OK,
    [
      (header::CONTENT_TYPE, content_type.to_string()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
    ],
    body,
  )
}

/* -------------------------------- */

/// GET /api/keys/rsa
///
/// Generate a fresh RSA key pair and return both PEMs as JSON.
pub async fn generate_rsa() -> impl IntoResponse {
  match ops::generate_rsa_keypair() {
    Ok(pair) => ok_response(pair),
    Err(e) => seal_error_response(e),
  }
}

/// GET /api/keys/rsa/download
///
/// Generate a fresh RSA key pair and serve it as a two-entry archive.
pub async fn download_rsa() -> axum::response::Response {
  match ops::generate_rsa_keypair_archive() {
    Ok(archive) => {
      attachment_response(&format!("rsa_keys.{PACKAGE_EXTENSION}"), "application/octet-stream", archive)
        .into_response()
    }
    Err(e) => seal_error_response::<()>(e).into_response(),
  }
}

/// GET /api/keys/aes
///
/// Generate a fresh AES-256 key and return it hex-encoded as JSON.
pub async fn generate_aes() -> impl IntoResponse {
  match ops::generate_aes_key() {
    Ok(key) => ok_response(key),
    Err(e) => seal_error_response(e),
  }
}

/// GET /api/keys/aes/download
///
/// Generate a fresh AES-256 key and serve the hex string as a text file.
pub async fn download_aes() -> axum::response::Response {
  match ops::generate_aes_key() {
    Ok(key) => attachment_response("aes_key.txt", "text/plain", key.key.into_bytes()).into_response(),
    Err(e) => seal_error_response::<()>(e).into_response(),
  }
}

/// POST /api/prepare
///
/// Multipart form fields:
/// - `publicKey`: the recipient's public key PEM
/// - `file`: the file to be sealed
///
/// Returns the file metadata, its SHA-256 digest and the validated key.
pub async fn prepare(mut multipart: Multipart) -> impl IntoResponse {
  let mut public_key: Option<String> = None;
  let mut file: Option<(String, String, Vec<u8>)> = None;

  while let Ok(Some(field)) = multipart.next_field().await {
    let name = field.name().unwrap_or("").to_string();
    match name.as_str() {
      "publicKey" => {
        if let Ok(text) = field.text().await {
          public_key = Some(text);
        }
      }
      "file" => {
        let file_name = field.file_name().unwrap_or("unnamed").to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        match field.bytes().await {
          Ok(bytes) => file = Some((file_name, content_type, bytes.to_vec())),
          Err(e) => {
            tracing::warn!(error = %e, "Failed to read upload file bytes");
            return error_response(StatusCode::BAD_REQUEST, "Failed to read file data");
          }
        }
      }
      _ => {
        // Skip unknown fields
      }
    }
  }

  let Some(public_key) = public_key else {
    return seal_error_response(SealError::MissingInput("publicKey".to_owned()));
  };
  let Some((file_name, content_type, content)) = file else {
    return seal_error_response(SealError::MissingInput("file".to_owned()));
  };

  match ops::prepare(&public_key, &file_name, &content_type, &content) {
    Ok(prepared) => ok_response(prepared),
    Err(e) => seal_error_response(e),
  }
}

/// POST /api/seal
///
/// Multipart form fields:
/// - `privateKeySender`: the sender's private key PEM
/// - `publicKeyRecipient`: the recipient's public key PEM
/// - `file`: the file to seal
/// - `aesKey`: the symmetric key, hex-encoded
///
/// Returns the encrypted file, wrapped key and signature, base64-encoded.
pub async fn seal(mut multipart: Multipart) -> impl IntoResponse {
  let mut sender_secret: Option<String> = None;
  let mut recipient_public: Option<String> = None;
  let mut content: Option<Vec<u8>> = None;
  let mut aes_key: Option<String> = None;

  while let Ok(Some(field)) = multipart.next_field().await {
    let name = field.name().unwrap_or("").to_string();
    match name.as_str() {
      "privateKeySender" => {
        if let Ok(text) = field.text().await {
          sender_secret = Some(text);
        }
      }
      "publicKeyRecipient" => {
        if let Ok(text) = field.text().await {
          recipient_public = Some(text);
        }
      }
      "file" => match field.bytes().await {
        Ok(bytes) => content = Some(bytes.to_vec()),
        Err(e) => {
          tracing::warn!(error = %e, "Failed to read upload file bytes");
          return error_response(StatusCode::BAD_REQUEST, "Failed to read file data");
        }
      },
      "aesKey" => {
        if let Ok(text) = field.text().await {
          aes_key = Some(text);
        }
      }
      _ => {}
    }
  }

  let Some(sender_secret) = sender_secret else {
    return seal_error_response(SealError::MissingInput("privateKeySender".to_owned()));
  };
  let Some(recipient_public) = recipient_public else {
    return seal_error_response(SealError::MissingInput("publicKeyRecipient".to_owned()));
  };
  let Some(content) = content else {
    return seal_error_response(SealError::MissingInput("file".to_owned()));
  };
  let Some(aes_key) = aes_key else {
    return seal_error_response(SealError::MissingInput("aesKey".to_owned()));
  };

  match ops::seal(&sender_secret, &recipient_public, &content, &aes_key) {
    Ok(envelope) => ok_response(envelope),
    Err(e) => seal_error_response(e),
  }
}

/// POST /api/open
///
/// Multipart form fields:
/// - `privateKeyRecipient`: the recipient's private key PEM
/// - `publicKeySender`: the sender's public key PEM
/// - `encryptedFile`: base64 payload
/// - `signature`: base64 signature
/// - `encryptedKey`: base64 wrapped key
///
/// Returns the decrypted text and the verification verdict.
pub async fn open(mut multipart: Multipart) -> impl IntoResponse {
  let mut recipient_secret: Option<String> = None;
  let mut sender_public: Option<String> = None;
  let mut encrypted_file: Option<String> = None;
  let mut signature: Option<String> = None;
  let mut encrypted_key: Option<String> = None;

  while let Ok(Some(field)) = multipart.next_field().await {
    let name = field.name().unwrap_or("").to_string();
    let slot = match name.as_str() {
      "privateKeyRecipient" => &mut recipient_secret,
      "publicKeySender" => &mut sender_public,
      "encryptedFile" => &mut encrypted_file,
      "signature" => &mut signature,
      "encryptedKey" => &mut encrypted_key,
      _ => continue,
    };
    if let Ok(text) = field.text().await {
      *slot = Some(text);
    }
  }

  let Some(recipient_secret) = recipient_secret else {
    return seal_error_response(SealError::MissingInput("privateKeyRecipient".to_owned()));
  };
  let Some(sender_public) = sender_public else {
    return seal_error_response(SealError::MissingInput("publicKeySender".to_owned()));
  };
  let Some(encrypted_file) = encrypted_file else {
    return seal_error_response(SealError::MissingInput("encryptedFile".to_owned()));
  };
  let Some(signature) = signature else {
    return seal_error_response(SealError::MissingInput("signature".to_owned()));
  };
  let Some(encrypted_key) = encrypted_key else {
    return seal_error_response(SealError::MissingInput("encryptedKey".to_owned()));
  };

  match ops::open(&recipient_secret, &sender_public, &encrypted_file, &signature, &encrypted_key) {
    Ok(opened) => ok_response(opened),
    Err(e) => seal_error_response(e),
  }
}

/// POST /api/package
///
/// JSON body: `{encryptedFile, signature, encryptedKey}`, all base64.
/// Returns the assembled package as a download.
pub async fn package(Json(req): Json<PackageRequest>) -> axum::response::Response {
  match ops::package(&req.encrypted_file, &req.signature, &req.encrypted_key) {
    Ok(archive) => {
      attachment_response(&format!("package.{PACKAGE_EXTENSION}"), "application/octet-stream", archive)
        .into_response()
    }
    Err(e) => seal_error_response::<()>(e).into_response(),
  }
}

/// POST /api/package/open
///
/// Multipart form field `package`: the received archive. Returns the three
/// artifacts base64-encoded, ready for `/api/open`.
pub async fn open_package(mut multipart: Multipart) -> impl IntoResponse {
  let mut archive: Option<Vec<u8>> = None;

  while let Ok(Some(field)) = multipart.next_field().await {
    if field.name() == Some("package") {
      match field.bytes().await {
        Ok(bytes) => archive = Some(bytes.to_vec()),
        Err(e) => {
          tracing::warn!(error = %e, "Failed to read package bytes");
          return error_response(StatusCode::BAD_REQUEST, "Failed to read package data");
        }
      }
    }
  }

  let Some(archive) = archive else {
    return seal_error_response(SealError::MissingInput("package".to_owned()));
  };

  match ops::open_package(&archive) {
    Ok(envelope) => ok_response(envelope),
    Err(e) => seal_error_response(e),
  }
}

/// GET /health
pub async fn health() -> impl IntoResponse {
  Json(json!({
    "status": "ok",
    "service": "fileseal-server",
    "version": env!("CARGO_PKG_VERSION"),
  }))
}

/* ----------------------------------------------------------------- */
