//! HTTP surface for the fileseal envelope pipeline.
//!
//! Every cryptographic operation lives in the `fileseal` crate; this binary
//! only maps multipart and JSON requests onto those operations:
//!
//! - `GET  /api/keys/rsa`: fresh RSA key pair as JSON
//! - `GET  /api/keys/rsa/download`: the same pair as a download archive
//! - `GET  /api/keys/aes`: fresh AES key as JSON
//! - `GET  /api/keys/aes/download`: the same key as a text attachment
//! - `POST /api/prepare`: validate a public key and digest a file
//! - `POST /api/seal`: sign-and-encrypt a file
//! - `POST /api/open`: verify-and-decrypt an envelope
//! - `POST /api/package`: bundle the three artifacts into one file
//! - `POST /api/package/open`: split a package back into artifacts
//! - `GET  /health`
//!
//! Key material travels inside requests and never touches disk here; the
//! server keeps no state between requests.

mod api;

use axum::{
  extract::DefaultBodyLimit,
  http::Method,
  routing::{get, post},
  Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/* -------------------------------- */
#[derive(Parser, Debug)]
#[command(name = "fileseal-server", version, about = "HTTP surface for the fileseal envelope pipeline")]
struct Args {
  /// Address to listen on
  #[arg(long, default_value = "0.0.0.0:8080", env = "FILESEAL_LISTEN")]
  listen: String,

  /// Maximum accepted request body size in MiB
  #[arg(long, default_value_t = 32, env = "FILESEAL_MAX_UPLOAD_MIB")]
  max_upload_mib: usize,
}

/* -------------------------------- */
#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fileseal_server=info,tower_http=info".into()),
    )
    .init();

  let args = Args::parse();

  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET, Method::POST])
    .allow_headers(Any);

  let app = Router::new()
    .route("/api/keys/rsa", get(api::generate_rsa))
    .route("/api/keys/rsa/download", get(api::download_rsa))
    .route("/api/keys/aes", get(api::generate_aes))
    .route("/api/keys/aes/download", get(api::download_aes))
    .route("/api/prepare", post(api::prepare))
    .route("/api/seal", post(api::seal))
    .route("/api/open", post(api::open))
    .route("/api/package", post(api::package))
    .route("/api/package/open", post(api::open_package))
    .route("/health", get(api::health))
    .layer(DefaultBodyLimit::max(args.max_upload_mib * 1024 * 1024))
    .layer(cors)
    .layer(TraceLayer::new_for_http());

  tracing::info!("fileseal server starting on {}", args.listen);

  let listener = tokio::net::TcpListener::bind(&args.listen)
    .await
    .expect("Failed to bind address");

  axum::serve(listener, app)
    .await
    .expect("Server error");
}

/* ----------------------------------------------------------------- */
#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_args_defaults() {
    let args = Args::try_parse_from(["fileseal-server"]).unwrap();
    assert_eq!(args.listen, "0.0.0.0:8080");
    assert_eq!(args.max_upload_mib, 32);
  }

  #[test]
  fn test_args_override() {
    let args = Args::try_parse_from(["fileseal-server", "--listen", "127.0.0.1:9999", "--max-upload-mib", "8"]).unwrap();
    assert_eq!(args.listen, "127.0.0.1:9999");
    assert_eq!(args.max_upload_mib, 8);
  }
}
