//! Plugin server: go-plugin handshake and gRPC serving
//!
//! Terraform launches the provider binary with a magic cookie in the
//! environment and reads a single handshake line from stdout. Everything
//! else the provider prints must go to stderr.

use crate::error::{Result, TfplugError};
use crate::grpc::GrpcProviderServer;
use crate::proto::ProviderServer;
use crate::provider::Provider;
use std::io::Write;
use std::path::PathBuf;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::info;

pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

const PROTOCOL_VERSION: u32 = 6;
const CORE_PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Serve over TLS when set, plaintext otherwise
    pub tls: Option<TlsPaths>,
    pub max_message_size: usize,
    /// Skip the magic cookie check, for running outside Terraform
    pub skip_cookie_check: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tls: None,
            max_message_size: 256 << 20,
            skip_cookie_check: false,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `{PREFIX}_TLS_CERT` and `{PREFIX}_TLS_KEY`; TLS is enabled only
    /// when both are set
    pub fn from_env(prefix: &str) -> Self {
        let cert = std::env::var(format!("{}_TLS_CERT", prefix)).ok();
        let key = std::env::var(format!("{}_TLS_KEY", prefix)).ok();
        let tls = match (cert, key) {
            (Some(cert), Some(key)) if !cert.is_empty() && !key.is_empty() => Some(TlsPaths {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            _ => None,
        };
        Self {
            tls,
            ..Self::default()
        }
    }

    pub fn with_tls(mut self, cert_path: PathBuf, key_path: PathBuf) -> Self {
        self.tls = Some(TlsPaths {
            cert_path,
            key_path,
        });
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn skip_cookie_check(mut self) -> Self {
        self.skip_cookie_check = true;
        self
    }
}

/// Fails unless Terraform launched this process
pub fn check_magic_cookie() -> Result<()> {
    match std::env::var(MAGIC_COOKIE_KEY) {
        Ok(value) if value == MAGIC_COOKIE_VALUE => Ok(()),
        _ => Err(TfplugError::HandshakeError(
            "this binary is a Terraform plugin and is not meant to be executed directly"
                .to_string(),
        )),
    }
}

pub fn handshake_line(addr: std::net::SocketAddr) -> String {
    format!(
        "{}|{}|tcp|{}|grpc",
        CORE_PROTOCOL_VERSION, PROTOCOL_VERSION, addr
    )
}

/// Main entry point for running a provider
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    if !config.skip_cookie_check {
        check_magic_cookie()?;
    }

    let grpc_server = GrpcProviderServer::new(provider);
    let provider_service = ProviderServer::new(grpc_server)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let mut builder = Server::builder();
    if let Some(tls) = &config.tls {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let cert = tokio::fs::read(&tls.cert_path)
            .await
            .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;
        let key = tokio::fs::read(&tls.key_path)
            .await
            .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;

        builder = builder
            .tls_config(ServerTlsConfig::new().identity(Identity::from_pem(cert, key)))?;
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", handshake_line(addr))?;
    stdout.flush()?;
    info!(%addr, tls = config.tls.is_some(), "provider listening");

    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
    builder
        .add_service(provider_service)
        .serve_with_incoming_shutdown(incoming, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

pub async fn serve_default<P: Provider + 'static>(provider: P) -> Result<()> {
    serve(provider, ServerConfig::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_line_format() {
        let addr: std::net::SocketAddr = "127.0.0.1:4567".parse().unwrap();
        assert_eq!(handshake_line(addr), "1|6|tcp|127.0.0.1:4567|grpc");
    }

    #[test]
    fn default_config_is_plaintext() {
        let config = ServerConfig::new();
        assert!(config.tls.is_none());
        assert!(!config.skip_cookie_check);
    }

    #[test]
    fn with_tls_sets_paths() {
        let config = ServerConfig::new().with_tls("cert.pem".into(), "key.pem".into());
        let tls = config.tls.unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("cert.pem"));
        assert_eq!(tls.key_path, PathBuf::from("key.pem"));
    }
}
