//! TLS acceptor for https listeners.

use crate::config::TlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

fn open(path: &str, what: &str) -> Result<BufReader<File>, anyhow::Error> {
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open {what} file '{path}': {e}"))?;
    Ok(BufReader::new(file))
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, anyhow::Error> {
    let mut reader = open(path, "certificate")?;
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<Result<_, _>>()
        .map_err(|e| anyhow::anyhow!("Failed to parse certificate file '{path}': {e}"))?;
    if certs.is_empty() {
        anyhow::bail!("No certificates found in certificate file: {path}");
    }
    Ok(certs)
}

/// First PKCS8, RSA or EC key in the file
fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>, anyhow::Error> {
    let mut reader = open(path, "private key")?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| anyhow::anyhow!("Failed to parse private key file '{path}': {e}"))?
        .ok_or_else(|| anyhow::anyhow!("No private key found in key file: {path}"))
}

/// Create a TLS acceptor from PEM certificate and key files.
pub fn create_tls_acceptor(tls: &TlsConfig) -> Result<TlsAcceptor, anyhow::Error> {
    let certs = load_certs(&tls.cert_path)?;
    let key = load_private_key(&tls.key_path)?;

    // ring is pinned explicitly; the default provider is ambiguous when both
    // ring and aws-lc-rs are compiled in
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| anyhow::anyhow!("Failed to select TLS protocol versions: {e}"))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| anyhow::anyhow!("Failed to build TLS configuration: {e}"))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}
