//! Client mTLS certificate loading.
//!
//! This module only turns PEM files into an identity `reqwest` can use; it
//! never touches the handshake or upstream TLS verification, both of which
//! are the HTTP/TLS library's job.

use std::path::Path;

use crate::error::ProxyError;

/// A loaded client certificate chain plus private key, ready to hand to
/// `reqwest::ClientBuilder::identity`.
pub struct ClientIdentity {
    /// PEM-encoded certificate chain followed by the private key, the form
    /// `reqwest::Identity::from_pem` expects.
    pub pem_bundle: Vec<u8>,
}

impl ClientIdentity {
    /// Load a client certificate/key pair from disk and concatenate them
    /// into the combined PEM bundle `reqwest` wants for an mTLS identity.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, ProxyError> {
        let cert_pem = std::fs::read(cert_path)
            .map_err(|e| ProxyError::Tls(format!("reading {}: {e}", cert_path.display())))?;
        let key_pem = std::fs::read(key_path)
            .map_err(|e| ProxyError::Tls(format!("reading {}: {e}", key_path.display())))?;

        validate_pem(&cert_pem, "certificate", cert_path)?;
        validate_pem(&key_pem, "private key", key_path)?;

        let mut pem_bundle = cert_pem;
        pem_bundle.extend_from_slice(b"\n");
        pem_bundle.extend_from_slice(&key_pem);
        Ok(Self { pem_bundle })
    }
}

/// Parse-check a PEM file with `rustls-pemfile` so a malformed cert/key is
/// rejected at startup rather than surfacing as an opaque handshake error.
fn validate_pem(pem: &[u8], kind: &str, path: &Path) -> Result<(), ProxyError> {
    let mut reader = std::io::BufReader::new(pem);
    let items = rustls_pemfile::read_all(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ProxyError::Tls(format!("parsing {kind} {}: {e}", path.display())))?;
    if items.is_empty() {
        return Err(ProxyError::Tls(format!(
            "{kind} file {} contained no PEM items",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CERT: &str = include_str!("../tests/fixtures/client.crt.pem");
    const TEST_KEY: &str = include_str!("../tests/fixtures/client.key.pem");

    #[test]
    fn loads_and_concatenates_valid_pem_pair() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("client.crt");
        let key_path = dir.path().join("client.key");
        std::fs::write(&cert_path, TEST_CERT).unwrap();
        std::fs::write(&key_path, TEST_KEY).unwrap();

        let identity = ClientIdentity::load(&cert_path, &key_path).unwrap();
        assert!(identity.pem_bundle.starts_with(b"-----BEGIN CERTIFICATE-----"));
    }

    #[test]
    fn rejects_non_pem_cert() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("client.crt");
        let key_path = dir.path().join("client.key");
        std::fs::write(&cert_path, b"not a certificate").unwrap();
        std::fs::write(&key_path, TEST_KEY).unwrap();

        assert!(ClientIdentity::load(&cert_path, &key_path).is_err());
    }
}
