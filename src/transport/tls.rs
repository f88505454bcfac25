//! TLS client configuration and certificate loading.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::{ClientConfig, RootCertStore};

use crate::transport::TransportError;

/// Build a client TLS configuration trusting the CA certificates in `cert_path` (PEM).
pub fn load_client_config(cert_path: &Path) -> Result<Arc<ClientConfig>, TransportError> {
    if !cert_path.exists() {
        return Err(TransportError::Credentials(format!(
            "certificate file not found: {:?}",
            cert_path
        )));
    }

    let file = File::open(cert_path).map_err(|e| {
        TransportError::Credentials(format!("cannot open {:?}: {}", cert_path, e))
    })?;
    let mut reader = BufReader::new(file);

    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| {
            TransportError::Credentials(format!("cannot parse {:?}: {}", cert_path, e))
        })?;
        roots
            .add(cert)
            .map_err(|e| TransportError::Credentials(format!("rejected certificate: {}", e)))?;
    }

    if roots.is_empty() {
        return Err(TransportError::Credentials(format!(
            "no certificates found in {:?}",
            cert_path
        )));
    }

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Credentials(format!("tls setup failed: {}", e)))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_a_credential_error() {
        let err = load_client_config(Path::new("/nonexistent/hub-ca.pem")).unwrap_err();
        assert!(matches!(err, TransportError::Credentials(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn file_without_certificates_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not a certificate").unwrap();

        let err = load_client_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("no certificates"));
    }
}
