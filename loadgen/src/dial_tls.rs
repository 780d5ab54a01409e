//! TLS handshake over a dialed TCP stream
//!
//! Certificate verification is disabled for every handshake.
//! The connector is built once per batch through
//! [`create_tls_connector_without_verification`] and shared by every attempt.

use std::sync::Arc;

use rustls::pki_types::{CertificateDer, ServerName};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::transport::error::DialError;

/// Perform a TLS handshake on `stream`, using `host` for SNI
///
/// IP literals are accepted as server names, so "10.0.0.1:443" works as well
/// as a DNS name.
pub async fn handshake(
    host: &str,
    stream: TcpStream,
    connector: &TlsConnector,
) -> Result<TlsStream<TcpStream>, DialError> {
    let server_name = ServerName::try_from(host)
        .map_err(|e| DialError::InvalidServerName(format!("'{}': {}", host, e)))?
        .to_owned();

    connector
        .connect(server_name, stream)
        .await
        .map_err(DialError::TlsHandshake)
}

/// Create a TLS connector with certificate verification disabled
///
/// # Returns
/// Configured TLS connector that accepts any certificate
pub fn create_tls_connector_without_verification() -> Result<TlsConnector, DialError> {
    // Install the default crypto provider if not already installed
    // This is safe to call multiple times - it will only install once
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let config = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoCertificateVerification))
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Certificate verifier that accepts all certificates
#[derive(Debug)]
struct NoCertificateVerification;

impl rustls::client::danger::ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_creation() {
        assert!(create_tls_connector_without_verification().is_ok());
        // Installing the provider twice must not fail
        assert!(create_tls_connector_without_verification().is_ok());
    }

    #[tokio::test]
    async fn test_handshake_against_plain_tcp_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                use tokio::io::AsyncWriteExt;
                let _ = socket.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await;
            }
        });

        let connector = create_tls_connector_without_verification().unwrap();
        let stream = TcpStream::connect(addr).await.unwrap();
        let result = handshake("127.0.0.1", stream, &connector).await;
        assert!(matches!(result, Err(DialError::TlsHandshake(_))));
    }
}
