//! TLS wrapping of a connected `TcpStream` with rustls.

use std::net::TcpStream;
use std::sync::{Arc, OnceLock};

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore};
use rustls::{SignatureScheme, StreamOwned};

use super::{FailureKind, TransportFailure};

pub(crate) type TlsStream = StreamOwned<ClientConnection, TcpStream>;

type CachedConfig = Result<Arc<ClientConfig>, rustls::Error>;

static VERIFYING: OnceLock<CachedConfig> = OnceLock::new();
static NON_VERIFYING: OnceLock<CachedConfig> = OnceLock::new();

fn tls_failure(e: impl std::fmt::Display) -> TransportFailure {
    TransportFailure::new(FailureKind::TlsConnect, e.to_string())
}

/// Wrap `tcp` in TLS and complete the handshake.
///
/// With `verify` false, any server certificate is accepted. Handshake
/// signatures are still checked.
pub(crate) fn connect(host: &str, tcp: TcpStream, verify: bool) -> Result<TlsStream, TransportFailure> {
    let cached = if verify {
        VERIFYING.get_or_init(|| build_config(true))
    } else {
        NON_VERIFYING.get_or_init(|| build_config(false))
    };
    let config = cached.clone().map_err(tls_failure)?;

    let server_name = ServerName::try_from(host.to_string()).map_err(tls_failure)?;

    let mut conn = ClientConnection::new(config, server_name).map_err(tls_failure)?;
    let mut tcp = tcp;

    // Drive the handshake here so certificate problems surface as TLS failures
    // rather than as send/receive errors later.
    while conn.is_handshaking() {
        conn.complete_io(&mut tcp).map_err(tls_failure)?;
    }

    Ok(StreamOwned::new(conn, tcp))
}

fn build_config(verify: bool) -> CachedConfig {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let config = if verify {
        let mut root_store = RootCertStore::empty();
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
        builder
            .with_root_certificates(root_store)
            .with_no_client_auth()
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
            .with_no_client_auth()
    };

    Ok(Arc::new(config))
}

#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
