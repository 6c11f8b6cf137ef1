//! rustls integration: WebPKI validation first, pin policy second.

use crate::pinning::chain::VerifiedChain;
use crate::pinning::errors::PinError;
use crate::pinning::util::{der_sequence, from_unix_seconds, spki_der};
use crate::pinning::verifier::KeyPins;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::{CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    CertificateError, DigitallySignedStruct, Error as TlsError, RootCertStore, SignatureScheme,
};
use std::sync::Arc;
use tracing::debug;
use webpki::{EndEntityCert, KeyUsage};

/// Server certificate verifier that enforces [`KeyPins`] on top of normal
/// chain validation.
///
/// rustls checks the chain, server name and stapled OCSP. The certification
/// path is then rebuilt against the same roots, and only the certificates on
/// that path, trust anchor included, are matched against the pins. Extra
/// certificates the server sends but the path does not use never count.
#[derive(Debug)]
pub struct PinningServerVerifier {
    inner: Arc<WebPkiServerVerifier>,
    roots: Arc<RootCertStore>,
    algorithms: WebPkiSupportedAlgorithms,
    pins: Arc<KeyPins>,
}

impl PinningServerVerifier {
    pub fn new(
        roots: Arc<RootCertStore>,
        provider: Arc<CryptoProvider>,
        pins: Arc<KeyPins>,
    ) -> Result<Self, PinError> {
        let algorithms = provider.signature_verification_algorithms;
        let inner = WebPkiServerVerifier::builder_with_provider(roots.clone(), provider)
            .build()
            .map_err(|e| PinError::Config(format!("webpki verifier: {e}")))?;
        Ok(Self {
            inner,
            roots,
            algorithms,
            pins,
        })
    }

    pub fn pins(&self) -> &Arc<KeyPins> {
        &self.pins
    }

    /// SubjectPublicKeyInfo encodings along the path WebPKI validates for
    /// `end_entity`, leaf first and trust anchor last.
    fn verified_spkis(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<Vec<Vec<u8>>, TlsError> {
        let cert = EndEntityCert::try_from(end_entity)
            .map_err(|e| TlsError::General(format!("end-entity certificate: {e}")))?;
        let path = cert
            .verify_for_usage(
                self.algorithms.all,
                &self.roots.roots,
                intermediates,
                now,
                KeyUsage::server_auth(),
                None,
                None,
            )
            .map_err(|e| TlsError::General(format!("rebuild verified path: {e}")))?;

        let mut spkis = Vec::with_capacity(2 + intermediates.len());
        spkis.push(owned_spki(end_entity.as_ref())?);
        for intermediate in path.intermediate_certificates() {
            spkis.push(owned_spki(intermediate.der().as_ref())?);
        }
        spkis.push(der_sequence(
            path.anchor().subject_public_key_info.as_ref(),
        ));
        Ok(spkis)
    }
}

impl ServerCertVerifier for PinningServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)?;

        let host = server_host(server_name)
            .ok_or_else(|| TlsError::General("unsupported server name type".into()))?;

        let spkis = self.verified_spkis(end_entity, intermediates, now)?;
        let chain = VerifiedChain::from_spkis(spkis.iter().map(Vec::as_slice).collect());

        self.pins
            .verify_at(&host, std::slice::from_ref(&chain), from_unix_seconds(now.as_secs()))
            .map_err(to_tls_error)?;

        debug!(host = %host, path_len = chain.len(), "peer certificate passed pin policy");
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Storage key for a server name: the DNS name as presented, or the IP text.
pub fn server_host(server_name: &ServerName<'_>) -> Option<String> {
    match server_name {
        ServerName::DnsName(name) => Some(name.as_ref().to_owned()),
        ServerName::IpAddress(ip) => Some(std::net::IpAddr::from(ip.clone()).to_string()),
        _ => None,
    }
}

fn owned_spki(cert_der: &[u8]) -> Result<Vec<u8>, TlsError> {
    spki_der(cert_der)
        .map(<[u8]>::to_vec)
        .map_err(|e| TlsError::General(e.to_string()))
}

fn to_tls_error(err: PinError) -> TlsError {
    if err.is_policy_violation() {
        TlsError::InvalidCertificate(CertificateError::ApplicationVerificationFailure)
    } else {
        TlsError::General(err.to_string())
    }
}
