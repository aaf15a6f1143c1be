//! Secure channel and stub construction
//!
//! The channel authenticates the server against the resolved trust root only;
//! no client certificate is presented. Connection is deferred until the first
//! RPC and reconnects are handled by the transport.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use threecities_common::proto::TransferVerificationServiceClient;
use threecities_common::{Error, Result, TransferVerificationRequest, TransferVerificationResponse};
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::debug;

use crate::config::Config;
use crate::trust_root::TrustRoot;

const PEM_CERT_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_CERT_END: &str = "-----END CERTIFICATE-----";

/// Typed handle exposing the verification RPC
#[async_trait]
pub trait VerificationStub: Send + Sync {
    async fn verify(
        &self,
        request: TransferVerificationRequest,
    ) -> std::result::Result<TransferVerificationResponse, tonic::Status>;
}

#[async_trait]
impl VerificationStub for TransferVerificationServiceClient<Channel> {
    async fn verify(
        &self,
        request: TransferVerificationRequest,
    ) -> std::result::Result<TransferVerificationResponse, tonic::Status> {
        // Clones share the underlying channel
        let mut client = self.clone();
        let response = client.transfer_verification(request).await?;
        Ok(response.into_inner())
    }
}

/// Builds a stub from trust-root bytes
pub trait ChannelFactory: Send + Sync {
    fn build(&self, trust_root: &TrustRoot) -> Result<Arc<dyn VerificationStub>>;
}

/// TLS gRPC channel to the verification service
pub struct GrpcChannelFactory {
    endpoint: String,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl GrpcChannelFactory {
    pub fn new(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
            request_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.endpoint(),
            config.connect_timeout(),
            config.request_timeout(),
        )
    }

    /// Open a lazily-connecting TLS channel
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self, trust_root: &TrustRoot) -> Result<Channel> {
        ensure_pem_certificate(trust_root.as_bytes())?;

        let tls =
            ClientTlsConfig::new().ca_certificate(Certificate::from_pem(trust_root.as_bytes()));

        let channel = Endpoint::from_shared(self.endpoint.clone())
            .map_err(|e| Error::InvalidEndpoint(format!("{}: {}", self.endpoint, e)))?
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .tls_config(tls)?
            .connect_lazy();

        debug!("Secure channel to {} created", self.endpoint);

        Ok(channel)
    }
}

impl ChannelFactory for GrpcChannelFactory {
    fn build(&self, trust_root: &TrustRoot) -> Result<Arc<dyn VerificationStub>> {
        let channel = self.connect(trust_root)?;
        Ok(Arc::new(TransferVerificationServiceClient::new(channel)))
    }
}

/// Reject bytes that can't contain a PEM certificate
///
/// Only the block markers are checked. The certificate body is parsed by the
/// TLS setup in [`GrpcChannelFactory::connect`]; this only makes a file
/// without any certificate block fail here, with a clear message, instead
/// of at the first handshake.
fn ensure_pem_certificate(bytes: &[u8]) -> Result<()> {
    let text = String::from_utf8_lossy(bytes);

    let begin = text.find(PEM_CERT_BEGIN).ok_or_else(|| {
        Error::InvalidCertificate("no PEM certificate block found".to_string())
    })?;

    if !text[begin..].contains(PEM_CERT_END) {
        return Err(Error::InvalidCertificate(
            "unterminated PEM certificate block".to_string(),
        ));
    }

    Ok(())
}
