//! Payment verification client
//!
//! Owns the lazily-built stub for the verification service and turns every
//! outcome of a verification attempt into a single boolean.
//!
//! **Lifecycle:**
//! 1. First call resolves the trust root, reads it and builds the channel
//! 2. Any failure along the way leaves the client uninitialized; the next
//!    call starts over
//! 3. Once a stub exists it is reused for the life of the client

use std::sync::Arc;
use threecities_common::{Error, Result, TransferVerificationRequest};
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::channel::{ChannelFactory, GrpcChannelFactory, VerificationStub};
use crate::config::{Config, VERIFICATION_SERVICE_ADDR};
use crate::trust_root::{TrustRoot, TrustRootResolver};

/// Client for the remote transfer verification service
pub struct VerificationClient {
    resolver: TrustRootResolver,
    factory: Arc<dyn ChannelFactory>,
    stub: OnceCell<Arc<dyn VerificationStub>>,
}

impl VerificationClient {
    /// Create a client for the production service
    pub fn new(config: &Config) -> Self {
        Self::with_parts(
            TrustRootResolver::from_config(config),
            Arc::new(GrpcChannelFactory::from_config(config)),
        )
    }

    /// Create a client from explicit collaborators
    pub fn with_parts(resolver: TrustRootResolver, factory: Arc<dyn ChannelFactory>) -> Self {
        Self {
            resolver,
            factory,
            stub: OnceCell::new(),
        }
    }

    /// Whether the stub has been built
    pub fn is_ready(&self) -> bool {
        self.stub.initialized()
    }

    /// Build the stub if it doesn't exist yet
    ///
    /// Concurrent callers wait on a single construction attempt. A failed
    /// attempt is not remembered, so the next call tries again.
    pub async fn ensure_initialized(&self) -> Result<()> {
        if self.stub.initialized() {
            return Ok(());
        }

        self.stub.get_or_try_init(|| self.build_stub()).await?;
        Ok(())
    }

    async fn build_stub(&self) -> Result<Arc<dyn VerificationStub>> {
        let location = self.resolver.resolve().await?;
        let trust_root = TrustRoot::read(&location).await?;
        let stub = self.factory.build(&trust_root)?;

        info!(
            "Verification channel to {} initialized (CA root: {}, source: {:?})",
            VERIFICATION_SERVICE_ADDR,
            location.path.display(),
            location.source
        );

        Ok(stub)
    }

    /// Verify a payment with the remote service
    ///
    /// Blocks the calling task until the RPC completes or fails.
    ///
    /// # Returns
    /// `true` if and only if the service positively verified the payment.
    /// Infrastructure failures and negative results both return `false`;
    /// the logs tell them apart.
    pub async fn verify_payment(&self, request: &TransferVerificationRequest) -> bool {
        if let Err(e) = self.ensure_initialized().await {
            log_init_failure(&e);
        }

        let Some(stub) = self.stub.get() else {
            error!("grpc stub unavailable, payment verification cannot proceed");
            return false;
        };

        match stub.verify(request.clone()).await {
            Ok(response) => {
                info!(
                    is_verified = response.is_verified,
                    "{} {}", response.description, response.error
                );
                response.is_verified
            }
            Err(status) => {
                error!("{}", Error::Rpc(status));
                false
            }
        }
    }
}

fn log_init_failure(e: &Error) {
    match e {
        Error::TrustRootNotFound { .. } => {
            error!("grpc init failed: {}", e);
        }
        Error::TrustRootUnreadable { .. } => {
            error!("grpc init failed, CA root cert unreadable: {}", e);
        }
        Error::InvalidCertificate(_) | Error::InvalidEndpoint(_) | Error::Channel(_) => {
            error!("failed to initialize grpc channel or stub: {}", e);
        }
        _ => {
            error!("grpc init failed: {}", e);
        }
    }
}
