//! Synchronous facade for hosts that don't want to deal with async

use std::sync::{Mutex, OnceLock, PoisonError};
use threecities_common::{Error, Result, TransferVerificationRequest};
use tracing::error;

use crate::client::VerificationClient;
use crate::config::Config;

/// Blocking wrapper around [`VerificationClient`]
///
/// Owns a small runtime that drives the channel in the background.
/// `verify_payment` blocks the calling thread; it is safe to call from
/// plain threads and from inside another tokio runtime.
pub struct BlockingVerificationClient {
    // Only taken in `Drop`
    runtime: Option<tokio::runtime::Runtime>,
    inner: VerificationClient,
}

impl BlockingVerificationClient {
    /// Create a blocking client for the production service
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_client(VerificationClient::new(config))
    }

    /// Wrap an existing client
    pub fn with_client(inner: VerificationClient) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("payment-verifier")
            .enable_all()
            .build()
            .map_err(|e| Error::Runtime(format!("failed to create runtime: {}", e)))?;

        Ok(Self {
            runtime: Some(runtime),
            inner,
        })
    }

    /// See [`VerificationClient::verify_payment`]
    pub fn verify_payment(&self, request: &TransferVerificationRequest) -> bool {
        let Some(runtime) = self.runtime.as_ref() else {
            return false;
        };

        if tokio::runtime::Handle::try_current().is_err() {
            return runtime.block_on(self.inner.verify_payment(request));
        }

        // `block_on` panics on a thread that is already inside a runtime, so
        // drive the call from a helper thread and wait for it here.
        std::thread::scope(|scope| {
            scope
                .spawn(|| runtime.block_on(self.inner.verify_payment(request)))
                .join()
        })
        .unwrap_or_else(|_| {
            error!("payment verification thread panicked");
            false
        })
    }

    pub fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }
}

impl Drop for BlockingVerificationClient {
    fn drop(&mut self) {
        // A plain drop blocks, which panics inside an async context
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Process-wide client that is only stored once it has been built
struct ProcessClient {
    client: OnceLock<BlockingVerificationClient>,
    init: Mutex<()>,
}

impl ProcessClient {
    const fn new() -> Self {
        Self {
            client: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Return the client, building it if needed
    ///
    /// A failed build is logged and not remembered; the next call tries again.
    fn get_or_try_init<F>(&self, build: F) -> Option<&BlockingVerificationClient>
    where
        F: FnOnce() -> anyhow::Result<BlockingVerificationClient>,
    {
        if let Some(client) = self.client.get() {
            return Some(client);
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = self.client.get() {
            return Some(client);
        }

        match build() {
            Ok(client) => Some(self.client.get_or_init(|| client)),
            Err(e) => {
                error!("failed to create payment verifier: {:#}", e);
                None
            }
        }
    }
}

static GLOBAL_CLIENT: ProcessClient = ProcessClient::new();

/// Verify a payment using the process-wide client
///
/// The client is configured from the environment on first successful use.
/// Returns `true` if and only if the payment was successfully verified.
pub fn verify_payment(request: &TransferVerificationRequest) -> bool {
    match GLOBAL_CLIENT.get_or_try_init(client_from_env) {
        Some(client) => client.verify_payment(request),
        None => {
            error!("payment verifier unavailable, payment verification cannot proceed");
            false
        }
    }
}

fn client_from_env() -> anyhow::Result<BlockingVerificationClient> {
    let config = Config::from_env()?;
    Ok(BlockingVerificationClient::new(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::GrpcChannelFactory;
    use crate::trust_root::tests::FakeCaTool;
    use crate::trust_root::TrustRootResolver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn unavailable_client(tool: Arc<FakeCaTool>) -> BlockingVerificationClient {
        let resolver = TrustRootResolver::new(tool, "CA_ROOT").with_env_lookup(|_| None);
        let client = VerificationClient::with_parts(
            resolver,
            Arc::new(GrpcChannelFactory::from_config(&Config::default())),
        );
        BlockingVerificationClient::with_client(client).unwrap()
    }

    #[test]
    fn test_blocking_unavailable_returns_false() {
        let tool = FakeCaTool::failing();
        let blocking = unavailable_client(tool.clone());

        assert!(!blocking.verify_payment(&TransferVerificationRequest::default()));
        assert!(!blocking.verify_payment(&TransferVerificationRequest::default()));
        assert!(!blocking.is_ready());
        assert_eq!(tool.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocking_from_multi_thread_runtime() {
        let tool = FakeCaTool::failing();
        let blocking = unavailable_client(tool.clone());

        assert!(!blocking.verify_payment(&TransferVerificationRequest::default()));
        assert_eq!(tool.calls(), 1);
    }

    #[tokio::test]
    async fn test_blocking_from_current_thread_runtime() {
        let tool = FakeCaTool::failing();
        let blocking = unavailable_client(tool.clone());

        assert!(!blocking.verify_payment(&TransferVerificationRequest::default()));
        assert!(!blocking.verify_payment(&TransferVerificationRequest::default()));
        assert_eq!(tool.calls(), 2);
    }

    #[test]
    fn test_process_client_retries_failed_setup() {
        let process = ProcessClient::new();
        let builds = AtomicUsize::new(0);

        for _ in 0..3 {
            let client = process.get_or_try_init(|| {
                builds.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("THREECITIES_GRPC_CONNECT_TIMEOUT_SECS must be greater than 0")
            });
            assert!(client.is_none());
        }
        assert_eq!(builds.load(Ordering::SeqCst), 3);

        let client = process.get_or_try_init(|| {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(unavailable_client(FakeCaTool::failing()))
        });
        assert!(client.is_some());

        let client = process.get_or_try_init(|| {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(unavailable_client(FakeCaTool::failing()))
        });
        assert!(client.is_some());
        assert_eq!(builds.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_process_client_picks_up_fixed_env() {
        let process = ProcessClient::new();

        std::env::set_var("THREECITIES_GRPC_CONNECT_TIMEOUT_SECS", "soon");
        assert!(process.get_or_try_init(client_from_env).is_none());

        std::env::set_var("THREECITIES_GRPC_CONNECT_TIMEOUT_SECS", "5");
        assert!(process.get_or_try_init(client_from_env).is_some());

        std::env::remove_var("THREECITIES_GRPC_CONNECT_TIMEOUT_SECS");
    }
}
