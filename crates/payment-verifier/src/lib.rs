//! Payment Verifier
//!
//! Client side of 3cities transfer verification. A payment claim is checked
//! by calling the local verification service over a TLS-secured gRPC
//! channel, authenticated against a locally-trusted CA root.
//!
//! **Components:**
//! - `trust_root`: CA root discovery (`mkcert -CAROOT`, env override fallback)
//! - `channel`: TLS channel and stub construction
//! - `client`: Lazily-initialized verification client
//! - `blocking`: Synchronous facade and the process-wide `verify_payment`
//! - `config`: Configuration management
//!
//! **Failure policy:** nothing crosses `verify_payment`. It returns `true`
//! only for a positive verification; every other outcome is `false` plus a
//! log line explaining why.

pub mod blocking;
pub mod channel;
pub mod client;
pub mod config;
pub mod trust_root;

// Re-export commonly used types
pub use blocking::{verify_payment, BlockingVerificationClient};
pub use channel::{ChannelFactory, GrpcChannelFactory, VerificationStub};
pub use client::VerificationClient;
pub use config::Config;
pub use threecities_common::{TransferVerificationRequest, TransferVerificationResponse};
pub use trust_root::{CaRootTool, MkcertTool, TrustRoot, TrustRootLocation, TrustRootResolver};
