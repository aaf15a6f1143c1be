use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("CA tool error: {0}")]
    CaTool(String),

    #[error("CA root cert file path not found: CA tool failed and {env_var} is unset")]
    TrustRootNotFound { env_var: String },

    #[error("failed to read CA root cert {}: {source}", path.display())]
    TrustRootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Channel error: {0}")]
    Channel(#[from] tonic::transport::Error),

    #[error("gRPC call failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
