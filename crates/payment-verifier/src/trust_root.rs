//! Trust root discovery
//!
//! Locates the PEM root certificate that signed the verification service's
//! TLS identity. The local CA tool is asked first; the override variable is
//! only consulted when the tool can't answer.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use threecities_common::{Error, Result};
use tokio::process::Command;
use tracing::{debug, error};

use crate::config::Config;

/// File name of the root certificate inside the CA root directory
pub const ROOT_CERT_FILE: &str = "rootCA.pem";

/// A host-installed certificate-authority tool
#[async_trait]
pub trait CaRootTool: Send + Sync {
    /// Directory holding the CA root material
    async fn ca_root_dir(&self) -> Result<PathBuf>;
}

/// Runs `<program> -CAROOT` and reads the directory from stdout
pub struct MkcertTool {
    program: String,
}

impl MkcertTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl CaRootTool for MkcertTool {
    async fn ca_root_dir(&self) -> Result<PathBuf> {
        let output = Command::new(&self.program)
            .arg("-CAROOT")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::CaTool(format!("failed to run {} -CAROOT: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CaTool(format!(
                "{} -CAROOT exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| {
            Error::CaTool(format!(
                "{} -CAROOT printed non-UTF-8 output: {}",
                self.program, e
            ))
        })?;

        let dir = stdout.trim();
        if dir.is_empty() {
            return Err(Error::CaTool(format!(
                "{} -CAROOT printed no directory",
                self.program
            )));
        }

        Ok(PathBuf::from(dir))
    }
}

/// Where a resolved trust root came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustRootSource {
    CaTool,
    EnvOverride,
}

/// A resolved (but not yet read) root certificate path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustRootLocation {
    pub path: PathBuf,
    pub source: TrustRootSource,
}

/// Environment variable lookup, swappable in tests
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<OsString> + Send + Sync>;

/// Resolves the root certificate path
pub struct TrustRootResolver {
    tool: Arc<dyn CaRootTool>,
    env_var: String,
    env: EnvLookup,
}

impl TrustRootResolver {
    /// Create a resolver reading the override from the process environment
    pub fn new(tool: Arc<dyn CaRootTool>, env_var: impl Into<String>) -> Self {
        Self {
            tool,
            env_var: env_var.into(),
            env: Arc::new(|key| std::env::var_os(key)),
        }
    }

    /// Production resolver: the configured CA tool plus the override variable
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(MkcertTool::new(config.ca_tool.clone())),
            config.ca_root_env_var.clone(),
        )
    }

    /// Replace the environment lookup
    pub fn with_env_lookup<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<OsString> + Send + Sync + 'static,
    {
        self.env = Arc::new(env);
        self
    }

    /// Resolve the root certificate path
    ///
    /// The CA tool's answer always wins. The override is read at call time so
    /// a fixed environment is picked up without restarting.
    ///
    /// # Returns
    /// * `Ok(location)` - Path to the root certificate; existence is not checked
    /// * `Err(Error::TrustRootNotFound)` - Tool failed and the override is unset
    pub async fn resolve(&self) -> Result<TrustRootLocation> {
        match self.tool.ca_root_dir().await {
            Ok(dir) => {
                let path = dir.join(ROOT_CERT_FILE);
                debug!("CA root cert path from CA tool: {}", path.display());
                Ok(TrustRootLocation {
                    path,
                    source: TrustRootSource::CaTool,
                })
            }
            Err(e) => {
                error!("error obtaining CA root path: {}", e);

                match (self.env)(&self.env_var).filter(|v| !v.is_empty()) {
                    Some(path) => {
                        let path = PathBuf::from(path);
                        debug!(
                            "CA root cert path from {}: {}",
                            self.env_var,
                            path.display()
                        );
                        Ok(TrustRootLocation {
                            path,
                            source: TrustRootSource::EnvOverride,
                        })
                    }
                    None => Err(Error::TrustRootNotFound {
                        env_var: self.env_var.clone(),
                    }),
                }
            }
        }
    }
}

/// PEM root certificate bytes, held only until credentials are built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustRoot(Vec<u8>);

impl TrustRoot {
    /// Read the certificate at `location`
    pub async fn read(location: &TrustRootLocation) -> Result<Self> {
        tokio::fs::read(&location.path)
            .await
            .map(Self)
            .map_err(|source| Error::TrustRootUnreadable {
                path: location.path.clone(),
                source,
            })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for TrustRoot {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}
