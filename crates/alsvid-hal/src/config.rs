//! Connection configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Configuration for reaching a solving service.
///
/// With both `endpoint` and `token` set the configuration describes a
/// remote service; otherwise a local (in-process or native-library) solver
/// is intended.
#[derive(Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Service endpoint URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Authentication token.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Proxy URL. `None` means the system proxy; an empty string disables
    /// proxying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Name of the solver to select on the connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver: Option<String>,
    /// Additional backend-specific configuration.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SolverConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self {
            endpoint: None,
            token: None,
            proxy: None,
            solver: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the authentication token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Set the solver name.
    pub fn with_solver(mut self, solver: impl Into<String>) -> Self {
        self.solver = Some(solver.into());
        self
    }

    /// Add extra configuration.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Read the conventional `DW_INTERNAL__*` environment variables.
    ///
    /// Unset variables simply leave the field `None`; no validation happens
    /// here.
    pub fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.is_empty());
        Self {
            endpoint: var("DW_INTERNAL__HTTPLINK"),
            token: var("DW_INTERNAL__TOKEN"),
            proxy: std::env::var("DW_INTERNAL__HTTPPROXY").ok(),
            solver: var("DW_INTERNAL__SOLVER"),
            extra: serde_json::Map::new(),
        }
    }

    /// Whether the configuration describes a remote service.
    pub fn is_remote(&self) -> bool {
        self.endpoint.is_some() && self.token.is_some()
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("proxy", &self.proxy)
            .field("solver", &self.solver)
            .field("extra", &self.extra)
            .finish()
    }
}
