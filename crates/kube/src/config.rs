//! Cluster access configuration.
//!
//! Resolution order: an explicit kubeconfig path, then `$KUBECONFIG` or
//! `$HOME/.kube/config` when they exist, then the in-cluster service account.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// Directory holding the mounted service account credentials.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolved connection settings for the API server.
#[derive(Debug, Clone)]
pub struct KubeConfig {
    /// API server base URL.
    pub server: Url,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// PEM bundle to trust in addition to the system roots.
    pub ca_pem: Option<Vec<u8>>,
    /// Client certificate chain followed by its private key, both PEM.
    pub identity_pem: Option<Vec<u8>>,
    /// Skip server certificate verification.
    pub insecure_skip_tls_verify: bool,
    /// Namespace holding the `Tweet` resources.
    pub namespace: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl KubeConfig {
    /// Create a config for a server with no credentials.
    pub fn new(server: Url) -> Self {
        Self {
            server,
            token: None,
            ca_pem: None,
            identity_pem: None,
            insecure_skip_tls_verify: false,
            namespace: DEFAULT_NAMESPACE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the explicit kubeconfig cannot be loaded, or when
    /// neither a kubeconfig nor an in-cluster service account is available.
    pub fn infer(kubeconfig: Option<&Path>) -> Result<Self> {
        Self::infer_from(
            kubeconfig,
            |key| std::env::var(key).ok(),
            Path::new(SERVICE_ACCOUNT_DIR),
        )
    }

    /// Resolve configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`KubeConfig::infer`].
    pub fn infer_from<F>(
        kubeconfig: Option<&Path>,
        lookup: F,
        service_account_dir: &Path,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = kubeconfig {
            return Self::from_kubeconfig_file(path);
        }

        if let Some(path) = default_kubeconfig_path(&lookup) {
            debug!(path = %path.display(), "Using default kubeconfig");
            return Self::from_kubeconfig_file(&path);
        }

        debug!("No kubeconfig found, trying in-cluster configuration");
        Self::in_cluster_from(lookup, service_account_dir)
    }

    /// Load the current context of a kubeconfig file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or its current context is incomplete.
    pub fn from_kubeconfig_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_kubeconfig_str(&contents, base_dir)
    }

    /// Parse kubeconfig YAML. Relative file references resolve against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when the YAML is invalid or references missing entries.
    pub fn from_kubeconfig_str(yaml: &str, base_dir: &Path) -> Result<Self> {
        let kubeconfig: Kubeconfig = serde_yaml::from_str(yaml)?;

        let context_name = kubeconfig
            .current_context
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::invalid_config("current-context is not set"))?;
        let context = kubeconfig
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .map(|c| &c.context)
            .ok_or_else(|| Error::missing_entry("context", context_name))?;
        let cluster = kubeconfig
            .clusters
            .iter()
            .find(|c| c.name == context.cluster)
            .map(|c| &c.cluster)
            .ok_or_else(|| Error::missing_entry("cluster", &context.cluster))?;

        let mut config = Self::new(Url::parse(&cluster.server)?);
        config.insecure_skip_tls_verify = cluster.insecure_skip_tls_verify;
        config.ca_pem = pem_source(
            cluster.certificate_authority_data.as_deref(),
            cluster.certificate_authority.as_deref(),
            base_dir,
        )?;

        if let Some(user_name) = context.user.as_deref() {
            let user = kubeconfig
                .users
                .iter()
                .find(|u| u.name == user_name)
                .map(|u| &u.user)
                .ok_or_else(|| Error::missing_entry("user", user_name))?;
            user.check_supported(user_name)?;

            config.token = match (&user.token, &user.token_file) {
                (Some(token), _) => Some(token.clone()),
                (None, Some(path)) => Some(read_token(&base_dir.join(path))?),
                (None, None) => None,
            };
            config.identity_pem = user.identity_pem(user_name, base_dir)?;
        }

        if let Some(namespace) = context.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            config.namespace = namespace.to_string();
        }

        Ok(config)
    }

    /// Build configuration from a mounted service account.
    ///
    /// `lookup` reads environment variables; `dir` holds `token`, `ca.crt`
    /// and optionally `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigNotFound`] when the service host variables are unset,
    /// or a read error when the token is missing.
    pub fn in_cluster_from<F>(lookup: F, dir: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("KUBERNETES_SERVICE_HOST")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                Error::config_not_found("no kubeconfig and KUBERNETES_SERVICE_HOST is not set")
            })?;
        let port = lookup("KUBERNETES_SERVICE_PORT")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::config_not_found("KUBERNETES_SERVICE_PORT is not set"))?;

        // IPv6 service hosts need brackets in the authority.
        let authority = if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };
        let mut config = Self::new(Url::parse(&format!("https://{authority}"))?);
        config.token = Some(read_token(&dir.join("token"))?);

        let ca_path = dir.join("ca.crt");
        if ca_path.is_file() {
            config.ca_pem = Some(read_file(&ca_path)?);
        }

        if let Ok(namespace) = std::fs::read_to_string(dir.join("namespace")) {
            let namespace = namespace.trim();
            if !namespace.is_empty() {
                config.namespace = namespace.to_string();
            }
        }

        Ok(config)
    }
}

/// `$KUBECONFIG` if it names an existing file, else `$HOME/.kube/config` if it exists.
fn default_kubeconfig_path<F>(lookup: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let from_env = lookup("KUBECONFIG")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    if let Some(path) = from_env {
        if path.is_file() {
            return Some(path);
        }
        warn!(path = %path.display(), "KUBECONFIG does not name a file, ignoring it");
    }

    lookup("HOME")
        .filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join(".kube").join("config"))
        .filter(|path| path.is_file())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::file_read(path, e))
}

fn read_token(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|token| token.trim().to_string())
        .map_err(|e| Error::file_read(path, e))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    users: Vec<NamedUser>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    current_context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    #[serde(default)]
    certificate_authority: Option<PathBuf>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    #[serde(default)]
    user: UserEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct UserEntry {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "tokenFile")]
    token_file: Option<PathBuf>,
    #[serde(default)]
    client_certificate: Option<PathBuf>,
    #[serde(default)]
    client_certificate_data: Option<String>,
    #[serde(default)]
    client_key: Option<PathBuf>,
    #[serde(default)]
    client_key_data: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    exec: Option<serde_yaml::Value>,
    #[serde(default)]
    auth_provider: Option<serde_yaml::Value>,
}

impl UserEntry {
    /// Reject credential plugins and basic auth, which this client cannot use.
    fn check_supported(&self, user_name: &str) -> Result<()> {
        let unsupported = if self.exec.is_some() {
            Some("exec credential plugins")
        } else if self.auth_provider.is_some() {
            Some("auth-provider plugins")
        } else if self.username.is_some() {
            Some("basic authentication")
        } else {
            None
        };

        match unsupported {
            Some(method) => Err(Error::invalid_config(format!(
                "user '{user_name}' authenticates with {method}, which is not supported; \
                 use a token or a client certificate"
            ))),
            None => Ok(()),
        }
    }

    /// Client certificate and key concatenated, when both are configured.
    fn identity_pem(&self, user_name: &str, base_dir: &Path) -> Result<Option<Vec<u8>>> {
        let cert = pem_source(
            self.client_certificate_data.as_deref(),
            self.client_certificate.as_deref(),
            base_dir,
        )?;
        let key = pem_source(
            self.client_key_data.as_deref(),
            self.client_key.as_deref(),
            base_dir,
        )?;

        match (cert, key) {
            (Some(mut pem), Some(key)) => {
                if !pem.ends_with(b"\n") {
                    pem.push(b'\n');
                }
                pem.extend_from_slice(&key);
                Ok(Some(pem))
            }
            (None, None) => Ok(None),
            (Some(_), None) => Err(Error::invalid_config(format!(
                "user '{user_name}' has a client certificate but no client key"
            ))),
            (None, Some(_)) => Err(Error::invalid_config(format!(
                "user '{user_name}' has a client key but no client certificate"
            ))),
        }
    }
}

/// Inline base64 data wins over a file reference.
fn pem_source(
    data: Option<&str>,
    path: Option<&Path>,
    base_dir: &Path,
) -> Result<Option<Vec<u8>>> {
    match (data, path) {
        (Some(data), _) => Ok(Some(STANDARD.decode(data.trim())?)),
        (None, Some(path)) => read_file(&base_dir.join(path)).map(Some),
        (None, None) => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
}
