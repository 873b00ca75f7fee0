//! Secure channel acquisition and scoped release.
//!
//! One channel is opened per process invocation, authenticated against a
//! locally supplied CA certificate, and released when the owning
//! [`SecureChannel`] is dropped. The credential is read and validated up
//! front; the transport itself is established lazily, on the first call
//! that needs it, so actions that issue no RPC never touch the network.
//! There is no pooling and no retry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Uri};
use tracing::{debug, info};

use crate::error::ClientError;

/// PEM framing expected in the configured CA certificate file.
const PEM_CERTIFICATE_HEADER: &[u8] = b"-----BEGIN CERTIFICATE-----";

/// Endpoint of the reference deployment.
pub const DEFAULT_ENDPOINT: &str = "https://localhost:8080";

/// CA certificate path of the reference deployment.
pub const DEFAULT_CA_CERTIFICATE: &str = "testing.crt";

/// Configuration for the encrypted client channel.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use pingkit_client::ChannelConfig;
///
/// let config = ChannelConfig::new("https://ping.example.com:8080")
///     .ca_certificate("certs/ca.crt")
///     .connect_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.endpoint, "https://ping.example.com:8080");
/// ```
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// The endpoint URI (e.g. `https://localhost:8080`).
    pub endpoint: String,
    /// Path to the PEM-encoded CA certificate used to authenticate the server.
    pub ca_certificate: PathBuf,
    /// Override for the TLS domain name; defaults to the endpoint host.
    pub tls_domain: Option<String>,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout.
    pub timeout: Duration,
}

impl ChannelConfig {
    /// Create a configuration pointing at the given endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ca_certificate: PathBuf::from(DEFAULT_CA_CERTIFICATE),
            tls_domain: None,
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
        }
    }

    /// Read the configuration from `PINGKIT_*` environment variables,
    /// falling back to the reference deployment defaults.
    ///
    /// Recognized variables: `PINGKIT_ENDPOINT`, `PINGKIT_CA_CERT`,
    /// `PINGKIT_TLS_DOMAIN`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var("PINGKIT_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(path) = std::env::var("PINGKIT_CA_CERT") {
            config.ca_certificate = PathBuf::from(path);
        }
        if let Ok(domain) = std::env::var("PINGKIT_TLS_DOMAIN") {
            config.tls_domain = Some(domain);
        }
        config
    }

    /// Set the CA certificate path.
    #[must_use]
    pub fn ca_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_certificate = path.into();
        self
    }

    /// Override the TLS domain name used for certificate verification.
    #[must_use]
    pub fn tls_domain(mut self, domain: impl Into<String>) -> Self {
        self.tls_domain = Some(domain.into());
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

/// Scoped handle over an established encrypted channel.
///
/// The transport is torn down when this handle is dropped, on every exit
/// path of the owning dispatch. The release hook fires exactly once.
pub struct SecureChannel {
    channel: Channel,
    _release: ReleaseGuard,
}

impl SecureChannel {
    /// Wrap a pre-established channel.
    ///
    /// Useful when the channel is produced elsewhere, e.g. an in-process
    /// test server reached without TLS.
    #[must_use]
    pub fn from_channel(channel: Channel) -> Self {
        Self {
            channel,
            _release: ReleaseGuard { hook: None },
        }
    }

    /// Wrap a pre-established channel and observe its release.
    ///
    /// The hook is invoked exactly once, when the handle is dropped.
    #[must_use]
    pub fn with_release_hook(channel: Channel, hook: impl FnOnce() + Send + 'static) -> Self {
        Self {
            channel,
            _release: ReleaseGuard {
                hook: Some(Box::new(hook)),
            },
        }
    }

    /// Clone out the underlying channel for binding a stub.
    ///
    /// `tonic` channels are cheaply cloneable handles over one connection;
    /// the connection itself stays owned by this scope.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }
}

/// Drop-based release of the transport resource.
struct ReleaseGuard {
    hook: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        debug!("channel released");
        if let Some(hook) = self.hook.take() {
            hook();
        }
    }
}

/// Open an encrypted channel to the configured endpoint.
///
/// The certificate is read and parsed once, up front; a file that cannot
/// be read, carries no PEM certificate framing, or fails TLS setup fails
/// with [`ClientError::Credential`] before any RPC is attempted. The
/// transport itself connects lazily, on the first call that needs it:
/// establishment failures surface on that call as
/// [`ClientError::Connection`], and an action that issues no RPC performs
/// no network I/O at all.
pub async fn open_channel(config: &ChannelConfig) -> Result<SecureChannel, ClientError> {
    let pem = read_certificate(&config.ca_certificate).await?;

    let uri: Uri = config
        .endpoint
        .parse()
        .map_err(|e| ClientError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            message: format!("{e}"),
        })?;

    let mut tls = ClientTlsConfig::new().ca_certificate(Certificate::from_pem(pem));
    if let Some(domain) = &config.tls_domain {
        tls = tls.domain_name(domain.clone());
    }

    let channel = Endpoint::from(uri)
        .connect_timeout(config.connect_timeout)
        .timeout(config.timeout)
        .tls_config(tls)
        .map_err(|e| {
            ClientError::credential(config.ca_certificate.display().to_string(), e.to_string())
        })?
        .connect_lazy();

    info!(endpoint = %config.endpoint, "encrypted channel ready");
    Ok(SecureChannel::from_channel(channel))
}

async fn read_certificate(path: &Path) -> Result<Vec<u8>, ClientError> {
    let pem = tokio::fs::read(path)
        .await
        .map_err(|e| ClientError::credential(path.display().to_string(), e.to_string()))?;

    if !pem
        .windows(PEM_CERTIFICATE_HEADER.len())
        .any(|window| window == PEM_CERTIFICATE_HEADER)
    {
        return Err(ClientError::credential(
            path.display().to_string(),
            "file carries no PEM certificate",
        ));
    }
    Ok(pem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("pingkit-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn fixture_certificate() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/testing.crt")
    }

    #[test]
    fn test_config_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.ca_certificate, PathBuf::from(DEFAULT_CA_CERTIFICATE));
        assert!(config.tls_domain.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ChannelConfig::new("https://ping.internal:8443")
            .ca_certificate("ca.crt")
            .tls_domain("ping.internal")
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(5));

        assert_eq!(config.endpoint, "https://ping.internal:8443");
        assert_eq!(config.ca_certificate, PathBuf::from("ca.crt"));
        assert_eq!(config.tls_domain.as_deref(), Some("ping.internal"));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_certificate_is_credential_error() {
        let config =
            ChannelConfig::new("https://localhost:1").ca_certificate("/nonexistent/nope.crt");
        let err = open_channel(&config).await.unwrap_err();
        assert!(matches!(err, ClientError::Credential { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_non_pem_certificate_is_credential_error() {
        let path = scratch_file("not-a-cert", b"definitely not pem material");
        let config = ChannelConfig::new("https://localhost:1").ca_certificate(&path);
        let err = open_channel(&config).await.unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ClientError::Credential { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_unparseable_certificate_is_credential_error() {
        let path = scratch_file(
            "garbage-cert",
            b"-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n",
        );
        let config = ChannelConfig::new("https://localhost:1").ca_certificate(&path);
        let err = open_channel(&config).await.unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ClientError::Credential { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_open_channel_succeeds_without_a_listener() {
        // Acquisition is lazy: nothing is listening on the endpoint, yet
        // the channel opens. The connection happens on the first call.
        let config =
            ChannelConfig::new("https://localhost:1").ca_certificate(fixture_certificate());
        let channel = open_channel(&config).await;
        assert!(channel.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_endpoint_fails_before_connecting() {
        let path = scratch_file(
            "framed-cert",
            b"-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n",
        );
        let config = ChannelConfig::new("not a uri at all").ca_certificate(&path);
        let err = open_channel(&config).await.unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ClientError::InvalidEndpoint { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_release_hook_fires_exactly_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&fired);

        let channel = Endpoint::from_static("http://127.0.0.1:9").connect_lazy();
        let secure = SecureChannel::with_release_hook(channel, move || {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        drop(secure);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
