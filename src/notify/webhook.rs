// ABOUTME: Webhook notifier built on a hyper http1 client connection.
// ABOUTME: POSTs the notification as JSON over plain TCP or rustls and treats non-2xx responses as failures.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::Uri;
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use super::{Notification, Notifier, NotifyError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends notifications to `http://` and `https://` webhook endpoints.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    timeout: Duration,
    tls: Arc<OnceLock<Arc<ClientConfig>>>,
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

/// Client config trusting the platform's root certificates.
fn native_tls_config() -> Arc<ClientConfig> {
    let mut roots = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            let (added, ignored) = roots.add_parsable_certificates(certs);
            tracing::debug!(added, ignored, "loaded native root certificates");
        }
        Err(e) => tracing::warn!("cannot load native root certificates: {e}"),
    }
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            tls: Arc::new(OnceLock::new()),
        }
    }

    async fn post(&self, uri: &Uri, body: Vec<u8>) -> Result<(), NotifyError> {
        let host = uri
            .host()
            .ok_or_else(|| NotifyError::InvalidUrl(uri.to_string()))?;
        let secure = uri.scheme_str() == Some("https");
        let port = uri.port_u16().unwrap_or(if secure { 443 } else { 80 });

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(NotifyError::Connect)?;

        if !secure {
            return send(stream, uri, host, body).await;
        }

        // Bracketed IPv6 hosts arrive with their brackets.
        let server_name = ServerName::try_from(host.trim_matches(['[', ']']).to_string())
            .map_err(|_| NotifyError::InvalidUrl(uri.to_string()))?;
        let config = Arc::clone(self.tls.get_or_init(native_tls_config));
        let stream = TlsConnector::from(config)
            .connect(server_name, stream)
            .await
            .map_err(NotifyError::Tls)?;
        send(stream, uri, host, body).await
    }
}

async fn send<S>(stream: S, uri: &Uri, host: &str, body: Vec<u8>) -> Result<(), NotifyError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!("webhook connection error: {}", e);
        }
    });

    let path = uri.path_and_query().map_or("/", |p| p.as_str());
    let authority = uri.authority().map_or(host, |a| a.as_str());
    let req = hyper::Request::builder()
        .method("POST")
        .uri(path)
        .header("Host", authority)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))?;

    let resp = sender.send_request(req).await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }

    let body = resp.into_body().collect().await?.to_bytes();
    Err(NotifyError::Rejected {
        status: status.as_u16(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Parse and check a webhook destination.
pub(crate) fn parse_destination(destination: &str) -> Result<Uri, NotifyError> {
    let uri: Uri = destination
        .trim()
        .parse()
        .map_err(|_| NotifyError::InvalidUrl(destination.to_string()))?;
    match uri.scheme_str() {
        Some("http" | "https") => {}
        Some(other) => return Err(NotifyError::UnsupportedScheme(other.to_string())),
        None => return Err(NotifyError::InvalidUrl(destination.to_string())),
    }
    if uri.host().is_none() {
        return Err(NotifyError::InvalidUrl(destination.to_string()));
    }
    Ok(uri)
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        destination: &str,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let uri = parse_destination(destination)?;
        let body = serde_json::to_vec(notification)?;

        tracing::debug!(%uri, deployment = %notification.deployment_id, "sending webhook");
        tokio::time::timeout(self.timeout, self.post(&uri, body))
            .await
            .map_err(|_| NotifyError::Timeout)?
    }
}
