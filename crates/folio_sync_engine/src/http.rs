//! JSON transport over a pluggable HTTP client.
//!
//! The actual HTTP stack is abstracted behind [`HttpClient`] so hosts
//! can bring whatever client they already ship (ureq, reqwest, a
//! platform webview, a loopback for tests).

use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use folio_sync_protocol::{
    AnnotationSnapshot, AnnotationUpsert, AnnotationUpsertAck, AuthAck, ProgressRecord,
    ProgressUpdate, ProgressUpdateAck, RegisterAck, RegisterRequest,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A plain HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

/// HTTP client abstraction.
///
/// Implementations own connection pooling and socket timeouts; the
/// engine bounds wedged operations separately through the scheduler's
/// in-flight deadline.
pub trait HttpClient: Send + Sync {
    /// Sends one request and returns the response, however unhappy its
    /// status. `Err` is reserved for not getting a response at all.
    fn request(
        &self,
        method: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, String>;

    /// Whether the client considers itself usable.
    fn is_healthy(&self) -> bool;
}

/// The remote store's HTTP/JSON protocol over an [`HttpClient`].
///
/// Every request carries the account name and derived secret as
/// headers; there is no session state to establish or tear down.
pub struct JsonTransport<C: HttpClient> {
    base_url: String,
    username: String,
    secret: String,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> JsonTransport<C> {
    /// Creates a transport for the given account.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
        client: C,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            secret: secret.into(),
            client,
            last_error: RwLock::new(None),
        }
    }

    /// The configured server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The most recent transport-level error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn send<Req, Res>(&self, method: &str, path: &str, body: Option<&Req>) -> SyncResult<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let encoded = match body {
            Some(value) => Some(serde_json::to_vec(value).map_err(|e| {
                SyncError::MalformedResponse(format!("failed to encode {path} body: {e}"))
            })?),
            None => None,
        };

        let url = format!("{}{}", self.base_url, path);
        let headers = [
            ("x-auth-user", self.username.as_str()),
            ("x-auth-key", self.secret.as_str()),
            ("content-type", "application/json"),
        ];

        let response = self
            .client
            .request(method, &url, &headers, encoded.as_deref())
            .map_err(|message| {
                tracing::debug!(%method, %path, error = %message, "transport failure");
                *self.last_error.write() = Some(message.clone());
                SyncError::transport_retryable(message)
            })?;

        *self.last_error.write() = None;

        match response.status {
            200..=299 => serde_json::from_slice(&response.body).map_err(|e| {
                SyncError::MalformedResponse(format!("failed to decode {path} response: {e}"))
            }),
            401 => Err(SyncError::AuthRejected(
                "server rejected the stored credentials".into(),
            )),
            409 => Err(SyncError::VersionConflict),
            status => Err(SyncError::Server(format!(
                "{method} {path} answered status {status}"
            ))),
        }
    }
}

impl<C: HttpClient> SyncTransport for JsonTransport<C> {
    fn register(&self, username: &str, secret: &str) -> SyncResult<()> {
        let request = RegisterRequest {
            username: username.to_string(),
            password: secret.to_string(),
        };
        let _: RegisterAck = self.send("POST", "/users/create", Some(&request))?;
        Ok(())
    }

    fn authenticate(&self) -> SyncResult<()> {
        let ack: AuthAck = self.send("GET", "/users/auth", None::<&()>)?;
        if ack.authorized == "OK" {
            Ok(())
        } else {
            Err(SyncError::AuthRejected("unexpected auth response".into()))
        }
    }

    fn put_progress(&self, update: &ProgressUpdate) -> SyncResult<ProgressUpdateAck> {
        self.send("PUT", "/syncs/progress", Some(update))
    }

    fn get_progress(&self, document: &str) -> SyncResult<Option<ProgressRecord>> {
        let record: ProgressRecord =
            self.send("GET", &format!("/syncs/progress/{document}"), None::<&()>)?;
        Ok(record.is_found().then_some(record))
    }

    fn put_annotations(
        &self,
        document: &str,
        upsert: &AnnotationUpsert,
    ) -> SyncResult<AnnotationUpsertAck> {
        self.send("PUT", &format!("/syncs/annotations/{document}"), Some(upsert))
    }

    fn get_annotations(&self, document: &str) -> SyncResult<AnnotationSnapshot> {
        self.send("GET", &format!("/syncs/annotations/{document}"), None::<&()>)
    }

    fn is_connected(&self) -> bool {
        self.client.is_healthy()
    }
}
