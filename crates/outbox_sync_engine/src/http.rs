//! HTTP client for the remote authority.
//!
//! JSON over the `/users` REST surface, with a bounded timeout on every
//! call. Transport failures and timeouts map to retryable
//! [`RemoteError`]s; a 404 on update or delete maps to
//! [`RemoteError::NotFound`].

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityProbe;
use outbox_core::{
    NewRecord, Record, RecordId, RecordPatch, RemoteAuthority, RemoteError, RemoteResult,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// A [`RemoteAuthority`] reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    probe_client: Client,
    base_url: String,
}

impl HttpRemote {
    /// Creates a client for the authority in `config`.
    ///
    /// # Errors
    ///
    /// Returns `Protocol` if the HTTP client cannot be built.
    pub fn new(config: &SyncConfig) -> RemoteResult<Self> {
        let build = |timeout| {
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| RemoteError::Protocol(format!("cannot build HTTP client: {e}")))
        };

        Ok(Self {
            client: build(config.remote_timeout)?,
            probe_client: build(config.probe_timeout)?,
            base_url: config.remote_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        request.send().map_err(transport_error)
    }

    fn user_path(id: &RecordId) -> String {
        format!("/users/{id}")
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Unavailable(err.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Turns a non-success response into an error, using the `{"error": ..}`
/// body when there is one.
fn check(response: Response, id: Option<&RecordId>) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(RemoteError::NotFound { id: id.clone() });
        }
    }

    let text = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(RemoteError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn json<T: DeserializeOwned>(response: Response) -> RemoteResult<T> {
    response.json().map_err(|e| {
        if e.is_timeout() {
            RemoteError::Timeout
        } else {
            RemoteError::Protocol(format!("invalid response body: {e}"))
        }
    })
}

impl RemoteAuthority for HttpRemote {
    fn list(&self) -> RemoteResult<Vec<Record>> {
        let response = self.send(self.request(Method::GET, "/users"))?;
        json(check(response, None)?)
    }

    fn create(&self, fields: &NewRecord) -> RemoteResult<Record> {
        let response = self.send(self.request(Method::POST, "/users").json(fields))?;
        let record: Record = json(check(response, None)?)?;
        tracing::debug!(id = %record.id, "remote created record");
        Ok(record)
    }

    fn update(&self, id: &RecordId, patch: &RecordPatch) -> RemoteResult<Record> {
        let response = self.send(self.request(Method::PUT, &Self::user_path(id)).json(patch))?;
        json(check(response, Some(id))?)
    }

    fn delete(&self, id: &RecordId) -> RemoteResult<()> {
        let response = self.send(self.request(Method::DELETE, &Self::user_path(id)))?;
        check(response, Some(id))?;
        Ok(())
    }
}

impl ConnectivityProbe for HttpRemote {
    fn probe(&self) -> bool {
        let url = format!("{}/users", self.base_url);
        match self.probe_client.get(url).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "connectivity probe failed");
                false
            }
        }
    }
}
