//! REST client for the task service.
//!
//! Maps the [`TaskService`] contract onto
//! `GET /tasks`, `POST /tasks`, `PATCH /tasks/{id}` and `DELETE /tasks/{id}`
//! with JSON bodies. Paths are appended to the base URL's own path, so a
//! service mounted under a prefix works. Non-2xx answers are decoded as
//! [`ApiError`](taskboard_proto::api::ApiError) bodies and classified into
//! [`RemoteError`] variants.

use std::time::Duration;

use reqwest::{Client, Response};
use taskboard_proto::api::{self, TASKS_SEGMENT};
use taskboard_proto::task::{NewTask, Task, TaskId, TaskPatch};
use url::Url;

use super::{RemoteError, TaskService};

/// HTTP implementation of [`TaskService`].
#[derive(Debug, Clone)]
pub struct HttpTaskService {
    client: Client,
    base_url: Url,
}

impl HttpTaskService {
    /// Creates a client for the service at `base_url`
    /// (e.g. `http://127.0.0.1:9100`).
    ///
    /// `request_timeout` is a transport-level ceiling; per-attempt timeouts
    /// are applied by the retry wrapper.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Unreachable`] if the URL cannot be parsed or
    /// cannot carry a path, or if the HTTP client cannot be built.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RemoteError::Unreachable(format!("invalid base url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::Unreachable(format!(
                "invalid base url {base_url}: cannot carry a path"
            )));
        }
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RemoteError::Unreachable(format!("http client setup failed: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the task collection, or of one task when `id` is given. The
    /// id is percent-encoded as a single segment.
    fn url(&self, id: Option<&TaskId>) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                RemoteError::Unreachable(format!("base url {} cannot carry a path", self.base_url))
            })?;
            segments.pop_if_empty().push(TASKS_SEGMENT);
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }

    /// Converts a transport-level failure into a [`RemoteError`].
    fn transport_error(e: &reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout
        } else if e.is_connect() {
            RemoteError::Unreachable(format!("connection failed: {e}"))
        } else {
            RemoteError::Unreachable(format!("request failed: {e}"))
        }
    }

    /// Reads the body and fails with a classified error for non-2xx answers.
    async fn check(response: Response, task: Option<&TaskId>) -> Result<Vec<u8>, RemoteError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(&e))?;
        if status.is_success() {
            return Ok(body.to_vec());
        }
        let message = api::error_message(&body);
        tracing::debug!(status = status.as_u16(), %message, "task service returned an error");
        Err(RemoteError::from_status(status.as_u16(), message, task))
    }

    fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, RemoteError> {
        api::decode(body).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

impl TaskService for HttpTaskService {
    async fn list(&self) -> Result<Vec<Task>, RemoteError> {
        let response = self
            .client
            .get(self.url(None)?)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;
        let body = Self::check(response, None).await?;
        Self::decode(&body)
    }

    async fn create(&self, new: &NewTask) -> Result<Task, RemoteError> {
        let response = self
            .client
            .post(self.url(None)?)
            .json(new)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;
        let body = Self::check(response, None).await?;
        Self::decode(&body)
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, RemoteError> {
        let response = self
            .client
            .patch(self.url(Some(id))?)
            .json(patch)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;
        let body = Self::check(response, Some(id)).await?;
        Self::decode(&body)
    }

    async fn delete(&self, id: &TaskId) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.url(Some(id))?)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;
        Self::check(response, Some(id)).await?;
        Ok(())
    }
}
