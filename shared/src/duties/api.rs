use crate::duties::models::{Duty, DutyPayload, DutyType, DutyWorker};
use reqwest::{Client, Method, Request, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

pub const DUTIES_PATH: &str = "/duties";
pub const DUTY_WORKERS_PATH: &str = "/dutyWorkers";
pub const DUTY_TYPES_PATH: &str = "/dutyTypes";

#[derive(Error, Debug)]
pub enum DutyApiError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("malformed response body: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("duty service url {0} cannot take a duty id segment")]
    BaseUrl(String),
    #[error("invalid duty id {0:?}")]
    InvalidId(String),
    #[error("duty service responded with status {status}")]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
}

impl DutyApiError {
    /// Text shown to the user. Prefers the service's own `message` when one came back.
    pub fn user_message(&self) -> String {
        match self {
            DutyApiError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            DutyApiError::Status {
                status,
                message: None,
            } => format!("API request failed with status {}", status.as_u16()),
            DutyApiError::Reqwest(e) => e.to_string(),
            DutyApiError::BaseUrl(_) | DutyApiError::InvalidId(_) => self.to_string(),
            DutyApiError::Deserialize(e) => format!("malformed response body: {e}"),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client for the remote duty service.
#[derive(Clone, Debug)]
pub struct DutyClient {
    client: Client,
    base_url: String,
}

impl DutyClient {
    pub fn new_with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_duties(&self) -> Result<Vec<Duty>, DutyApiError> {
        self.send(self.client.get(self.url(DUTIES_PATH))).await
    }

    pub async fn get_duty(&self, id: &str) -> Result<Duty, DutyApiError> {
        let request = self.duty_request(self.client.get(self.url(DUTIES_PATH)), id)?;
        self.execute(request).await
    }

    pub async fn create_duty(&self, payload: &DutyPayload) -> Result<Duty, DutyApiError> {
        self.send(self.client.post(self.url(DUTIES_PATH)).json(payload))
            .await
    }

    pub async fn update_duty(&self, id: &str, payload: &DutyPayload) -> Result<Duty, DutyApiError> {
        let request =
            self.duty_request(self.client.put(self.url(DUTIES_PATH)).json(payload), id)?;
        self.execute(request).await
    }

    pub async fn list_workers(&self) -> Result<Vec<DutyWorker>, DutyApiError> {
        self.send(self.client.get(self.url(DUTY_WORKERS_PATH))).await
    }

    pub async fn list_types(&self) -> Result<Vec<DutyType>, DutyApiError> {
        self.send(self.client.get(self.url(DUTY_TYPES_PATH))).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Appends `id` to the duties path as one percent-encoded segment.
    fn duty_request(&self, request: RequestBuilder, id: &str) -> Result<Request, DutyApiError> {
        if matches!(id, "" | "." | "..") {
            return Err(DutyApiError::InvalidId(id.to_string()));
        }
        let mut request = request.build()?;
        request
            .url_mut()
            .path_segments_mut()
            .map_err(|()| DutyApiError::BaseUrl(self.base_url.clone()))?
            .push(id);
        Ok(request)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DutyApiError> {
        self.execute(request.build()?).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: Request) -> Result<T, DutyApiError> {
        let method: Method = request.method().clone();
        let path = request.url().path().to_string();

        let response = self.client.execute(request).await?;
        let status = response.status();
        // Read the whole body before deciding anything, error bodies included.
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.trim().is_empty());
            warn!(%method, path = %path, %status, ?message, "duty service request failed");
            return Err(DutyApiError::Status { status, message });
        }

        debug!(%method, path = %path, %status, bytes = body.len(), "duty service request succeeded");
        Ok(serde_json::from_slice(&body)?)
    }
}
