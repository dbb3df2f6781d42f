use std::fmt;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClientError;

pub const API_PREFIX: &str = "/api/v1";
pub const REPLACE_FIELDS_CONFIG: &str = "config";
const FALLBACK_FAILURE_MESSAGE: &str = "Request failed";

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub token: String,
    pub timeout_ms: u64,
}

impl ApiClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout_ms: crate::config::DEFAULT_TIMEOUT_MS,
        }
    }
}

/// HTTP client bound to one base address and (optionally) one bearer token.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_token", &!self.token.is_empty())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::BaseUrlMissing);
        }
        Ok(Self {
            base_url,
            token: config.token.trim().to_string(),
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        Some(format!("{}/{}", self.base_url, trimmed))
    }

    #[must_use]
    pub fn login_path() -> String {
        format!("{API_PREFIX}/auth/login")
    }

    #[must_use]
    pub fn verify_path() -> String {
        format!("{API_PREFIX}/auth/verify")
    }

    #[must_use]
    pub fn password_path() -> String {
        format!("{API_PREFIX}/auth/password")
    }

    #[must_use]
    pub fn brand_path(tenant_id: &str) -> String {
        format!("{API_PREFIX}/brands/{}", tenant_id.trim())
    }

    #[must_use]
    pub fn brand_replace_config_path(tenant_id: &str) -> String {
        format!(
            "{}?replaceFields={REPLACE_FIELDS_CONFIG}",
            Self::brand_path(tenant_id)
        )
    }

    pub async fn get<T>(&self, path: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post<Req, T>(&self, path: &str, payload: &Req) -> Result<T, ClientError>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(payload)).await
    }

    pub async fn put<Req, T>(&self, path: &str, payload: &Req) -> Result<T, ClientError>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(payload)).await
    }

    /// Sends one request and decodes a 2xx JSON body. Transport failures are
    /// surfaced as-is; envelope handling is left to the caller.
    pub async fn request<T, Req>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Req>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Req: Serialize + ?Sized,
    {
        let url = self.endpoint(path).ok_or(ClientError::InvalidPath)?;
        let mut request = self
            .http
            .request(method.clone(), url.as_str())
            .header(ACCEPT, "application/json")
            .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
            .timeout(self.timeout);
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        if !self.token.is_empty() {
            request = request.bearer_auth(self.token.as_str());
        }

        let response = request.send().await.map_err(|error| ClientError::Network {
            message: error.to_string(),
        })?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));
        let bytes = response
            .bytes()
            .await
            .map_err(|error| ClientError::Network {
                message: error.to_string(),
            })?;
        tracing::debug!(%method, path, status = status.as_u16(), "api request completed");

        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }
        if !is_json {
            return Err(ClientError::UnexpectedContentType {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }

        serde_json::from_slice::<T>(&bytes).map_err(|error| ClientError::Decode {
            message: error.to_string(),
        })
    }
}

/// Uniform response wrapper used by every backend endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> Result<T, ClientError> {
        if !self.success {
            return Err(application_error(self.error, self.message));
        }
        self.data.ok_or(ClientError::MissingData)
    }

    /// For write endpoints whose payload is not consumed.
    pub fn into_ack(self) -> Result<(), ClientError> {
        if self.success {
            Ok(())
        } else {
            Err(application_error(self.error, self.message))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<T>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

impl<T> PaginatedEnvelope<T> {
    pub fn into_page(self) -> Result<Page<T>, ClientError> {
        if !self.success {
            return Err(application_error(self.error, self.message));
        }
        Ok(Page {
            items: self.data.unwrap_or_default(),
            pagination: self.pagination,
        })
    }
}

fn application_error(error: Option<String>, message: Option<String>) -> ClientError {
    let message = [error, message]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| FALLBACK_FAILURE_MESSAGE.to_string());
    ClientError::Application { message }
}
