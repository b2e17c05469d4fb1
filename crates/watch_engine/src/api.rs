use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use watch_logging::watch_debug;

use crate::{ApiError, ApiFailureKind};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Source of job status documents, polled while a job runs.
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    async fn job_status(&self, job_id: &str) -> Result<String, ApiError>;
}

/// HTTP client for the scrape server's job endpoints. Bodies are returned
/// raw; decoding belongs to the core.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        reqwest::Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(ApiFailureKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(ApiFailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Start a scrape job for one URL.
    pub async fn submit(&self, url: &str, max_threads: u32) -> Result<String, ApiError> {
        let endpoint = format!("{}/api/scrape/single", self.base_url);
        let body = serde_json::json!({ "url": url, "max_threads": max_threads }).to_string();
        watch_debug!("POST {}", endpoint);
        let response = self
            .client
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_body(response).await
    }
}

#[async_trait::async_trait]
impl StatusSource for ApiClient {
    async fn job_status(&self, job_id: &str) -> Result<String, ApiError> {
        let endpoint = format!("{}/api/scrape/job/{}", self.base_url, job_id);
        watch_debug!("GET {}", endpoint);
        let response = self
            .client
            .get(&endpoint)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::new(
            ApiFailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }
    response.text().await.map_err(map_reqwest_error)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(ApiFailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(ApiFailureKind::InvalidUrl, err.to_string());
    }
    ApiError::new(ApiFailureKind::Network, err.to_string())
}
