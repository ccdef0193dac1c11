
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::ExpenseTrackerConfig;
use crate::models::expense::{ExpenseItemRequest, ItemTypeRequest};

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Failures talking to the expense tracker backend
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Expense tracker backend URL is not configured")]
    NotConfigured,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Transport(String),

    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

/// Access to the expense tracker REST API.
///
/// Implementations are blocking; async callers should run them on a blocking
/// thread.
pub trait ExpenseApi: Send + Sync {
    /// `POST /expenses`
    fn create_expense(&self, request: &ExpenseItemRequest) -> Result<Value, RepositoryError>;

    /// `GET /expenses`
    fn list_expenses(&self) -> Result<Value, RepositoryError>;

    /// `GET /expenses/type/{type_id}`
    fn list_expenses_by_type(&self, type_id: i64) -> Result<Value, RepositoryError>;

    /// `POST /types`
    fn create_type(&self, request: &ItemTypeRequest) -> Result<Value, RepositoryError>;

    /// `GET /types`
    fn list_types(&self) -> Result<Value, RepositoryError>;
}

/// `ureq`-backed implementation of [`ExpenseApi`]
#[derive(Debug, Clone)]
pub struct HttpExpenseApi {
    base_url: Option<Url>,
    agent: ureq::Agent,
}

impl HttpExpenseApi {
    #[inline]
    pub fn new(base_url: Option<Url>) -> Self {
        Self {
            base_url,
            agent: build_agent(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
        }
    }

    #[inline]
    pub fn from_config(config: &ExpenseTrackerConfig) -> Self {
        Self::new(config.parsed_base_url()).with_timeout(config.timeout())
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Build an endpoint URL from path segments, keeping any path prefix of
    /// the base URL (e.g. `https://host/api/v1`).
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RepositoryError> {
        let mut url = self
            .base_url
            .clone()
            .ok_or(RepositoryError::NotConfigured)?;

        url.path_segments_mut()
            .map_err(|()| RepositoryError::Transport("Base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    fn get(&self, segments: &[&str]) -> Result<Value, RepositoryError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);

        let response = self
            .agent
            .get(url.as_str())
            .header("Accept", "application/json")
            .call();

        Self::read_response(response, &[200])
    }

    fn post<T: Serialize>(&self, segments: &[&str], payload: &T) -> Result<Value, RepositoryError> {
        let url = self.endpoint(segments)?;
        let body = serde_json::to_string(payload)
            .map_err(|e| RepositoryError::Decode(format!("Failed to serialize request: {e}")))?;
        debug!("POST {} {}", url, body);

        let response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(body.as_str());

        Self::read_response(response, &[200, 201])
    }

    fn read_response(
        response: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
        accepted: &[u16],
    ) -> Result<Value, RepositoryError> {
        let mut response = response.map_err(|e| {
            error!("Request error: {}", e);
            RepositoryError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        if !accepted.contains(&status) {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            error!("API error: {} - {}", status, body);
            return Err(RepositoryError::Status { status, body });
        }

        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| RepositoryError::Transport(e.to_string()))?;

        serde_json::from_str(&text).map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}

impl ExpenseApi for HttpExpenseApi {
    #[inline]
    fn create_expense(&self, request: &ExpenseItemRequest) -> Result<Value, RepositoryError> {
        self.post(&["expenses"], request)
    }

    #[inline]
    fn list_expenses(&self) -> Result<Value, RepositoryError> {
        self.get(&["expenses"])
    }

    #[inline]
    fn list_expenses_by_type(&self, type_id: i64) -> Result<Value, RepositoryError> {
        let type_id = type_id.to_string();
        self.get(&["expenses", "type", &type_id])
    }

    #[inline]
    fn create_type(&self, request: &ItemTypeRequest) -> Result<Value, RepositoryError> {
        self.post(&["types"], request)
    }

    #[inline]
    fn list_types(&self) -> Result<Value, RepositoryError> {
        self.get(&["types"])
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Resolve the backend base URL.
///
/// With the `ssm` feature the configured SSM parameter is consulted first; if
/// that fails the configured `base_url` (which `BASE_URL` overrides) is used.
#[inline]
pub async fn resolve_base_url(config: &ExpenseTrackerConfig) -> Option<Url> {
    if let Some(url) = resolve_from_ssm(config).await {
        return Some(url);
    }

    let url = config.parsed_base_url();
    if url.is_none() {
        warn!("No expense tracker base URL configured; set BASE_URL or expense_tracker.base_url");
    }
    url
}

#[cfg(not(feature = "ssm"))]
#[expect(clippy::unused_async, reason = "mirrors the ssm-enabled signature")]
async fn resolve_from_ssm(_config: &ExpenseTrackerConfig) -> Option<Url> {
    None
}

#[cfg(feature = "ssm")]
async fn resolve_from_ssm(config: &ExpenseTrackerConfig) -> Option<Url> {
    let parameter = config.ssm_parameter.as_deref()?;

    match fetch_ssm_parameter(parameter, &config.ssm_region).await {
        Ok(value) => match Url::parse(value.trim()) {
            Ok(url) => {
                debug!("Resolved expense tracker URL from SSM parameter {}", parameter);
                Some(url)
            }
            Err(e) => {
                warn!("SSM parameter {} is not a valid URL: {}", parameter, e);
                None
            }
        },
        Err(e) => {
            warn!("SSM fetch failed, trying configured base_url: {:#}", e);
            None
        }
    }
}

#[cfg(feature = "ssm")]
async fn fetch_ssm_parameter(name: &str, region: &str) -> anyhow::Result<String> {
    use anyhow::Context;

    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await;
    let client = aws_sdk_ssm::Client::new(&sdk_config);

    let output = client
        .get_parameter()
        .name(name)
        .send()
        .await
        .with_context(|| format!("Failed to read SSM parameter {name}"))?;

    output
        .parameter()
        .and_then(|p| p.value())
        .map(str::to_string)
        .with_context(|| format!("SSM parameter {name} has no value"))
}
