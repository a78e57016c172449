//! Service Bridge: a typed `reqwest` client for the Knowledge Store,
//! Vector/Document Search, and Coordination Hub reference services.
//!
//! One long-lived [`reqwest::Client`] per [`ServiceBridge`], reused across
//! every call. Every call applies a per-request timeout and retries
//! transient failures with exponential backoff before giving up with a
//! categorized [`BridgeError`].

pub mod config;
pub mod types;

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{instrument, warn};

pub use config::BridgeConfig;
pub use types::{
    CreateTaskRequest, CreateTaskResponse, HealthResponse, KnowledgeItem, ListTasksResponse,
    SearchRequest, SearchResponse, StoreKnowledgeRequest, StoreKnowledgeResponse, TaskRecord,
    UpdateTaskRequest,
};

use crate::error::BridgeError;

/// One of the three reference services addressed by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
    Knowledge,
    Vector,
    Coordination,
}

impl Service {
    fn base_url<'a>(self, config: &'a BridgeConfig) -> &'a str {
        match self {
            Self::Knowledge => &config.knowledge_url,
            Self::Vector => &config.vector_url,
            Self::Coordination => &config.coordination_url,
        }
    }
}

/// Typed client over the three reference services, mirroring the original
/// system's `ServiceBridge` helper.
pub struct ServiceBridge {
    http: reqwest::Client,
    config: BridgeConfig,
}

impl ServiceBridge {
    /// Builds a bridge with its own connection pool.
    ///
    /// # Panics
    ///
    /// Panics if the underlying `reqwest::Client` cannot be built, which
    /// only happens if the platform's TLS backend fails to initialize.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout.as_duration())
            .build()
            .expect("reqwest client builds with default TLS backend");
        Self { http, config }
    }

    /// Stores a new knowledge item.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`].
    pub async fn store_knowledge(
        &self,
        request: &StoreKnowledgeRequest,
    ) -> Result<StoreKnowledgeResponse, BridgeError> {
        self.post(Service::Knowledge, "/store_knowledge", request).await
    }

    /// Searches stored knowledge items.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`].
    pub async fn search_knowledge(&self, request: &SearchRequest) -> Result<SearchResponse, BridgeError> {
        self.post(Service::Knowledge, "/search_knowledge", request).await
    }

    /// Lists the most recent knowledge items.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`].
    pub async fn list_knowledge(&self, limit: Option<u32>) -> Result<Vec<KnowledgeItem>, BridgeError> {
        let path = match limit {
            Some(limit) => format!("/list_knowledge?limit={limit}"),
            None => "/list_knowledge".to_string(),
        };
        self.get(Service::Knowledge, &path).await
    }

    /// Stores a new document in the vector/document search service.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`].
    pub async fn store_document(
        &self,
        request: &StoreKnowledgeRequest,
    ) -> Result<StoreKnowledgeResponse, BridgeError> {
        self.post(Service::Vector, "/store_knowledge", request).await
    }

    /// Searches stored documents by title/content relevance.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`].
    pub async fn search_documents(&self, request: &SearchRequest) -> Result<SearchResponse, BridgeError> {
        self.post(Service::Vector, "/search_knowledge", request).await
    }

    /// Creates a task record on the Coordination Hub.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`].
    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<CreateTaskResponse, BridgeError> {
        self.post(Service::Coordination, "/create_task", request).await
    }

    /// Lists Coordination Hub task records, optionally filtered.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`].
    pub async fn list_hub_tasks(
        &self,
        status: Option<&str>,
        assigned_to: Option<&str>,
        limit: Option<u32>,
    ) -> Result<ListTasksResponse, BridgeError> {
        let mut query = Vec::new();
        if let Some(status) = status {
            query.push(format!("status={status}"));
        }
        if let Some(assigned_to) = assigned_to {
            query.push(format!("assigned_to={assigned_to}"));
        }
        if let Some(limit) = limit {
            query.push(format!("limit={limit}"));
        }
        let path = if query.is_empty() {
            "/tasks".to_string()
        } else {
            format!("/tasks?{}", query.join("&"))
        };
        self.get(Service::Coordination, &path).await
    }

    /// Appends a status update to a Coordination Hub task record.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`].
    pub async fn update_hub_task(
        &self,
        task_id: &str,
        request: &UpdateTaskRequest,
    ) -> Result<TaskRecord, BridgeError> {
        let path = format!("/tasks/{task_id}");
        self.put(Service::Coordination, &path, request).await
    }

    /// Marks a Coordination Hub task complete.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`].
    pub async fn complete_hub_task(
        &self,
        task_id: &str,
        result: Option<serde_json::Value>,
    ) -> Result<TaskRecord, BridgeError> {
        self.post(
            Service::Coordination,
            "/complete_task",
            &serde_json::json!({ "task_id": task_id, "result": result }),
        )
        .await
    }

    /// Checks a service's `/health` endpoint.
    ///
    /// # Errors
    ///
    /// See [`BridgeError`].
    pub async fn health(&self, service: &str) -> Result<HealthResponse, BridgeError> {
        let target = match service {
            "knowledge" => Service::Knowledge,
            "vector" => Service::Vector,
            _ => Service::Coordination,
        };
        self.get(target, "/health").await
    }

    #[instrument(skip(self, body), fields(service = ?service, path))]
    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        body: &B,
    ) -> Result<R, BridgeError> {
        self.call_with_retry(service, path, |url| self.http.post(url).json(body))
            .await
    }

    #[instrument(skip(self, body), fields(service = ?service, path))]
    async fn put<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        body: &B,
    ) -> Result<R, BridgeError> {
        self.call_with_retry(service, path, |url| self.http.put(url).json(body))
            .await
    }

    #[instrument(skip(self), fields(service = ?service, path))]
    async fn get<R: DeserializeOwned>(&self, service: Service, path: &str) -> Result<R, BridgeError> {
        self.call_with_retry(service, path, |url| self.http.get(url)).await
    }

    async fn call_with_retry<R: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        build: impl Fn(&str) -> reqwest::RequestBuilder,
    ) -> Result<R, BridgeError> {
        let endpoint = format!("{}{path}", service.base_url(&self.config));
        let attempts = self.config.max_retries.as_u8() + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match build(&endpoint).send().await {
                Ok(response) => return self.handle_response(&endpoint, response).await,
                Err(err) => {
                    warn!(endpoint, attempt, error = %err, "bridge call failed, retrying");
                    last_error = Some(err);
                    if attempt < attempts {
                        tokio::time::sleep(backoff_delay(attempt)).await;
                    }
                }
            }
        }

        Err(BridgeError::ExhaustedRetries {
            endpoint,
            attempts,
            source: last_error.expect("loop ran at least once"),
        })
    }

    async fn handle_response<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<R, BridgeError> {
        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("detail").and_then(|d| d.as_str()).map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            return Err(BridgeError::ServiceError {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                detail,
            });
        }

        response.json::<R>().await.map_err(|source| BridgeError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

fn backoff_delay(attempt: u8) -> Duration {
    Duration::from_millis(100u64.saturating_mul(1u64 << attempt.min(10)))
}
