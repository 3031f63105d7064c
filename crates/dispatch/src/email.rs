//! Email dispatch.
//!
//! Outcomes are reported, never raised: a failed send is recorded on the
//! consultation and logged, and must not fail the operation that triggered
//! it.

use async_trait::async_trait;
use leaddesk_core::Consultation;
use reqwest::{Client, ClientBuilder};
use serde_json::json;
use tracing::debug;

/// Result of one dispatch attempt.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Whether the send succeeded
    pub success: bool,

    /// Error detail when it did not
    pub error: Option<String>,
}

impl DispatchOutcome {
    /// A successful send.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A failed send.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Sends confirmation and notification emails for submitted consultations.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    /// Send the confirmation email to the submitter.
    async fn send_confirmation(&self, consultation: &Consultation) -> DispatchOutcome;

    /// Notify the admin inbox of the new submission.
    async fn send_admin_notification(&self, consultation: &Consultation) -> DispatchOutcome;
}

/// Email dispatcher backed by an HTTP template endpoint.
#[derive(Clone)]
pub struct HttpEmailDispatcher {
    /// HTTP client
    client: Client,

    /// Endpoint URL
    endpoint: String,

    /// API key sent with each request
    api_key: String,
}

impl HttpEmailDispatcher {
    /// Create a new dispatcher against `endpoint`.
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            endpoint,
            api_key,
        }
    }

    async fn post_template(&self, template: &str, consultation: &Consultation) -> DispatchOutcome {
        let payload = json!({
            "template": template,
            "api_key": self.api_key,
            "to": consultation.email,
            "params": {
                "name": consultation.name,
                "project_type": consultation.project_type,
                "budget": consultation.budget,
                "consultation_id": consultation.id.to_string(),
            },
        });

        debug!(template, consultation = %consultation.id, "dispatching email");

        let response = match self.client.post(&self.endpoint).json(&payload).send().await {
            Ok(r) => r,
            Err(e) => return DispatchOutcome::failed(format!("email endpoint unreachable: {e}")),
        };

        if response.status().is_success() {
            DispatchOutcome::ok()
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            DispatchOutcome::failed(format!("email endpoint returned {status}: {body}"))
        }
    }
}

#[async_trait]
impl EmailDispatcher for HttpEmailDispatcher {
    async fn send_confirmation(&self, consultation: &Consultation) -> DispatchOutcome {
        self.post_template("consultation_confirmation", consultation)
            .await
    }

    async fn send_admin_notification(&self, consultation: &Consultation) -> DispatchOutcome {
        self.post_template("admin_notification", consultation).await
    }
}

/// Dispatcher that returns a fixed outcome. Used by tests and by the CLI
/// when no endpoint is configured.
pub struct NullDispatcher {
    succeed: bool,
}

impl NullDispatcher {
    /// A dispatcher whose sends always succeed.
    pub fn succeeding() -> Self {
        Self { succeed: true }
    }

    /// A dispatcher whose sends always fail.
    pub fn failing() -> Self {
        Self { succeed: false }
    }
}

#[async_trait]
impl EmailDispatcher for NullDispatcher {
    async fn send_confirmation(&self, _consultation: &Consultation) -> DispatchOutcome {
        if self.succeed {
            DispatchOutcome::ok()
        } else {
            DispatchOutcome::failed("null dispatcher configured to fail")
        }
    }

    async fn send_admin_notification(&self, _consultation: &Consultation) -> DispatchOutcome {
        if self.succeed {
            DispatchOutcome::ok()
        } else {
            DispatchOutcome::failed("null dispatcher configured to fail")
        }
    }
}
