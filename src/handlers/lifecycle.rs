use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::ResponseSender;
use crate::error::InitError;
use crate::service::initializer::{DatabaseInitializer, Reconciled};
use crate::types::{CfnResponse, InitRequest, InvocationEvent, ResponseStatus};

/// How an invocation ended, from the platform's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// A SUCCESS response was delivered to CloudFormation.
    Responded {
        physical_resource_id: String,
        reconciled: Reconciled,
    },
    /// No `ResponseURL`: a local or console test run, result only logged.
    Local {
        physical_resource_id: String,
        status: ResponseStatus,
        error: Option<String>,
    },
}

/// Translates the return-based reconcile into the custom-resource protocol.
pub struct LifecycleHandler {
    initializer: DatabaseInitializer,
    responder: Arc<dyn ResponseSender>,
    default_port: u16,
}

impl LifecycleHandler {
    pub fn new(
        initializer: DatabaseInitializer,
        responder: Arc<dyn ResponseSender>,
        default_port: u16,
    ) -> Self {
        Self {
            initializer,
            responder,
            default_port,
        }
    }

    /// Entry point for raw invocation payloads. A body that does not fit the
    /// request shape is still answered with FAILED when its `ResponseURL`
    /// can be recovered.
    pub async fn handle_json(
        &self,
        raw: Value,
        log_stream: &str,
    ) -> Result<InvocationOutcome, InitError> {
        match InvocationEvent::deserialize(&raw) {
            Ok(event) => self.handle(event, log_stream).await,
            Err(e) => {
                warn!(error = %e, "request event does not match the expected shape");
                let event = InvocationEvent::envelope(&raw);
                let err = InitError::validation(format!("Malformed request event: {e}"));
                self.respond(&event, Err(err), log_stream).await
            }
        }
    }

    /// Run one lifecycle event to completion.
    ///
    /// With a `ResponseURL`, exactly one SUCCESS or FAILED response is sent
    /// and awaited before returning; a failed reconcile is then also returned
    /// as `Err` so the invocation itself is marked failed. Without one, errors
    /// are logged and the invocation succeeds.
    pub async fn handle(
        &self,
        event: InvocationEvent,
        log_stream: &str,
    ) -> Result<InvocationOutcome, InitError> {
        let props = &event.resource_properties;
        info!(
            request_type = %event.request_type,
            stage = props.stage_name(),
            database_host = props.database_host(),
            request_id = event.request_id.as_deref().unwrap_or("-"),
            "request event received"
        );
        let result = self.reconcile(&event).await;
        self.respond(&event, result, log_stream).await
    }

    async fn respond(
        &self,
        event: &InvocationEvent,
        result: Result<Reconciled, InitError>,
        log_stream: &str,
    ) -> Result<InvocationOutcome, InitError> {
        let physical_resource_id = event.physical_resource_id();

        let Some(url) = event.response_url.as_ref() else {
            return Ok(match result {
                Ok(reconciled) => {
                    info!(?reconciled, %physical_resource_id, "local invocation finished");
                    InvocationOutcome::Local {
                        physical_resource_id,
                        status: ResponseStatus::Success,
                        error: None,
                    }
                }
                Err(e) => {
                    error!(kind = e.kind(), "Error: {}", e);
                    InvocationOutcome::Local {
                        physical_resource_id,
                        status: ResponseStatus::Failed,
                        error: Some(e.to_string()),
                    }
                }
            });
        };

        let response = match &result {
            Ok(_) => CfnResponse::success(event, &physical_resource_id, log_stream),
            Err(e) => {
                error!(kind = e.kind(), error = %e, "initialization failed");
                CfnResponse::failure(event, &physical_resource_id, &e.to_string())
            }
        };

        if let Err(e) = self.responder.send(url, &response).await {
            error!(error = %e, "failed to deliver lifecycle response");
            return Err(result.err().unwrap_or(e));
        }

        result.map(|reconciled| InvocationOutcome::Responded {
            physical_resource_id,
            reconciled,
        })
    }

    async fn reconcile(&self, event: &InvocationEvent) -> Result<Reconciled, InitError> {
        let request = InitRequest::from_event(event, self.default_port)?;
        self.initializer.reconcile(&request).await
    }
}
