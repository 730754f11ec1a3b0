use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::event::InvocationEvent;

pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Body PUT to the pre-signed `ResponseURL` of a custom-resource request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: Map<String, Value>,
}

impl CfnResponse {
    pub fn success(event: &InvocationEvent, physical_resource_id: &str, log_stream: &str) -> Self {
        Self::build(
            event,
            physical_resource_id,
            ResponseStatus::Success,
            format!("See the details in CloudWatch Log Stream: {log_stream}"),
            Map::new(),
        )
    }

    /// FAILED response; an empty message is replaced by a generic one.
    pub fn failure(event: &InvocationEvent, physical_resource_id: &str, message: &str) -> Self {
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            message.to_string()
        };
        let mut data = Map::new();
        data.insert("Error".to_string(), Value::String(message.clone()));
        Self::build(
            event,
            physical_resource_id,
            ResponseStatus::Failed,
            message,
            data,
        )
    }

    fn build(
        event: &InvocationEvent,
        physical_resource_id: &str,
        status: ResponseStatus,
        reason: String,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            status,
            reason,
            physical_resource_id: physical_resource_id.to_string(),
            stack_id: event.stack_id.clone().unwrap_or_default(),
            request_id: event.request_id.clone().unwrap_or_default(),
            logical_resource_id: event.logical_resource_id.clone().unwrap_or_default(),
            no_echo: false,
            data,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.data.get("Error").and_then(Value::as_str)
    }
}
