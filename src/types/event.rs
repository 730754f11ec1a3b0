use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::InitError;

pub const DEFAULT_DATABASE_HOST: &str = "localhost";
pub const DEFAULT_STAGE: &str = "sand";

/// CloudFormation custom-resource request, as delivered to the function.
///
/// `RequestType` stays a raw string here: an unknown value must still be
/// answered with a FAILED response, so it is only rejected during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationEvent {
    #[serde(default)]
    pub request_type: String,
    #[serde(default)]
    pub resource_properties: ResourceProperties,
    #[serde(rename = "ResponseURL", default, skip_serializing_if = "Option::is_none")]
    pub response_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_token: Option<String>,
}

impl InvocationEvent {
    /// A real CloudFormation invocation carries a pre-signed response URL;
    /// local runs and console test events do not.
    pub fn expects_response(&self) -> bool {
        self.response_url.is_some()
    }

    pub fn physical_resource_id(&self) -> String {
        self.resource_properties.physical_resource_id()
    }

    /// Best-effort envelope of a request whose body does not fit the typed
    /// shape: identifiers and `ResponseURL` are kept so a FAILED response can
    /// still be delivered, and string properties feed the physical id.
    pub fn envelope(raw: &Value) -> Self {
        let text = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(str::to_string);
        let props = raw.get("ResourceProperties").unwrap_or(&Value::Null);
        Self {
            request_type: text(raw, "RequestType").unwrap_or_default(),
            resource_properties: ResourceProperties {
                database_host: text(props, "databaseHost"),
                app_database_name: text(props, "appDatabaseName"),
                stage: text(props, "stage"),
                ..Default::default()
            },
            response_url: text(raw, "ResponseURL").and_then(|u| Url::parse(&u).ok()),
            stack_id: text(raw, "StackId"),
            request_id: text(raw, "RequestId"),
            logical_resource_id: text(raw, "LogicalResourceId"),
            resource_type: text(raw, "ResourceType"),
            service_token: text(raw, "ServiceToken"),
        }
    }
}

/// Untyped property bag of the custom resource. Every field is optional on the
/// wire; defaults are applied by the accessor methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_config: Option<LocalConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_host: Option<String>,
    /// Kept unparsed; a bad value is a validation error, not a malformed event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_port: Option<PortValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_secret_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_database_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_database_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_database_secret_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_schema_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Only present to force CloudFormation to re-run the resource when the
    /// packaged handler changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_indicator: Option<String>,
}

/// `databasePort` as it arrives: CloudFormation stringifies every scalar
/// property, local events may carry a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(serde_json::Number),
    Text(String),
}

impl ResourceProperties {
    /// Defaults apply only to absent properties; an empty string is kept and
    /// rejected by validation.
    pub fn stage_name(&self) -> &str {
        self.stage.as_deref().unwrap_or(DEFAULT_STAGE)
    }

    pub fn database_host(&self) -> &str {
        self.database_host.as_deref().unwrap_or(DEFAULT_DATABASE_HOST)
    }

    pub fn app_database_name(&self) -> String {
        match &self.app_database_name {
            Some(name) => name.clone(),
            None => format!("cortex-{}", self.stage_name()),
        }
    }

    pub fn database_port(&self, default_port: u16) -> Result<u16, InitError> {
        let parsed = match &self.database_port {
            None => return Ok(default_port),
            Some(PortValue::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Some(PortValue::Text(text)) => text.parse().ok(),
        };
        parsed.ok_or_else(|| {
            let shown = match &self.database_port {
                Some(PortValue::Number(n)) => n.to_string(),
                Some(PortValue::Text(text)) => text.clone(),
                None => String::new(),
            };
            InitError::validation(format!("Invalid 'databasePort' argument: {shown}"))
        })
    }

    /// `<databaseHost>#<appDatabaseName>-initialization`.
    ///
    /// Must not vary between Create and Update of the same resource, otherwise
    /// CloudFormation treats the update as a replacement and deletes the old one.
    pub fn physical_resource_id(&self) -> String {
        format!(
            "{}#{}-initialization",
            self.database_host(),
            self.app_database_name()
        )
    }

    pub fn database_secret_name(&self) -> Option<&str> {
        non_empty(self.database_secret_name.as_deref())
    }

    pub fn app_database_secret_name(&self) -> Option<&str> {
        non_empty(self.app_database_secret_name.as_deref())
    }
}

/// Inline credentials for running against a local MySQL without Secrets Manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub app_user: Option<SecretValue>,
}

impl LocalConfig {
    pub fn admin(&self) -> SecretValue {
        SecretValue {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// `{ "username": ..., "password": ... }` as stored in a secret or inline config.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretValue {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretValue")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
