use std::fmt;
use std::str::FromStr;

use crate::error::InitError;
use crate::types::event::{InvocationEvent, SecretValue};

/// Deployment tier of the target environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Prod,
    Stage,
    Dev,
    Sand,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Prod, Stage::Stage, Stage::Dev, Stage::Sand];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Prod => "prod",
            Stage::Stage => "stage",
            Stage::Dev => "dev",
            Stage::Sand => "sand",
        }
    }

    /// Only sandbox environments may have their database dropped.
    pub fn is_disposable(self) -> bool {
        matches!(self, Stage::Sand)
    }
}

impl FromStr for Stage {
    type Err = InitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| InitError::validation(format!("Invalid 'stage' argument: {s}")))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CloudFormation lifecycle event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::Create => "Create",
            RequestType::Update => "Update",
            RequestType::Delete => "Delete",
        }
    }
}

impl FromStr for RequestType {
    type Err = InitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Create" => Ok(RequestType::Create),
            "Update" => Ok(RequestType::Update),
            "Delete" => Ok(RequestType::Delete),
            other => Err(InitError::validation(format!(
                "Unknown request event type: {other}"
            ))),
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a username/password pair comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Secrets Manager secret id or name.
    Secret(String),
    /// Inline `localConfig` value, for local runs.
    Inline(SecretValue),
}

impl CredentialSource {
    pub fn describe(&self) -> &str {
        match self {
            CredentialSource::Secret(name) => name,
            CredentialSource::Inline(_) => "localConfig",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEndpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for DatabaseEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Validated initialization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRequest {
    pub request_type: RequestType,
    pub stage: Stage,
    pub endpoint: DatabaseEndpoint,
    pub app_database_name: String,
    pub admin_credentials: CredentialSource,
    pub app_credentials: CredentialSource,
    /// Used when the app secret carries no username.
    pub app_username: Option<String>,
    pub tenant_schema_prefix: Option<String>,
    pub physical_resource_id: String,
}

impl InitRequest {
    /// Validate an incoming event. Stage is checked before the request type,
    /// and both before anything touches the network.
    pub fn from_event(event: &InvocationEvent, default_port: u16) -> Result<Self, InitError> {
        let props = &event.resource_properties;
        let stage: Stage = props.stage_name().parse()?;
        let request_type: RequestType = event.request_type.parse()?;
        let port = props.database_port(default_port)?;

        let local = props.local_config.clone().unwrap_or_default();
        let admin_credentials = match props.database_secret_name() {
            Some(name) => CredentialSource::Secret(name.to_string()),
            None => CredentialSource::Inline(local.admin()),
        };
        let app_credentials = match props.app_database_secret_name() {
            Some(name) => CredentialSource::Secret(name.to_string()),
            None => CredentialSource::Inline(local.app_user.clone().unwrap_or_default()),
        };

        Ok(Self {
            request_type,
            stage,
            endpoint: DatabaseEndpoint {
                host: props.database_host().to_string(),
                port,
            },
            app_database_name: props.app_database_name(),
            admin_credentials,
            app_credentials,
            app_username: props
                .app_database_username
                .clone()
                .filter(|u| !u.is_empty()),
            tenant_schema_prefix: props.tenant_schema_prefix.clone(),
            physical_resource_id: props.physical_resource_id(),
        })
    }
}
