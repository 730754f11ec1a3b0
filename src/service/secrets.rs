use async_trait::async_trait;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::error::InitError;
use crate::types::{CredentialSource, Credentials, SecretValue};

/// Key/value secret lookup by name.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, InitError>;
}

/// AWS Secrets Manager; the secret string must be a JSON object with
/// `username` and `password`.
#[derive(Clone)]
pub struct SecretsManagerStore {
    client: SecretsManagerClient,
}

impl SecretsManagerStore {
    pub fn new(client: SecretsManagerClient) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS environment (region, role, ...).
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_from_env().await;
        Self::new(SecretsManagerClient::new(&sdk_config))
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, InitError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!(secret = name, error = %message, "secret value retrieval failed");
                InitError::Secret {
                    name: name.to_string(),
                    message,
                }
            })?;
        let raw = output.secret_string().ok_or_else(|| InitError::Secret {
            name: name.to_string(),
            message: "secret has no SecretString".to_string(),
        })?;
        parse_secret(name, raw)
    }
}

/// Secrets Manager store whose client is only built on first lookup, so
/// events that carry inline `localConfig` never load AWS configuration.
#[derive(Default)]
pub struct LazySecretsManagerStore {
    inner: OnceCell<SecretsManagerStore>,
}

impl LazySecretsManagerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for LazySecretsManagerStore {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, InitError> {
        let store = self.inner.get_or_init(SecretsManagerStore::from_env).await;
        store.get_secret(name).await
    }
}

pub fn parse_secret(name: &str, raw: &str) -> Result<SecretValue, InitError> {
    serde_json::from_str(raw).map_err(|e| InitError::Secret {
        name: name.to_string(),
        message: format!("SecretString is not a JSON object: {e}"),
    })
}

async fn load(store: &dyn SecretStore, source: &CredentialSource) -> Result<SecretValue, InitError> {
    match source {
        CredentialSource::Secret(name) => store.get_secret(name).await,
        CredentialSource::Inline(value) => Ok(value.clone()),
    }
}

/// Master credentials used to open the admin session.
pub async fn resolve_admin(
    store: &dyn SecretStore,
    source: &CredentialSource,
) -> Result<Credentials, InitError> {
    info!(from = source.describe(), "loading admin database credentials");
    let value = load(store, source).await?;
    let username = value
        .username
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            InitError::credential(format!(
                "'{}' does not have the required property 'username'",
                source.describe()
            ))
        })?;
    Ok(Credentials::new(username, value.password.unwrap_or_default()))
}

/// Application user credentials. A missing or empty password is fatal: the
/// user must never be created without one.
pub async fn resolve_app(
    store: &dyn SecretStore,
    source: &CredentialSource,
    username_fallback: Option<&str>,
) -> Result<Credentials, InitError> {
    info!(from = source.describe(), "loading app database user credentials");
    let value = load(store, source).await?;

    let Some(password) = value.password.filter(|p| !p.is_empty()) else {
        error!(
            from = source.describe(),
            "credentials lack the required property 'password'"
        );
        return Err(InitError::credential(format!(
            "no password for the app-secret '{}' could be found!",
            source.describe()
        )));
    };

    let username = value
        .username
        .filter(|u| !u.is_empty())
        .or_else(|| username_fallback.map(str::to_string))
        .ok_or_else(|| {
            InitError::credential(format!(
                "no username for the app-secret '{}' could be found!",
                source.describe()
            ))
        })?;

    info!(from = source.describe(), user = %username, "got app database user credentials");
    Ok(Credentials::new(username, password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapStore(HashMap<String, SecretValue>);

    #[async_trait]
    impl SecretStore for MapStore {
        async fn get_secret(&self, name: &str) -> Result<SecretValue, InitError> {
            self.0.get(name).cloned().ok_or_else(|| InitError::Secret {
                name: name.to_string(),
                message: "ResourceNotFoundException".to_string(),
            })
        }
    }

    fn secret(username: Option<&str>, password: Option<&str>) -> SecretValue {
        SecretValue {
            username: username.map(str::to_string),
            password: password.map(str::to_string),
        }
    }

    fn store() -> MapStore {
        MapStore(HashMap::from([
            ("admin".to_string(), secret(Some("Admin"), Some("master"))),
            ("app".to_string(), secret(Some("cortex-dev"), Some("apppw"))),
            ("app-nopass".to_string(), secret(Some("cortex-dev"), Some(""))),
            ("app-nouser".to_string(), secret(None, Some("apppw"))),
        ]))
    }

    #[tokio::test]
    async fn resolves_from_secret_store() {
        let store = store();
        let admin = resolve_admin(&store, &CredentialSource::Secret("admin".into()))
            .await
            .unwrap();
        assert_eq!(admin, Credentials::new("Admin", "master"));
        let app = resolve_app(&store, &CredentialSource::Secret("app".into()), None)
            .await
            .unwrap();
        assert_eq!(app, Credentials::new("cortex-dev", "apppw"));
    }

    #[tokio::test]
    async fn empty_app_password_is_a_credential_error() {
        let store = store();
        let err = resolve_app(&store, &CredentialSource::Secret("app-nopass".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, InitError::Credential(_)));

        let err = resolve_app(&store, &CredentialSource::Inline(SecretValue::default()), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("localConfig"));
    }

    #[tokio::test]
    async fn username_falls_back_to_property() {
        let store = store();
        let app = resolve_app(
            &store,
            &CredentialSource::Secret("app-nouser".into()),
            Some("cortex-stage"),
        )
        .await
        .unwrap();
        assert_eq!(app.username, "cortex-stage");
    }

    #[tokio::test]
    async fn missing_secret_propagates() {
        let err = resolve_admin(&store(), &CredentialSource::Secret("nope".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, InitError::Secret { .. }));
    }

    #[test]
    fn secret_string_must_be_json() {
        assert!(parse_secret("x", "not json").is_err());
        let value = parse_secret("x", r#"{"username":"Admin","password":"p","engine":"mysql"}"#)
            .unwrap();
        assert_eq!(value.username.as_deref(), Some("Admin"));
    }
}
