use std::sync::Arc;
use tracing::{error, info};

use crate::db::statements::{self, Statement};
use crate::db::{SchemaConnector, SchemaSession};
use crate::error::InitError;
use crate::service::secrets::{self, SecretStore};
use crate::types::{Credentials, InitRequest, RequestType};

/// What a successful reconcile did to the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Created,
    Updated,
    Deleted,
    /// Delete on a persistent stage; nothing was dropped.
    Skipped,
}

/// Provisions or removes the application database and user for one request.
#[derive(Clone)]
pub struct DatabaseInitializer {
    secrets: Arc<dyn SecretStore>,
    connector: Arc<dyn SchemaConnector>,
}

impl DatabaseInitializer {
    pub fn new(secrets: Arc<dyn SecretStore>, connector: Arc<dyn SchemaConnector>) -> Self {
        Self { secrets, connector }
    }

    /// Resolve credentials, open one admin session, run the statements for the
    /// request type and close the session again, whatever the outcome.
    pub async fn reconcile(&self, request: &InitRequest) -> Result<Reconciled, InitError> {
        info!(
            endpoint = %request.endpoint,
            from = request.admin_credentials.describe(),
            "loading connection information for database"
        );
        let admin = secrets::resolve_admin(self.secrets.as_ref(), &request.admin_credentials).await?;
        let app = secrets::resolve_app(
            self.secrets.as_ref(),
            &request.app_credentials,
            request.app_username.as_deref(),
        )
        .await?;

        info!(user = %admin.username, endpoint = %request.endpoint, "connecting to database");
        let mut session = self
            .connector
            .connect(&request.endpoint, &admin)
            .await
            .inspect_err(|e| error!(error = %e, "failed to connect to database"))?;

        let result = Self::dispatch(session.as_mut(), request, &app).await;

        info!("disconnecting from database");
        if let Err(e) = session.close().await {
            error!(error = %e, "failed to disconnect from database");
        }
        result
    }

    async fn dispatch(
        session: &mut dyn SchemaSession,
        request: &InitRequest,
        app: &Credentials,
    ) -> Result<Reconciled, InitError> {
        let database = request.app_database_name.as_str();
        match request.request_type {
            RequestType::Create | RequestType::Update => {
                if let Some(prefix) = request.tenant_schema_prefix.as_deref() {
                    info!(tenant_schema_prefix = prefix, "tenant schemas are provisioned by the app");
                }
                info!(database, user = %app.username, "creating app database and user");
                let stmts = statements::create_schema(database, &app.username, &app.password);
                run(session, &stmts).await?;
                Ok(match request.request_type {
                    RequestType::Create => Reconciled::Created,
                    _ => Reconciled::Updated,
                })
            }
            RequestType::Delete if request.stage.is_disposable() => {
                info!(database, user = %app.username, "dropping app database and user");
                run(session, &statements::delete_schema(database, &app.username)).await?;
                Ok(Reconciled::Deleted)
            }
            RequestType::Delete => {
                info!(
                    stage = %request.stage,
                    "\"Delete\" action is not supported in this environment, skipping"
                );
                Ok(Reconciled::Skipped)
            }
        }
    }
}

/// Execute in order; the first failure stops the rest. Nothing is rolled back.
async fn run(session: &mut dyn SchemaSession, stmts: &[Statement]) -> Result<(), InitError> {
    for stmt in stmts {
        info!(label = stmt.label, "running query");
        session
            .execute(stmt)
            .await
            .inspect_err(|e| error!(label = stmt.label, error = %e, "query failed"))?;
    }
    Ok(())
}
