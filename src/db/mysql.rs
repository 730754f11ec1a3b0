use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Connection, Error as SqlxError};
use std::io;
use std::time::Duration;
use tracing::debug;

use crate::db::statements::Statement;
use crate::error::InitError;
use crate::types::{Credentials, DatabaseEndpoint};

/// Opens the single admin session used by one invocation.
#[async_trait]
pub trait SchemaConnector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &DatabaseEndpoint,
        credentials: &Credentials,
    ) -> Result<Box<dyn SchemaSession>, InitError>;
}

/// An open admin session. Statements run one at a time, in call order.
#[async_trait]
pub trait SchemaSession: Send {
    /// Run one statement; returns affected rows.
    async fn execute(&mut self, statement: &Statement) -> Result<u64, InitError>;

    /// Consumes the session, so a closed session can never be closed twice.
    async fn close(self: Box<Self>) -> Result<(), InitError>;
}

/// sqlx-backed MySQL connector.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    connect_timeout: Duration,
}

impl MySqlConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn options(endpoint: &DatabaseEndpoint, credentials: &Credentials) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&endpoint.host)
            .port(endpoint.port)
            .username(&credentials.username)
            .password(&credentials.password)
    }
}

#[async_trait]
impl SchemaConnector for MySqlConnector {
    async fn connect(
        &self,
        endpoint: &DatabaseEndpoint,
        credentials: &Credentials,
    ) -> Result<Box<dyn SchemaSession>, InitError> {
        let opts = Self::options(endpoint, credentials);
        let conn = tokio::time::timeout(self.connect_timeout, MySqlConnection::connect_with(&opts))
            .await
            .map_err(|_| {
                InitError::Connection(SqlxError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no connection to {endpoint} within {:?}", self.connect_timeout),
                )))
            })?
            .map_err(InitError::Connection)?;
        Ok(Box::new(MySqlSession { conn }))
    }
}

pub struct MySqlSession {
    conn: MySqlConnection,
}

#[async_trait]
impl SchemaSession for MySqlSession {
    async fn execute(&mut self, statement: &Statement) -> Result<u64, InitError> {
        // DDL such as CREATE USER is not always preparable; use the text protocol.
        let conn: &mut MySqlConnection = &mut self.conn;
        let result = sqlx::Executor::execute(conn, sqlx::raw_sql(&statement.sql))
            .await
            .map_err(|source| InitError::Statement {
                label: statement.label,
                source,
            })?;
        debug!(label = statement.label, rows = result.rows_affected(), "query done");
        Ok(result.rows_affected())
    }

    async fn close(self: Box<Self>) -> Result<(), InitError> {
        self.conn.close().await.map_err(InitError::Connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_endpoint() {
        let endpoint = DatabaseEndpoint {
            host: "db.internal".to_string(),
            port: 3307,
        };
        let opts = MySqlConnector::options(&endpoint, &Credentials::new("Admin", "pw"));
        assert_eq!(opts.get_host(), "db.internal");
        assert_eq!(opts.get_port(), 3307);
        assert_eq!(opts.get_username(), "Admin");
    }
}
