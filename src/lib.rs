pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod fingerprint;
pub mod handlers;
pub mod logging;
pub mod service;
pub mod types;

pub use error::InitError;
pub use handlers::{InvocationOutcome, LifecycleHandler};
pub use service::DatabaseInitializer;
pub use types::InvocationEvent;

use std::sync::Arc;

/// Wire the production handler: lazy Secrets Manager, sqlx MySQL, HTTP responses.
pub fn production_handler(cfg: &config::Config) -> Result<LifecycleHandler, InitError> {
    let initializer = DatabaseInitializer::new(
        Arc::new(service::LazySecretsManagerStore::new()),
        Arc::new(db::MySqlConnector::new(cfg.connect_timeout())),
    );
    let responder = Arc::new(api::HttpResponseSender::new(cfg)?);
    Ok(LifecycleHandler::new(initializer, responder, cfg.database_port))
}
