pub mod initializer;
pub mod secrets;

pub use initializer::{DatabaseInitializer, Reconciled};
pub use secrets::{LazySecretsManagerStore, SecretStore, SecretsManagerStore};
