pub mod credentials;
pub mod event;
pub mod request;
pub mod response;

pub use credentials::Credentials;
pub use event::{InvocationEvent, LocalConfig, ResourceProperties, SecretValue};
pub use request::{CredentialSource, DatabaseEndpoint, InitRequest, RequestType, Stage};
pub use response::{CfnResponse, ResponseStatus};
