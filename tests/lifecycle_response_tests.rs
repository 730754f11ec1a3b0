use async_trait::async_trait;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    routing::put,
};
use cortex_dbinit::api::HttpResponseSender;
use cortex_dbinit::config::Config;
use cortex_dbinit::db::{SchemaConnector, SchemaSession, Statement};
use cortex_dbinit::service::{DatabaseInitializer, Reconciled, SecretStore};
use cortex_dbinit::types::{Credentials, DatabaseEndpoint, SecretValue};
use cortex_dbinit::{InitError, InvocationEvent, InvocationOutcome, LifecycleHandler};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct Receiver {
    bodies: Arc<Mutex<Vec<(String, Value)>>>,
    calls: Arc<AtomicUsize>,
    fail_first: usize,
    fail_status: StatusCode,
}

impl Receiver {
    fn new(fail_first: usize, fail_status: StatusCode) -> Self {
        Self {
            bodies: Arc::default(),
            calls: Arc::default(),
            fail_first,
            fail_status,
        }
    }
}

async fn receive(State(rx): State<Receiver>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let call = rx.calls.fetch_add(1, Ordering::SeqCst);
    if call < rx.fail_first {
        return rx.fail_status;
    }
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("<missing>")
        .to_string();
    let body: Value = serde_json::from_slice(&body).expect("response body was not JSON");
    rx.bodies.lock().unwrap().push((content_type, body));
    StatusCode::OK
}

async fn spawn_receiver(rx: Receiver) -> String {
    let app = Router::new()
        .route("/cfn/response", put(receive))
        .with_state(rx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server failed");
    });
    format!("http://{addr}/cfn/response?X-Amz-Signature=abc")
}

struct StaticSecrets(HashMap<String, SecretValue>);

#[async_trait]
impl SecretStore for StaticSecrets {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, InitError> {
        self.0.get(name).cloned().ok_or_else(|| InitError::Secret {
            name: name.to_string(),
            message: "ResourceNotFoundException".to_string(),
        })
    }
}

#[derive(Default)]
struct StatementLog(Mutex<Vec<String>>);

struct LoggingConnector(Arc<StatementLog>);

#[async_trait]
impl SchemaConnector for LoggingConnector {
    async fn connect(
        &self,
        _endpoint: &DatabaseEndpoint,
        _credentials: &Credentials,
    ) -> Result<Box<dyn SchemaSession>, InitError> {
        Ok(Box::new(LoggingSession(self.0.clone())))
    }
}

struct LoggingSession(Arc<StatementLog>);

#[async_trait]
impl SchemaSession for LoggingSession {
    async fn execute(&mut self, statement: &Statement) -> Result<u64, InitError> {
        self.0.0.lock().unwrap().push(statement.sql.clone());
        Ok(0)
    }

    async fn close(self: Box<Self>) -> Result<(), InitError> {
        Ok(())
    }
}

fn secrets(app_password: &str) -> Arc<StaticSecrets> {
    Arc::new(StaticSecrets(HashMap::from([
        (
            "cortex-database-secret".to_string(),
            SecretValue {
                username: Some("Admin".to_string()),
                password: Some("master".to_string()),
            },
        ),
        (
            "cortex-database-app-secret-sand".to_string(),
            SecretValue {
                username: Some("cortex-sand".to_string()),
                password: Some(app_password.to_string()),
            },
        ),
    ])))
}

fn handler(app_password: &str, log: Arc<StatementLog>) -> LifecycleHandler {
    let cfg = Config {
        response_max_retries: 2,
        ..Config::default()
    };
    LifecycleHandler::new(
        DatabaseInitializer::new(secrets(app_password), Arc::new(LoggingConnector(log))),
        Arc::new(HttpResponseSender::new(&cfg).expect("http client")),
        cfg.database_port,
    )
}

fn event(request_type: &str, response_url: &str) -> InvocationEvent {
    serde_json::from_value(json!({
        "RequestType": request_type,
        "ResponseURL": response_url,
        "StackId": "arn:aws:cloudformation:eu-central-1:123456789012:stack/cortex-infra/1",
        "RequestId": "5d2ab0d1",
        "LogicalResourceId": "DatabaseInitialization",
        "ResourceType": "Custom::DatabaseInitialization",
        "ResourceProperties": {
            "databaseHost": "cortex.cluster.eu-central-1.rds.amazonaws.com",
            "databaseSecretName": "cortex-database-secret",
            "appDatabaseSecretName": "cortex-database-app-secret-sand",
            "stage": "sand",
            "updateIndicator": "3f1c"
        }
    }))
    .expect("invalid test event")
}

#[tokio::test]
async fn create_sends_success_with_stable_physical_id() {
    let rx = Receiver::new(0, StatusCode::OK);
    let url = spawn_receiver(rx.clone()).await;
    let log = Arc::new(StatementLog::default());

    let outcome = handler("apppw", log.clone())
        .handle(event("Create", &url), "2026/10/19/[$LATEST]0123")
        .await
        .expect("invocation failed");

    assert_eq!(
        outcome,
        InvocationOutcome::Responded {
            physical_resource_id:
                "cortex.cluster.eu-central-1.rds.amazonaws.com#cortex-sand-initialization"
                    .to_string(),
            reconciled: Reconciled::Created,
        }
    );
    assert_eq!(log.0.lock().unwrap().len(), 4);

    let bodies = rx.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    let (content_type, body) = &bodies[0];
    assert_eq!(content_type, "");
    assert_eq!(body["Status"], "SUCCESS");
    assert_eq!(body["RequestId"], "5d2ab0d1");
    assert_eq!(body["LogicalResourceId"], "DatabaseInitialization");
    assert_eq!(body["Data"], json!({}));
    assert_eq!(
        body["PhysicalResourceId"],
        "cortex.cluster.eu-central-1.rds.amazonaws.com#cortex-sand-initialization"
    );
}

#[tokio::test]
async fn missing_app_password_sends_failed_and_runs_nothing() {
    let rx = Receiver::new(0, StatusCode::OK);
    let url = spawn_receiver(rx.clone()).await;
    let log = Arc::new(StatementLog::default());

    let err = handler("", log.clone())
        .handle(event("Update", &url), "stream")
        .await
        .expect_err("invocation should fail");

    assert!(matches!(err, InitError::Credential(_)));
    assert!(log.0.lock().unwrap().is_empty());

    let bodies = rx.bodies.lock().unwrap();
    let body = &bodies[0].1;
    assert_eq!(body["Status"], "FAILED");
    assert!(
        body["Data"]["Error"]
            .as_str()
            .unwrap()
            .contains("cortex-database-app-secret-sand")
    );
}

#[tokio::test]
async fn transient_response_errors_are_retried() {
    let rx = Receiver::new(1, StatusCode::SERVICE_UNAVAILABLE);
    let url = spawn_receiver(rx.clone()).await;
    let log = Arc::new(StatementLog::default());

    let outcome = handler("apppw", log)
        .handle(event("Delete", &url), "stream")
        .await
        .expect("invocation failed");

    assert!(matches!(
        outcome,
        InvocationOutcome::Responded {
            reconciled: Reconciled::Deleted,
            ..
        }
    ));
    assert_eq!(rx.calls.load(Ordering::SeqCst), 2);
    assert_eq!(rx.bodies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_response_is_not_retried() {
    let rx = Receiver::new(usize::MAX, StatusCode::FORBIDDEN);
    let url = spawn_receiver(rx.clone()).await;
    let log = Arc::new(StatementLog::default());

    let err = handler("apppw", log)
        .handle(event("Create", &url), "stream")
        .await
        .expect_err("delivery should fail");

    assert!(matches!(err, InitError::ResponseStatus(StatusCode::FORBIDDEN)));
    assert_eq!(rx.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unresolved_port_token_is_answered_with_failed() {
    let rx = Receiver::new(0, StatusCode::OK);
    let url = spawn_receiver(rx.clone()).await;
    let log = Arc::new(StatementLog::default());

    let mut raw = serde_json::to_value(event("Create", &url)).expect("event serializes");
    raw["ResourceProperties"]["databasePort"] = json!("${Token[TOKEN.42]}");

    let err = handler("apppw", log.clone())
        .handle_json(raw, "stream")
        .await
        .expect_err("invocation should fail");

    assert!(matches!(err, InitError::Validation(_)));
    assert!(log.0.lock().unwrap().is_empty());

    let bodies = rx.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0].1;
    assert_eq!(body["Status"], "FAILED");
    assert_eq!(body["RequestId"], "5d2ab0d1");
    assert_eq!(
        body["PhysicalResourceId"],
        "cortex.cluster.eu-central-1.rds.amazonaws.com#cortex-sand-initialization"
    );
}
