use clap::{Parser, Subcommand};
use cortex_dbinit::config::CONFIG;
use cortex_dbinit::fingerprint;
use cortex_dbinit::types::{LocalConfig, ResourceProperties, SecretValue};
use cortex_dbinit::{InitError, InvocationEvent, InvocationOutcome};
use mimalloc::MiMalloc;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Local helpers for the database initializer function.
#[derive(Debug, Parser)]
#[command(name = "dbinit-tools", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one lifecycle event against a reachable MySQL server.
    ///
    /// Without `--event`, a Create event for a local `mysql:latest` container
    /// (root/mysql) is used.
    InvokeLocal {
        /// Path to a custom-resource request JSON file.
        #[arg(long, env = "DBINIT_EVENT")]
        event: Option<PathBuf>,
    },
    /// Print the change indicator for the given files and directories.
    ChangeIndicator {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the SHA-256 hex digest of a string.
    StringHash { value: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::InvokeLocal { event } => {
            cortex_dbinit::logging::init(&CONFIG.loglevel, true);
            match invoke_local(event.as_deref()).await {
                Ok(InvocationOutcome::Local { error: None, .. })
                | Ok(InvocationOutcome::Responded { .. }) => ExitCode::SUCCESS,
                Ok(InvocationOutcome::Local { error: Some(_), .. }) => ExitCode::FAILURE,
                Err(e) => {
                    error!(error = %e, "local invocation failed");
                    ExitCode::FAILURE
                }
            }
        }
        Command::ChangeIndicator { paths } => {
            match fingerprint::compute_file_collection_hash(&paths) {
                Ok(hash) => {
                    println!("{hash}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("failed to hash {paths:?}: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::StringHash { value } => {
            println!("{}", fingerprint::compute_string_hash(&value));
            ExitCode::SUCCESS
        }
    }
}

async fn invoke_local(path: Option<&Path>) -> Result<InvocationOutcome, InitError> {
    let handler = cortex_dbinit::production_handler(&CONFIG)?;
    let outcome = match path {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path).await?;
            handler.handle_json(serde_json::from_str(&raw)?, "local").await?
        }
        None => handler.handle(default_local_event(), "local").await?,
    };
    info!(?outcome, "local invocation finished");
    Ok(outcome)
}

/// Create event against `docker run -e MYSQL_ROOT_PASSWORD=mysql -p 3306:3306 mysql:latest`.
fn default_local_event() -> InvocationEvent {
    InvocationEvent {
        request_type: "Create".to_string(),
        resource_properties: ResourceProperties {
            local_config: Some(LocalConfig {
                username: Some("root".to_string()),
                password: Some("mysql".to_string()),
                app_user: Some(SecretValue {
                    username: Some("cortex-sand".to_string()),
                    password: Some("123456".to_string()),
                }),
            }),
            ..Default::default()
        },
        ..Default::default()
    }
}
