use cortex_dbinit::config::CONFIG;
use lambda_runtime::{Error, LambdaEvent, service_fn};
use mimalloc::MiMalloc;
use serde_json::Value;
use tracing::info;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    let cfg = &*CONFIG;
    // CloudWatch does not render ANSI colours.
    cortex_dbinit::logging::init(&cfg.loglevel, false);

    info!(
        loglevel = %cfg.loglevel,
        database_port = cfg.database_port,
        connect_timeout_secs = cfg.connect_timeout_secs,
        response_timeout_secs = cfg.response_timeout_secs,
        "database initializer starting"
    );

    let handler = cortex_dbinit::production_handler(cfg)?;
    let handler = &handler;

    lambda_runtime::run(service_fn(
        // Untyped payload, so a request of unexpected shape is still answered.
        move |event: LambdaEvent<Value>| async move {
            let (payload, ctx) = event.into_parts();
            handler
                .handle_json(payload, &ctx.env_config.log_stream)
                .await
                .map(|_| "OK")
                .map_err(Error::from)
        },
    ))
    .await
}
