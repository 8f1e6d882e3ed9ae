use gsheet_log_sink::init::init_tracing;
use gsheet_log_sink::record::Context;
use gsheet_log_sink::{LoggerConfig, SheetLogger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    // Reads .env / the environment; run `gsheet-init init` first.
    let config = LoggerConfig::from_env()?;
    let logger = SheetLogger::from_config(&config).await?;
    println!("logging to {}", logger.url());

    logger.log("info", "service started", None).await;

    let mut context = Context::new();
    context.insert("order_id".to_string(), serde_json::json!(123));
    let report = logger.log("error", "order failed", Some(&context)).await;
    println!("append: {:?}, alert: {:?}", report.append, report.alert);

    Ok(())
}
