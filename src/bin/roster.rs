use anyhow::Result;
use roster::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    action.execute().await?;

    // Flush any buffered spans before the process exits.
    cli::telemetry::shutdown_tracer();

    Ok(())
}
