use anyhow::Result;
use clap::Parser;
use thesis_cli::{Cli, run};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let telemetry = if cli.json_logs {
        thesis_telemetry::init_json_telemetry("thesis-cli")
    } else {
        thesis_telemetry::init_telemetry("thesis-cli")
    };
    if let Err(e) = telemetry {
        eprintln!("warning: telemetry not initialised: {e}");
    }

    let output = run(cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
