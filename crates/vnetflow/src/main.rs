use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use vnetflow_cloud::{ApplyEngine, ApplyResult, NetworkConfig, ReportWriter};
use vnetflow_cloud_azure::{ArmClient, ArmConfig};

#[derive(Parser)]
#[command(name = "vnetflow")]
#[command(version)]
#[command(about = "Apply a declarative Azure network topology", long_about = None)]
struct Cli {
    /// Path to the JSON topology file
    #[arg(long = "input-file", alias = "input_file", value_name = "PATH")]
    input_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout is reserved for the run summary
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = NetworkConfig::load(&cli.input_file)
        .await
        .with_context(|| format!("failed to load {}", cli.input_file.display()))?;
    let arm = ArmConfig::from_env().context("Azure credentials unavailable")?;

    tracing::info!(
        input = %cli.input_file.display(),
        resource_groups = config.resource_groups.len(),
        endpoint = %arm.endpoint,
        "Starting apply"
    );

    let engine = ApplyEngine::from_config(Arc::new(ArmClient::new(arm)), &config);
    let collector = engine.run(&config).await;

    let writer = ReportWriter::default();
    writer
        .write(collector.results())
        .await
        .with_context(|| format!("failed to write {}", writer.path().display()))?;

    print_results(collector.results());

    let summary = collector.summary();
    println!();
    if summary.is_clean() {
        println!("{} {}", "✓".green(), summary.to_string().green().bold());
    } else {
        println!("{} {}", "✗".red(), summary.to_string().yellow().bold());
    }
    println!("  {}", writer.path().display().to_string().cyan());

    Ok(())
}

fn print_results(results: &[ApplyResult]) {
    for result in results {
        let label = format!("{} {}", result.kind(), result.display_name());
        match result.reason() {
            None => println!("  {} {} ({})", "✓".green(), label, result.resource_group().dimmed()),
            Some(reason) => println!(
                "  {} {} ({}): {}",
                "✗".red(),
                label,
                result.resource_group().dimmed(),
                reason.red()
            ),
        }
    }
}
