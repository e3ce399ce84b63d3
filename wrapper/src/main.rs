use clap::Parser;

use mcpower_wrapper::WrapperArgs;
use mcpower_wrapper::init_tracing;
use mcpower_wrapper::run_main;

/// Transparent MCP wrapper with security middleware for real-time policy
/// enforcement and monitoring.
#[derive(Debug, Parser)]
#[clap(author, version)]
struct Cli {
    /// JSON/JSONC configuration for the wrapped MCP server.
    #[arg(long)]
    wrapped_config: String,

    /// Name for the wrapper MCP server.
    #[arg(long, default_value = "MCPWrapper")]
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_main(WrapperArgs {
        wrapped_config: cli.wrapped_config,
        name: cli.name,
    })
    .await?;
    Ok(())
}
