//! MCPower multitool: the wrapper proxy and the IDE hook handlers behind
//! one binary.

use clap::Parser;
use tokio::io::AsyncReadExt;

use mcpower_hooks::HookRuntime;
use mcpower_hooks::output::HookOutcome;
use mcpower_wrapper::WrapperArgs;
use mcpower_wrapper::init_tracing;

/// Transparent MCP wrapper with security middleware for real-time policy
/// enforcement and monitoring.
#[derive(Debug, Parser)]
#[clap(author, version)]
struct MultitoolCli {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    /// Run the security proxy around a wrapped MCP server.
    #[clap(visible_alias = "w")]
    Wrapper(WrapperCli),

    /// Run one IDE hook: read JSON from stdin, print a verdict to stdout.
    Hook(HookArgs),
}

#[derive(Debug, Parser)]
struct WrapperCli {
    /// JSON/JSONC configuration for the wrapped MCP server.
    #[arg(long)]
    wrapped_config: String,

    /// Name for the wrapper MCP server.
    #[arg(long, default_value = "MCPWrapper")]
    name: String,
}

#[derive(Debug, Parser)]
struct HookArgs {
    #[command(subcommand)]
    ide: HookIde,
}

#[derive(Debug, clap::Subcommand)]
enum HookIde {
    /// Handle a Claude Code hook invocation.
    ClaudeCode,
    /// Handle a Cursor hook invocation.
    Cursor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = MultitoolCli::parse();

    match cli.subcommand {
        Subcommand::Wrapper(wrapper_cli) => {
            mcpower_wrapper::run_main(WrapperArgs {
                wrapped_config: wrapper_cli.wrapped_config,
                name: wrapper_cli.name,
            })
            .await?;
            Ok(())
        }
        Subcommand::Hook(hook_args) => {
            let mut stdin_input = String::new();
            tokio::io::stdin().read_to_string(&mut stdin_input).await?;

            let runtime = HookRuntime::from_env();
            let outcome = match hook_args.ide {
                HookIde::ClaudeCode => {
                    mcpower_hooks::route_claude_code(&runtime, &stdin_input).await
                }
                HookIde::Cursor => mcpower_hooks::route_cursor(&runtime, &stdin_input).await,
            };
            emit_and_exit(outcome)
        }
    }
}

fn emit_and_exit(outcome: HookOutcome) -> ! {
    if !outcome.body.is_null() {
        println!("{}", outcome.body);
    }
    std::process::exit(outcome.exit_code);
}
