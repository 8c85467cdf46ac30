mod config;
mod observability;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use config::JiraArgs;
use observability::{LogFormat, init_tracing};
use owo_colors::OwoColorize as _;
use serde_json::Value;
use std::io::IsTerminal as _;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use unrelated_jira_tools::auth::Credentials;
use unrelated_jira_tools::config::Deployment;
use unrelated_jira_tools::descriptor::Classification;
use unrelated_jira_tools::{JiraConfig, ToolDispatcher, ToolError, ToolInvocation};

/// Exit status for a tool call that reached the dispatcher but failed.
const TOOL_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(name = "unrelated-jira-gateway", version, about)]
struct Cli {
    #[command(flatten)]
    jira: JiraArgs,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, env = "JIRA_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[arg(
        long,
        env = "JIRA_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Compact,
        global = true
    )]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the tools this configuration permits.
    Tools {
        /// Print full MCP tool definitions (name, description, input schema, annotations).
        #[arg(long)]
        json: bool,
    },
    /// Invoke one tool and print its JSON result.
    Call {
        /// Tool name, e.g. `jira_get_issue`.
        tool: String,
        /// Arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Print the effective configuration (secrets hidden) and test the connection.
    Check,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Tools { .. } => "tools",
            Self::Call { .. } => "call",
            Self::Check => "check",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", paint_red("error:"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    debug!(command = cli.command.name(), "starting");
    let config = cli.jira.into_config()?;
    let dispatcher = ToolDispatcher::new(config.clone()).context("configure Jira dispatcher")?;

    match cli.command {
        Command::Tools { json } => {
            list_tools(&dispatcher, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Call { tool, args } => call_tool(&dispatcher, tool, &args).await,
        Command::Check => check_connection(&dispatcher, &config).await,
    }
}

fn list_tools(dispatcher: &ToolDispatcher, json: bool) -> anyhow::Result<()> {
    if json {
        let tools = dispatcher.list_tools();
        let out = serde_json::to_string_pretty(&tools).context("serialize tool list")?;
        println!("{out}");
        return Ok(());
    }

    for descriptor in dispatcher.allowed_tools() {
        let class = match descriptor.classification {
            Classification::Read => "read ",
            Classification::Write => "write",
        };
        println!("{:<34} {class}  {}", descriptor.name, descriptor.description);
    }
    Ok(())
}

async fn call_tool(
    dispatcher: &ToolDispatcher,
    tool: String,
    raw_args: &str,
) -> anyhow::Result<ExitCode> {
    let arguments: Value =
        serde_json::from_str(raw_args).context("parse --args as JSON")?;

    let cancel = cancel_on_ctrl_c();
    info!(tool = %tool, "invoking tool");
    let result = dispatcher
        .invoke_with_cancel(ToolInvocation::new(tool, arguments), &cancel)
        .await;
    cancel.cancel();

    match result {
        Ok(payload) => {
            let out =
                serde_json::to_string_pretty(&payload.to_value()).context("serialize result")?;
            println!("{out}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            debug!(kind = %err.kind, "tool call failed");
            report_tool_error(&err);
            Ok(ExitCode::from(TOOL_FAILURE))
        }
    }
}

async fn check_connection(
    dispatcher: &ToolDispatcher,
    config: &JiraConfig,
) -> anyhow::Result<ExitCode> {
    let auth = Credentials::from_config(config)?.scheme();
    let deployment = match config.deployment() {
        Deployment::Cloud => "cloud",
        Deployment::Server => "server/data center",
    };
    println!("Jira URL:         {}", config.base_url);
    println!("Username:         {}", config.username.as_deref().unwrap_or("-"));
    println!("Auth method:      {auth}");
    println!("Deployment:       {deployment}");
    println!("Read-only:        {}", config.read_only);
    println!("SSL verification: {}", config.verify_tls);
    println!("Timeout:          {}s", config.timeout_seconds);
    println!();

    let cancel = cancel_on_ctrl_c();
    info!("testing Jira connection");
    let result = dispatcher.current_user(&cancel).await;
    cancel.cancel();

    match result {
        Ok(me) => {
            let me = me.to_value();
            let name = me
                .get("displayName")
                .or_else(|| me.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            println!("Connected as: {name}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report_tool_error(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Token cancelled on Ctrl-C. Callers cancel it themselves once done so the watcher exits.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    on_signal.cancel();
                }
            }
            () = on_signal.cancelled() => {}
        }
    });
    cancel
}

fn report_tool_error(err: &ToolError) {
    eprintln!("{} {}", paint_red(err.kind.as_str()), err.message);
}

fn paint_red(s: &str) -> String {
    if std::io::stderr().is_terminal() {
        s.red().bold().to_string()
    } else {
        s.to_string()
    }
}
