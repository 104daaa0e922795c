//! Claude Runner - run Claude Code non-interactively under supervision.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use claude_runner::config::ConfigLoader;
use claude_runner::display;
use claude_runner::{RunOptions, Runner};

#[derive(Parser)]
#[command(
    name = "claude-runner",
    about = "Run Claude Code non-interactively and stream its answer",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Idle timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the answer once it is complete instead of streaming it.
    #[arg(long)]
    no_stream: bool,

    /// Do not pass --verbose to Claude Code.
    #[arg(long)]
    no_verbose: bool,

    /// Copy Claude Code's stderr to stderr.
    #[arg(long)]
    forward_stderr: bool,

    /// The prompt. Multiple words are joined with spaces.
    prompt: Vec<String>,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Cancel `token` on the first SIGINT or SIGTERM.
fn forward_shutdown_signals(token: CancellationToken) {
    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        tracing::info!(signal, "Received shutdown signal, terminating Claude");
        token.cancel();
    });
}

#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let prompt = cli.prompt.join(" ").trim().to_string();
    if prompt.is_empty() {
        display::print_usage("claude-runner");
        return ExitCode::from(2);
    }

    let loader = cli.config.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let mut config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            display::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if cli.no_stream {
        config.stream_output = false;
    }
    if cli.no_verbose {
        config.verbose = false;
    }
    if cli.forward_stderr {
        config.forward_stderr = true;
    }

    let cancel = CancellationToken::new();
    forward_shutdown_signals(cancel.clone());

    tracing::info!(
        program = %config.program,
        timeout_secs = config.timeout_secs,
        stream_output = config.stream_output,
        "Starting Claude run"
    );

    let runner = Runner::new(RunOptions::from(&config));
    let mut stdout = std::io::stdout();
    match runner.execute(&prompt, &mut stdout, &cancel).await {
        Ok(answer) => {
            if !runner.options().stream_output {
                let _ = writeln!(stdout, "{answer}");
            }
            tracing::info!(chars = answer.chars().count(), "Claude run completed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
