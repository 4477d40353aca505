#![forbid(unsafe_code)]

//! `entry-bridge`: console data-entry client for a remote entry engine.
//!
//! Bootstraps configuration, connects to the engine over HTTP, and runs an
//! interactive entry dialogue on stdin/stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{BufReader, Stdin, Stdout};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use entry_bridge::channel::http::HttpChannel;
use entry_bridge::channel::OperationChannel;
use entry_bridge::command::{dispatch, ConsoleCommand, Flow};
use entry_bridge::config::GlobalConfig;
use entry_bridge::controller::{ControllerSettings, EntryController, FieldEntry};
use entry_bridge::presenter::console::ConsolePresenter;
use entry_bridge::presenter::InteractionPresenter;
use entry_bridge::surface::MemorySurface;
use entry_bridge::{AppError, Result};

type Console = ConsolePresenter<BufReader<Stdin>, Stdout>;
type Controller = EntryController<MemorySurface>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Enter a new case.
    Add,
    /// Modify an existing case.
    Modify {
        /// Case key as listed by `cases`.
        case_key: String,
    },
    /// List the case identifiers of the data file.
    Cases,
    /// Print engine status.
    Status,
}

#[derive(Debug, Parser)]
#[command(name = "entry-bridge", about = "Console client for a remote data-entry engine", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    mode: Mode,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("entry-bridge bootstrap");

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.load_credentials().await;
    info!(base_url = %config.engine.base_url, application = %config.engine.application, "configuration loaded");

    // ── Wire the control core ───────────────────────────
    let http = Arc::new(HttpChannel::new(&config)?);
    let channel: Arc<dyn OperationChannel> = Arc::clone(&http) as Arc<dyn OperationChannel>;
    let console = Arc::new(Console::stdio());
    let presenter: Arc<dyn InteractionPresenter> = Arc::clone(&console) as Arc<dyn InteractionPresenter>;
    let mut controller = EntryController::new(
        channel,
        presenter,
        MemorySurface::new(),
        ControllerSettings::from(&config),
    );

    // ── Shutdown signal ─────────────────────────────────
    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        signal_ct.cancel();
    });

    // ── Run the requested mode ──────────────────────────
    let outcome = tokio::select! {
        () = ct.cancelled() => Ok(()),
        result = run_mode(args.mode, &mut controller, &console) => result,
    };
    if let Err(ref err) = outcome {
        error!(%err, "entry-bridge stopped with an error");
    }

    // ── Graceful shutdown ───────────────────────────────
    if let Err(err) = controller.shutdown().await {
        warn!(%err, "failed to destroy engine session");
    }
    http.close();
    info!("entry-bridge shut down");

    outcome
}

async fn run_mode(mode: Mode, controller: &mut Controller, console: &Console) -> Result<()> {
    match mode {
        Mode::Cases => {
            let ids = controller.sequential_case_ids().await?;
            if ids.is_empty() {
                console.write_line("(no cases)").await?;
            }
            for id in ids {
                console.write_line(&id).await?;
            }
            Ok(())
        }
        Mode::Status => {
            let status = controller.status().await?;
            let text = serde_json::to_string_pretty(&status)?;
            console.write_line(&text).await
        }
        Mode::Add => {
            controller.start_add().await?;
            entry_loop(controller, console).await
        }
        Mode::Modify { case_key } => {
            let (_, report) = controller.start_modify(&case_key).await?;
            console
                .write_line(&format!(
                    "loaded {} of {} fields ({} check-box values skipped, {} unmatched)",
                    report.populated, report.total_fields, report.skipped_checkbox, report.unmatched
                ))
                .await?;
            entry_loop(controller, console).await
        }
    }
}

/// Drive entry field by field until the engine reports no current field
/// or the operator quits.
async fn entry_loop(controller: &mut Controller, console: &Console) -> Result<()> {
    loop {
        let Some(field) = controller.page().current_field().cloned() else {
            console.write_line("entry complete").await?;
            return Ok(());
        };

        match controller.enter_current_field().await {
            Ok(FieldEntry::Advanced(_)) => continue,
            Ok(FieldEntry::External) => {
                console
                    .write_line(&format!("{} is captured externally; type a value or a command", field.name))
                    .await?;
            }
            Ok(FieldEntry::Abandoned | FieldEntry::TypedInput) => {}
            Err(err) => report(console, err).await?,
        }

        let label = if field.label.is_empty() {
            field.name.clone()
        } else {
            format!("{} [{}]", field.label, field.key())
        };
        let Some(line) = console.prompt_line(&format!("{label}> ")).await? else {
            info!("end of input");
            return Ok(());
        };

        let command = match line.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(message) => {
                console.write_line(&message).await?;
                continue;
            }
        };

        match dispatch(controller, command).await {
            Ok(Flow::Quit) => return Ok(()),
            Ok(Flow::Continue(Some(message))) => console.write_line(&message).await?,
            Ok(Flow::Continue(None)) => {}
            Err(err) => report(console, err).await?,
        }
    }
}

/// Show a recoverable error to the operator; propagate fatal ones.
async fn report(console: &Console, err: AppError) -> Result<()> {
    if err.is_fatal() {
        return Err(err);
    }
    warn!(%err, "operation failed");
    console.write_line(&format!("error: {err}")).await
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
