//! topless entrypoint.
use anyhow::{Context, Result};
use core_config::Config;
use core_events::{
    EventSourceRegistry, GEOMETRY_MAILBOX_CAP, GeometryEvent, KEY_MAILBOX_CAP, KeyCommand,
    TICK_MAILBOX_CAP, mailbox,
};
use core_input::InterruptSource;
use core_pipeline::{PipelineSpec, TickOutput, TickerSource};
use core_runtime::{ControlLoop, LoopSettings, Producers, RuntimeError};
use core_terminal::{CrosstermBackend, CrosstermProbe, ResizeEventSource};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Once;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

mod cli;

use cli::Args;

const LOG_FILE: &str = "topless.log";
/// How long runtime teardown may wait on blocking workers (a command still
/// running when the user quit) before the process exits anyway.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(100);

struct AppStartup {
    backend: CrosstermBackend,
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self {
            backend: CrosstermBackend::new(),
            log_guard: None,
        }
    }

    fn log_dir() -> PathBuf {
        dirs::cache_dir()
            .map(|d| d.join("topless"))
            .unwrap_or_else(std::env::temp_dir)
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Self::log_dir();
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("creating log directory {}", log_dir.display()))?;
        let log_path = log_dir.join(LOG_FILE);
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE);
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .with_ansi(false)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global tracing subscriber already installed; drop guard so writer shuts down.
            }
        }

        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }

    /// Wire producers to the control loop and run it. Raw mode (unless
    /// disabled) is held for exactly the lifetime of the loop.
    async fn run(&mut self, args: &Args, config: &Config, spec: PipelineSpec) -> Result<()> {
        let guard = if args.interactive {
            None
        } else {
            Some(
                self.backend
                    .enter_guard()
                    .context("failed to put the terminal in raw mode")?,
            )
        };

        let (pause_tx, pause_rx) = watch::channel(false);
        let (tick_tx, tick_rx) = mailbox::<TickOutput>(TICK_MAILBOX_CAP);
        let (key_tx, key_rx) = mailbox::<KeyCommand>(KEY_MAILBOX_CAP);
        let (geo_tx, geo_rx) = mailbox::<GeometryEvent>(GEOMETRY_MAILBOX_CAP);

        let mut source_handles = Vec::new();
        let mut tick_sources = EventSourceRegistry::new();
        tick_sources.register(TickerSource::new(spec, args.interval, pause_rx));
        source_handles.extend(tick_sources.spawn_all(&tick_tx));
        let mut geometry_sources = EventSourceRegistry::new();
        geometry_sources.register(ResizeEventSource::default());
        source_handles.extend(geometry_sources.spawn_all(&geo_tx));
        let mut key_sources = EventSourceRegistry::new();
        key_sources.register(InterruptSource);
        source_handles.extend(key_sources.spawn_all(&key_tx));

        let (input_task, input_shutdown) = if args.interactive {
            (None, None)
        } else {
            let (task, shutdown) = core_input::spawn_async_input(key_tx.clone());
            (Some(task), Some(shutdown))
        };
        // Only producers hold senders from here on, so a dead ticker shows up
        // as a closed mailbox.
        drop((tick_tx, key_tx, geo_tx));

        let producers = Producers {
            ticks: tick_rx,
            keys: Some(key_rx),
            geometry: Some(geo_rx),
            source_handles,
            input_task,
            input_shutdown,
        };
        let mut control = ControlLoop::new(
            BufWriter::new(io::stdout()),
            Box::new(CrosstermProbe),
            LoopSettings::from_config(config, args.force),
            pause_tx,
            producers,
        );
        let result = control.run().await;

        if let Some(guard) = guard
            && let Err(e) = guard.release()
        {
            warn!(target: "terminal", error = %e, "restore_failed");
        }
        result.map_err(anyhow::Error::from)
    }
}

fn report(err: &anyhow::Error) -> ExitCode {
    let mut stderr = io::stderr().lock();
    let code = match err.downcast_ref::<RuntimeError>() {
        Some(rt) => {
            if let RuntimeError::Pipeline { output, .. } = rt
                && !output.is_empty()
            {
                let _ = write!(stderr, "{output}");
                if !output.ends_with('\n') {
                    let _ = writeln!(stderr);
                }
            }
            rt.exit_code()
        }
        None => 1,
    };
    let _ = writeln!(stderr, "topless: {err:#}");
    ExitCode::from(code)
}

fn main() -> ExitCode {
    let args = Args::parse_normalized();

    let mut startup = AppStartup::new();
    if let Err(e) = startup.configure_logging() {
        eprintln!("topless: logging disabled: {e:#}");
    }
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let config = match core_config::load(args.config.clone()) {
        Ok(config) => config,
        Err(e) => return report(&e),
    };
    let spec = match args.pipeline() {
        Ok(spec) => spec,
        Err(e) => return report(&e.into()),
    };
    let command = spec.display();
    info!(
        target: "runtime.startup",
        command = command.as_str(),
        interval_ms = args.interval.as_millis() as u64,
        interactive = args.interactive,
        force = args.force,
        config = ?config.source,
        "bootstrap_complete"
    );

    let runtime = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            return report(&anyhow::Error::from(e).context("failed to start async runtime"));
        }
    };
    let result = runtime.block_on(startup.run(&args, &config, spec));
    // A command still running after quit is left to finish on its own.
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    match result {
        Ok(()) => {
            info!(target: "runtime", "exit_clean");
            ExitCode::SUCCESS
        }
        Err(e) => {
            info!(target: "runtime", error = ?e, "exit_error");
            report(&e)
        }
    }
}
