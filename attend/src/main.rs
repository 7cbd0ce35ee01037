use anyhow::{Context, Result, bail};
use capture::context::FileSessionStore;
use capture::location::{FixedLocation, UnsupportedLocation};
use capture::scanner::LineCamera;
use capture::submission::HttpSubmitter;
use capture::traits::location::LocationProvider;
use capture::{CaptureFlow, Direction, FlowSettings, Outcome};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};
use tracing_appender::rolling;
use util::config;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    CheckIn,
    CheckOut,
}

impl From<Mode> for Direction {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::CheckIn => Direction::CheckIn,
            Mode::CheckOut => Direction::CheckOut,
        }
    }
}

/// Records one check-in or check-out from a station QR code.
///
/// Decoded QR text is read from stdin, one line per frame. A blank line is a
/// frame with no code in view.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// check-in or check-out
    #[arg(value_enum)]
    mode: Mode,
    /// Session file holding the signed-in user and token. Defaults to SESSION_STORE_PATH
    #[arg(long)]
    session: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&config::log_file(), &config::log_level());
    let direction = Direction::from(args.mode);

    let store = Arc::new(match args.session {
        Some(path) => FileSessionStore::new(path),
        None => FileSessionStore::from_config(),
    });
    let location: Arc<dyn LocationProvider> = match FixedLocation::from_config() {
        Some(fixed) => Arc::new(fixed),
        None => {
            warn!("STATION_LATITUDE/STATION_LONGITUDE not set; geolocation unavailable");
            Arc::new(UnsupportedLocation)
        }
    };
    let submitter =
        HttpSubmitter::from_config(store.clone()).context("building attendance client")?;

    let input = Arc::new(AsyncMutex::new(BufReader::new(tokio::io::stdin())));
    let camera = Arc::new(LineCamera::shared(input.clone()));

    let mut flow = CaptureFlow::new(direction, location, camera, Arc::new(submitter), store)
        .with_settings(FlowSettings::from_config());

    let teardown = flow.teardown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            teardown.teardown();
        }
    });

    info!(%direction, api = %config::attendance_api_url(), "station ready");
    println!("{direction}: scan the station QR code.");

    let mut outcome = flow.run().await?;
    loop {
        match outcome {
            Outcome::Succeeded { notice, .. } => {
                println!("{notice}");
                flow.close();
                return Ok(());
            }
            Outcome::TornDown => {
                println!("Cancelled.");
                return Ok(());
            }
            Outcome::Failed { notice, .. } => {
                println!("{notice}");
                if !ask_retry(&input).await? {
                    bail!("{direction} not recorded");
                }
                outcome = flow.retry().await?;
            }
        }
    }
}

async fn ask_retry<R: AsyncBufRead + Unpin>(input: &AsyncMutex<R>) -> Result<bool> {
    print!("Try again? [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    let read = input
        .lock()
        .await
        .read_line(&mut answer)
        .await
        .context("reading answer")?;
    Ok(read > 0 && matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn init_logging(log_file: &str, log_level: &str) -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let file_appender = rolling::daily("logs", log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true);

    let env_filter = EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| EnvFilter::new("attend=info,capture=info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if config::log_to_stdout() {
        registry.with(stdout_layer).init();
    } else {
        registry.init();
    }

    guard
}
