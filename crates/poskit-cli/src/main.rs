//! poskit - drive a POS customer display from the command line
//!
//! Every invocation connects to the display, runs one action through the
//! display arbiter, prints the result as JSON on stdout and disconnects.
//!
//! # Usage
//!
//! ```bash
//! # Show a total on a serial display
//! poskit --port /dev/ttyUSB0 total 1250
//!
//! # Two free lines with a priority
//! poskit --port COM3 write "Coffee" "2.50EUR" --priority 6
//!
//! # Try it without hardware
//! poskit --mock demo
//!
//! # Verbose logging (written to stderr)
//! RUST_LOG=poskit_display=debug poskit --mock status
//! ```

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use poskit_display::mock::{MockDisplay, MockDisplayHandle};
use poskit_display::serial::SerialDisplay;
use poskit_display::{AnyDisplayDriver, DisplayArbiter, DisplayHandle, OperationHandle, Outcome};
use serde_json::json;
use tracing::{debug, info, warn};

use config::AppConfig;

/// Port name reported when running against the mock display.
const MOCK_PORT: &str = "mock";

/// Drive a POS customer display
#[derive(Parser, Debug)]
#[command(name = "poskit")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serial port of the display
    #[arg(short = 'p', long, env = "POSKIT_PORT", value_name = "PORT")]
    port: Option<String>,

    /// Baud rate override
    #[arg(short = 'b', long, env = "POSKIT_BAUD")]
    baud: Option<u32>,

    /// Configuration file (JSON)
    #[arg(short = 'c', long, env = "POSKIT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Use the in-memory mock display instead of a serial port
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Action {
    /// Show two lines of text
    Write {
        line1: String,
        #[arg(default_value = "")]
        line2: String,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        priority: i32,
    },
    /// Show the welcome screen
    Welcome,
    /// Show an item and its price in cents
    Price { item: String, cents: i64 },
    /// Show the total in cents
    Total { cents: i64 },
    /// Show the thank-you screen
    Thanks,
    /// Show an error message
    Error { message: String },
    /// Blank the display
    Clear,
    /// Print the arbiter status
    Status,
    /// Run a short checkout sequence
    Demo,
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("poskit=info,poskit_display=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn build_driver(mock: bool) -> (AnyDisplayDriver, Option<MockDisplayHandle>) {
    if mock {
        let (display, handle) = MockDisplay::new();
        (display.into(), Some(handle))
    } else {
        (SerialDisplay::new().into(), None)
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Await one operation and describe its result.
async fn settle(label: &str, operation: OperationHandle) -> serde_json::Value {
    match operation.await {
        Ok(outcome) => json!({ "action": label, "outcome": outcome }),
        Err(error) => {
            warn!(action = label, %error, "Display action failed");
            json!({ "action": label, "error": error.to_string() })
        }
    }
}

fn submit(display: &DisplayHandle, action: &Action) -> Option<OperationHandle> {
    let operation = match action {
        Action::Write {
            line1,
            line2,
            priority,
        } => display.write_lines(line1.as_str(), line2.as_str(), *priority),
        Action::Welcome => display.show_welcome(),
        Action::Price { item, cents } => display.show_price(item.as_str(), *cents),
        Action::Total { cents } => display.show_total(*cents),
        Action::Thanks => display.show_thank_you(),
        Action::Error { message } => display.show_error(message.as_str()),
        Action::Clear => display.clear(),
        Action::Status | Action::Demo => return None,
    };
    Some(operation)
}

/// Walk through a checkout: welcome, two scans arriving at once, the total
/// (refreshed twice in a row) and the goodbye screen.
async fn run_demo(display: &DisplayHandle) -> Vec<serde_json::Value> {
    let mut steps = vec![settle("welcome", display.show_welcome()).await];

    let scans = [
        display.show_price("Espresso", 180),
        display.show_price("Croissant", 220),
    ];
    steps.extend(join_all(scans.into_iter().map(|scan| settle("price", scan))).await);

    steps.push(settle("total", display.show_total(400)).await);
    steps.push(settle("total", display.show_total(400)).await);
    steps.push(settle("thanks", display.show_thank_you()).await);
    steps
}

async fn run(display: &DisplayHandle, action: &Action) -> Result<serde_json::Value> {
    let result = match action {
        Action::Status => serde_json::to_value(display.status().await?)?,
        Action::Demo => {
            let steps = run_demo(display).await;
            let status = display.status().await?;
            json!({ "steps": steps, "status": status })
        }
        other => {
            let Some(operation) = submit(display, other) else {
                bail!("Action {other:?} does not submit an operation");
            };
            let outcome: Outcome = operation.await.context("Display action failed")?;
            serde_json::to_value(outcome)?
        }
    };
    Ok(result)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    }
    .with_overrides(args.port.clone(), args.baud);
    config.validate()?;

    let port = match (&config.port, args.mock) {
        (_, true) => MOCK_PORT.to_string(),
        (Some(port), false) => port.clone(),
        (None, false) => bail!("No display port given; use --port, POSKIT_PORT or --mock"),
    };

    let (driver, mock) = build_driver(args.mock);
    let display = DisplayArbiter::new(driver, config.arbiter.clone()).start()?;

    display
        .connect(port.as_str(), config.display)
        .await
        .with_context(|| format!("Failed to connect display on {port}"))?;
    info!(port = %port, "Display ready");

    let result = run(&display, &args.command).await;

    if let Some(mock) = mock
        && let Some(screen) = mock.last_screen()
    {
        debug!(rows = ?screen.rows, "Mock display screen");
    }

    display.shutdown().await?;
    print_json(&result?)
}
