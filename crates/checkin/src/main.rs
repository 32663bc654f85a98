//! `checkin` - CLI for the QR check-in kiosk
//!
//! Runs the kiosk against a keyboard-wedge scanner on stdin, or checks in a
//! single identifier from the command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::warn;

use checkin::cli::{CheckCommand, Cli, Command, ConfigCommand, RunCommand};
use checkin::{
    init_logging, Config, DecodedValue, DisplayState, HttpCheckinApi, Kiosk, LineScanner,
    QueryCoordinator,
};

/// How long to wait for blocking stdin reads when shutting down.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match cli.command {
        Command::Run(run_cmd) => handle_run(cli.config, run_cmd),
        Command::Check(check_cmd) => handle_check(cli.config, &check_cmd),
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
    }
}

/// Load configuration, applying a command-line endpoint override.
fn load_config(path: Option<PathBuf>, api_url: Option<String>) -> checkin::Result<Config> {
    let mut config = Config::load_from(path)?;
    if let Some(url) = api_url {
        config.api.url = Some(url);
        config.validate()?;
    }
    Ok(config)
}

fn handle_run(path: Option<PathBuf>, cmd: RunCommand) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path, cmd.api_url)?;
    let api = Arc::new(HttpCheckinApi::from_config(&config)?);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        let kiosk = Kiosk::mount(&config, api, || Box::new(LineScanner::stdin()))?;

        println!("{}", config.display.title);
        println!("{}", "=".repeat(config.display.title.chars().count()));

        let renderer = tokio::spawn(render(kiosk.subscribe()));

        let handle = kiosk.handle();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => handle.dispose(),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });

        kiosk.run().await;
        renderer.await.map_err(|e| checkin::Error::internal(e.to_string()))
    });

    // A pending stdin read would otherwise hold the runtime open.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(result?)
}

/// Print the current display, then every transition until the kiosk stops
/// publishing.
async fn render(mut display: watch::Receiver<DisplayState>) {
    loop {
        let lines = display.borrow_and_update().render_lines();
        for line in lines {
            println!("{line}");
        }
        if display.changed().await.is_err() {
            break;
        }
    }
}

fn handle_check(path: Option<PathBuf>, cmd: &CheckCommand) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path, cmd.api_url.clone())?;
    let api = Arc::new(HttpCheckinApi::from_config(&config)?);
    let coordinator = QueryCoordinator::new(api, config.request_timeout());

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(coordinator.submit(&DecodedValue::new(cmd.id.trim())));

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("[{}] {}", outcome.kind, outcome.message);
    }
    Ok(())
}

fn handle_config(
    path: Option<PathBuf>,
    cmd: ConfigCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[API]");
                println!(
                    "  URL:                {}",
                    config.api.url.as_deref().unwrap_or("(not set)")
                );
                println!("  Timeout (ms):       {}", config.api.timeout_ms);
                println!();
                println!("[Scanner]");
                println!("  Element:            {}", config.scanner.element_id);
                println!("  FPS:                {}", config.scanner.fps);
                println!(
                    "  Detection region:   {}x{}",
                    config.scanner.qrbox_width, config.scanner.qrbox_height
                );
                println!();
                println!("[Display]");
                println!("  Title:              {}", config.display.title);
                println!("  Remote clear (ms):  {}", config.display.remote_clear_ms);
                println!("  Error clear (ms):   {}", config.display.error_clear_ms);
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                path.unwrap_or_else(Config::default_config_path).display()
            );
        }
        ConfigCommand::Validate { file } => {
            let target = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", target.display());
            match Config::load_from(Some(target)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
