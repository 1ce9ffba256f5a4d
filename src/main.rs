//! DandaIO - Hardware I/O daemon for the smart cane handle
//!
//! Fuses two ranging sensors into a proximity feedback value and renders
//! it as staged haptic output on DRV2605-driven exciters. A range button,
//! a mute button and a 3-position switch adjust the behavior at runtime.

use danda_io::app::CaneApp;
use danda_io::config::CaneConfig;
use danda_io::error::Result;
use std::env;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `danda-io <path>` (positional)
/// - `danda-io --config <path>` (flag-based)
/// - `danda-io -c <path>` (short flag)
///
/// Defaults to `/etc/danda-io.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    // Default path
    "/etc/danda-io.toml".to_string()
}

fn main() -> Result<()> {
    // Load configuration before the logger so the configured level can
    // serve as the default filter (RUST_LOG still overrides)
    let config_path = parse_config_path();
    let config = CaneConfig::from_file(&config_path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.logging.level),
    )
    .init();

    log::info!("DandaIO v0.3.0 starting...");
    log::info!("Using config: {}", config_path);

    let mut app = CaneApp::new(config)?;
    app.run()?;

    log::info!("DandaIO stopped");
    Ok(())
}
