//! Push a rendered configuration to a fleet of devices.
//!
//! Reads a run file, renders the template, autodetects every device and
//! stages, commits and verifies the configuration on each of them.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p netstage --example push_config -- netstage/demos/run.yml
//! ```
//!
//! Set `RUST_LOG=debug` to see the SSH exchanges.

use std::env;
use std::process;

use netstage::{FleetOrchestrator, RunConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: push_config <run.yml>");
        process::exit(2);
    };

    let config = RunConfig::from_yaml_file(&path)?;
    println!(
        "Pushing {} to {} device(s)...",
        config.template.name,
        config.devices.len()
    );

    let orchestrator = FleetOrchestrator::new(config);

    // Ctrl-C stops the run before its next stage.
    let cancel = orchestrator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current stage...");
            cancel.cancel();
        }
    });

    let report = orchestrator.run().await?;

    println!("\n=== Results ===");
    for outcome in &report.outcomes {
        let platform = outcome.canonical_platform.as_deref().unwrap_or("-");
        match outcome.failure {
            Some(ref err) => println!("{:<16} {:<10} {:<16} {}", outcome.host, outcome.state, platform, err),
            None => println!("{:<16} {:<10} {}", outcome.host, outcome.state, platform),
        }
    }

    for outcome in &report.outcomes {
        if let Some(ref startup) = outcome.startup_config {
            println!("\n=== {} startup-config ===\n{}", outcome.host, startup);
        }
    }

    report.into_result()?;
    println!("\nFinished pushing configs");
    Ok(())
}
