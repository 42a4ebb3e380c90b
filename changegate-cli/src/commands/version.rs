//! Version command - show version information.

use anyhow::Result;

/// Version information.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the version command.
pub fn run() -> Result<()> {
    println!("changegate - Change-approval gate for CI pipelines");
    println!();
    println!("Version:     {}", VERSION);
    println!(
        "Platform:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!();
    println!("Components:");
    println!("  changegate-core      Tokens, decisions, correlation registry");
    println!("  changegate-executor  Issuer, orchestrator, callback API, timeouts");
    println!("  changegate-client    HTTP transport and API client");
    println!("  changegate-cli       Command-line interface");

    Ok(())
}
