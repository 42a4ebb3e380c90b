//! Validate command - check a gate configuration file.

use anyhow::Result;
use changegate_core::transport::Credentials;
use changegate_executor::config::{GateConfig, StoreKind};
use std::path::Path;

/// Run the validate command.
pub fn run(file: &str) -> Result<()> {
    let path = Path::new(file);

    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", file);
    }

    tracing::info!(file = %file, "Validating configuration");

    println!("Validation Results for: {}", file);
    println!("========================{}", "=".repeat(file.len()));
    println!();

    let config = match GateConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            println!("✗ YAML PARSE ERROR:");
            println!("  {}", e);
            anyhow::bail!("YAML parsing failed");
        }
    };

    println!("✓ YAML syntax is valid");
    println!();

    let mut has_errors = false;

    match config.validate() {
        Ok(()) => println!("✓ Configuration values are valid"),
        Err(e) => {
            has_errors = true;
            println!("✗ Configuration check failed:");
            println!("  - {}", e);
        }
    }
    println!();

    println!("Gate Summary:");
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    println!("  Callback base: {}", config.public_base_url);
    println!("  Tool ID: {}", config.tool_id);
    match config.wait.default_timeout() {
        Some(timeout) => println!("  Default timeout: {}s", timeout.as_secs()),
        None => println!("  Default timeout: none"),
    }
    println!("  Store: {:?}", config.store.kind);
    println!("  Job routes: {}", config.endpoints.jobs.len());

    let warnings = collect_warnings(&config);
    for warning in &warnings {
        println!();
        println!("⚠ WARNING: {}", warning);
    }

    println!();
    println!("========================{}", "=".repeat(file.len()));

    if has_errors {
        println!("✗ Validation FAILED");
        anyhow::bail!("Configuration validation failed");
    } else if !warnings.is_empty() {
        println!("⚠ Validation passed with warnings");
    } else {
        println!("✓ Validation PASSED");
    }

    Ok(())
}

/// Settings that are valid but probably not what the operator wants.
fn collect_warnings(config: &GateConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.endpoints.default.is_none() && config.endpoints.jobs.is_empty() {
        warnings.push("No change-control endpoints configured; submissions will fail".to_string());
    }
    if config.store.kind == StoreKind::Memory {
        warnings.push("Memory store loses pending waits on restart".to_string());
    }
    if config.wait.default_timeout().is_none() {
        warnings.push("Waits without an explicit timeout never expire".to_string());
    }
    let endpoints = config
        .endpoints
        .default
        .iter()
        .map(|e| ("default".to_string(), e))
        .chain(config.endpoints.jobs.iter().map(|(k, e)| (k.clone(), e)));
    for (name, endpoint) in endpoints {
        if endpoint.url.starts_with("http://") && endpoint.auth != Credentials::None {
            warnings.push(format!(
                "Endpoint '{}' sends credentials over plain http",
                name
            ));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_for_defaults() {
        let warnings = collect_warnings(&GateConfig::default());
        assert!(warnings.iter().any(|w| w.contains("No change-control endpoints")));
        assert!(warnings.iter().any(|w| w.contains("Memory store")));
    }

    #[test]
    fn test_plain_http_credentials_warned() {
        let config = GateConfig::from_yaml(
            r#"
store:
  kind: file
  path: /tmp/registry.json
endpoints:
  default:
    url: http://cm.internal/change
    auth: { type: token, token: abc }
"#,
        )
        .unwrap();

        let warnings = collect_warnings(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("plain http"));
    }

    #[test]
    fn test_run_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.yaml");
        std::fs::write(&path, "public_base_url: ftp://nope\n").unwrap();

        assert!(run(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_run_missing_file() {
        assert!(run("/nonexistent/gate.yaml").is_err());
    }
}
