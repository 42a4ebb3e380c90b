//! Operator commands against a running gate.

use anyhow::{Context, Result};
use changegate_client::Client;
use changegate_core::decision::DecisionResult;
use changegate_core::types::ExecutionId;

/// List pending waits.
pub async fn list(server: &str) -> Result<()> {
    let client = Client::new(server)?;
    let waits = client
        .list_waits()
        .await
        .with_context(|| format!("Failed to list waits on {}", server))?;

    println!("Pending Waits");
    println!("=============");
    println!();

    if waits.is_empty() {
        println!("(no pending waits)");
        return Ok(());
    }

    println!("{:<40} {:<44} {:<24} EXPIRES", "TOKEN", "EXECUTION", "JOB");
    for wait in &waits {
        let job = wait.job_id.as_ref().map(|j| j.as_str()).unwrap_or("-");
        let expires = wait
            .expires_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<40} {:<44} {:<24} {}",
            wait.token.as_str(),
            wait.execution_id.to_string(),
            job,
            expires
        );
    }
    println!();
    println!("{} pending", waits.len());

    Ok(())
}

/// Post a decision to a token's callback endpoint.
pub async fn deliver(
    server: &str,
    token: &str,
    result: &str,
    comments: Option<&str>,
) -> Result<()> {
    let result: DecisionResult = result.parse()?;
    let mut body = serde_json::json!({ "result": result.as_str() });
    if let Some(comments) = comments {
        body["comments"] = serde_json::Value::String(comments.to_string());
    }

    let client = Client::new(server)?;
    let report = client
        .deliver_callback(token, &body)
        .await
        .with_context(|| format!("Failed to deliver decision for {}", token))?;

    tracing::debug!(token = %token, status = %report.status, "Delivery report");

    if report.is_accepted() {
        println!("✓ Decision '{}' accepted for {}", result, token);
    } else {
        println!(
            "⚠ Delivery {}: {}",
            report.status,
            report.reason.unwrap_or_default()
        );
    }

    Ok(())
}

/// Cancel every pending wait of an execution.
pub async fn cancel(server: &str, execution_id: &str) -> Result<()> {
    let execution_id = ExecutionId::parse(execution_id)
        .with_context(|| format!("Invalid execution ID: {}", execution_id))?;

    let client = Client::new(server)?;
    let report = client
        .cancel_execution(execution_id)
        .await
        .with_context(|| format!("Failed to cancel {}", execution_id))?;

    if report.cancelled_tokens.is_empty() {
        println!("No pending waits for {}", report.execution_id);
    } else {
        println!(
            "✓ Cancelled {} wait(s) for {}",
            report.cancelled_tokens.len(),
            report.execution_id
        );
        for token in &report.cancelled_tokens {
            println!("  - {}", token);
        }
    }

    Ok(())
}
