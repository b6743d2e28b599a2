use anyhow::Result;
use colored::Colorize;
use tracing::warn;

use crate::config::NermConfig;

use super::make_client;

/// Check each named environment, or the current one when `names` is empty.
///
/// Unreachable tenants are reported, not raised, so every name gets checked.
pub async fn check(cfg: &NermConfig, override_name: Option<&str>, names: &[String]) -> Result<()> {
    let targets = if names.is_empty() {
        vec![cfg.resolve_name(override_name)?]
    } else {
        names.iter().map(|n| n.to_lowercase()).collect()
    };

    for name in &targets {
        let env = cfg.named(name)?;
        let host = env.host();
        let client = make_client(&env)?;
        match client.health().await {
            Ok((200, body)) => {
                println!("{} {} is {}", "✓".green(), host.cyan(), "healthy".green());
                if !body.is_empty() {
                    println!("  {body}");
                }
            }
            Ok((code, body)) => {
                println!(
                    "{} {} returned {} {}",
                    "✗".red(),
                    host.cyan(),
                    code.to_string().red(),
                    body
                );
            }
            Err(e) => {
                warn!(environment = %name, error = %e, "health check failed");
                println!("{} {} is {}: {e}", "✗".red(), host.cyan(), "unreachable".red());
            }
        }
    }
    Ok(())
}
