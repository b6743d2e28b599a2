use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::cli::{EnvCreateArgs, EnvDeleteArgs, EnvUpdateArgs};
use crate::config::{Environment, NermConfig};
use crate::output::{mask_token, print_success, print_table};

pub fn create(cfg: &mut NermConfig, args: &EnvCreateArgs) -> Result<()> {
    let name = args.name.to_lowercase();
    if cfg.environment(&name).is_some() {
        bail!("Environment '{name}' already exists, use `nerm env update {name}` to change it");
    }

    let tenant = match &args.tenant {
        Some(tenant) => tenant.clone(),
        None => prompt_with_default("Tenant", &name)?,
    };
    let token = match &args.token {
        Some(token) => token.clone(),
        None => prompt("API token")?,
    };
    if token.is_empty() {
        bail!("An API token is required");
    }

    let key = cfg.add_environment(
        &name,
        Environment {
            tenant,
            token,
            base_url: args.base_url.clone().filter(|u| !u.is_empty()),
        },
    )?;
    cfg.save()?;

    let host = cfg.named(&key)?.host();
    print_success(&format!("Created environment {} ({})", key.cyan(), host));
    if cfg.current_environment.as_deref() == Some(key.as_str()) {
        println!("  {} is now the current environment", key.cyan());
    }
    Ok(())
}

pub fn list(cfg: &NermConfig) -> Result<()> {
    if cfg.environments.is_empty() {
        println!("No environments registered. Run `nerm env create <name>`.");
        return Ok(());
    }
    let current = cfg.current_environment.as_deref();
    let rows = cfg.environments.keys().map(|name| {
        let marker = if Some(name.as_str()) == current { "*" } else { "" };
        let host = cfg.named(name).map(|env| env.host()).unwrap_or_default();
        vec![marker.to_string(), name.clone(), host]
    });
    print_table(&["", "Name", "Host"], rows);
    Ok(())
}

pub fn show(cfg: &NermConfig, name: Option<&str>) -> Result<()> {
    let env = cfg.active(name)?;
    println!("{}: {}", "Environment".cyan(), env.name());
    println!("{}: {}", "Tenant".cyan(), env.tenant());
    println!("{}: {}", "Base URL".cyan(), env.base_url());
    println!("{}: {}", "Token".cyan(), mask_token(env.token()));
    println!(
        "{}: {}",
        "Current".cyan(),
        cfg.current_environment.as_deref() == Some(env.name())
    );
    Ok(())
}

pub fn update(cfg: &mut NermConfig, args: &EnvUpdateArgs) -> Result<()> {
    let name = cfg.resolve_name(args.name.as_deref())?;
    let interactive = args.tenant.is_none() && args.base_url.is_none() && args.token.is_none();

    let env = cfg.environment_mut(&name)?;
    if interactive {
        env.tenant = prompt_with_default("Tenant", &env.tenant)?;
        let token = prompt("API token (empty keeps the current one)")?;
        if !token.is_empty() {
            env.token = token;
        }
    } else {
        if let Some(tenant) = &args.tenant {
            env.tenant = tenant.clone();
        }
        if let Some(base_url) = &args.base_url {
            env.base_url = Some(base_url.clone()).filter(|u| !u.is_empty());
        }
        if let Some(token) = &args.token {
            env.token = token.clone();
        }
    }
    cfg.save()?;
    print_success(&format!("Updated environment {}", name.cyan()));
    Ok(())
}

pub fn delete(cfg: &mut NermConfig, args: &EnvDeleteArgs) -> Result<()> {
    let name = cfg.resolve_name(args.name.as_deref())?;
    if cfg.environment(&name).is_none() {
        bail!("Unknown environment '{name}'");
    }
    if !args.yes && !confirm(&format!("Delete environment '{name}'?"))? {
        println!("Nothing deleted.");
        return Ok(());
    }
    cfg.remove_environment(&name)?;
    cfg.save()?;
    print_success(&format!("Deleted environment {}", name.cyan()));
    Ok(())
}

pub fn use_environment(cfg: &mut NermConfig, name: &str) -> Result<()> {
    cfg.use_environment(name)?;
    cfg.save()?;
    print_success(&format!("Now using environment {}", name.to_lowercase().cyan()));
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{label}: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Cannot read from stdin")?;
    Ok(line.trim().to_string())
}

fn prompt_with_default(label: &str, default: &str) -> Result<String> {
    let answer = prompt(&format!("{label} [{default}]"))?;
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer
    })
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{question} [y/N]"))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}
