mod cli;
mod commands;
mod config;
mod logging;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use nerm_core::ResourceKind;

use cli::{
    AdvsearchCommands, Cli, Commands, ConfigCommands, EnvironmentCommands, IdproofingCommands,
    ProfilesCommands, SessionsCommands,
};
use config::NermConfig;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing_with_level(&cli.log_level);

    let mut cfg = NermConfig::load()?;
    let env_override = cli.env.as_deref();

    match &cli.command {
        Commands::Environments(args) => match &args.command {
            EnvironmentCommands::Create(create) => commands::environment::create(&mut cfg, create)?,
            EnvironmentCommands::List => commands::environment::list(&cfg)?,
            EnvironmentCommands::Show(show) => {
                commands::environment::show(&cfg, show.name.as_deref().or(env_override))?
            }
            EnvironmentCommands::Update(update) => commands::environment::update(&mut cfg, update)?,
            EnvironmentCommands::Delete(delete) => commands::environment::delete(&mut cfg, delete)?,
            EnvironmentCommands::Use(target) => {
                commands::environment::use_environment(&mut cfg, &target.name)?
            }
        },
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => {
                println!(
                    "{}: {}",
                    "Current environment".cyan(),
                    cfg.current_environment.as_deref().unwrap_or("(not set)")
                );
                println!("{}: {}", "Base URL".cyan(), cfg.base_url);
                println!(
                    "{}: {}",
                    "Output folder".cyan(),
                    if cfg.output_folder.is_empty() {
                        "(current directory)"
                    } else {
                        cfg.output_folder.as_str()
                    }
                );
                println!("{}: {}", "Limit".cyan(), cfg.limit);
                println!("{}: {}", "Config file".cyan(), config::config_path()?.display());
            }
            ConfigCommands::Set(set_args) => {
                cfg.set_value(&set_args.key, &set_args.value)?;
                cfg.save()?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
            }
        },
        Commands::HealthCheck(args) => {
            commands::health::check(&cfg, env_override, &args.names).await?;
        }
        Commands::Profiles(args) => match &args.command {
            ProfilesCommands::Get(get) => {
                commands::profiles::get(&cfg.active(env_override)?, get).await?
            }
            ProfilesCommands::Count => commands::profiles::count(&cfg.active(env_override)?).await?,
            ProfilesCommands::Diff(diff) => {
                commands::profiles::diff(&cfg, env_override, diff).await?
            }
            ProfilesCommands::Convert(convert) => {
                commands::convert(ResourceKind::Profiles, &convert.file)?
            }
        },
        Commands::Sessions(args) => match &args.command {
            SessionsCommands::Get(get) => {
                commands::sessions::get(&cfg.active(env_override)?, get).await?
            }
            SessionsCommands::Convert(convert) => {
                commands::convert(ResourceKind::WorkflowSessions, &convert.file)?
            }
        },
        Commands::Idproofing(args) => match &args.command {
            IdproofingCommands::Get(get) => {
                commands::idproofing::get(&cfg.active(env_override)?, get).await?
            }
            IdproofingCommands::Count => {
                commands::idproofing::count(&cfg.active(env_override)?).await?
            }
            IdproofingCommands::Convert(convert) => {
                commands::convert(ResourceKind::IdentityProofing, &convert.file)?
            }
        },
        Commands::Advsearch(args) => {
            let env = cfg.active(env_override)?;
            match &args.command {
                AdvsearchCommands::List => commands::advanced_search::list(&env).await?,
                AdvsearchCommands::Show(show) => {
                    commands::advanced_search::show(&env, &show.id).await?
                }
                AdvsearchCommands::Download(download) => {
                    commands::advanced_search::download(&env, &download.id).await?
                }
                AdvsearchCommands::Run(run) => commands::advanced_search::run(&env, run).await?,
                AdvsearchCommands::Create(create) => {
                    commands::advanced_search::create(&env, create).await?
                }
            }
        }
    }

    Ok(())
}
