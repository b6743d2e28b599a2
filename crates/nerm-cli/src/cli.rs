use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nerm")]
#[command(about = "nerm: export and inspect non-employee data from NERM tenants")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Registered environment to use for this invocation only
    #[arg(short, long, global = true, env = "NERM_ENV")]
    pub env: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, env = "NERM_LOG", default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage registered environments
    #[command(visible_alias = "env")]
    Environments(EnvironmentArgs),
    /// Show or change global settings
    Config(ConfigArgs),
    /// Check tenant health
    #[command(visible_alias = "hc")]
    HealthCheck(HealthArgs),
    /// Export and count profiles
    #[command(visible_alias = "p")]
    Profiles(ProfilesArgs),
    /// Export workflow sessions
    #[command(visible_alias = "s")]
    Sessions(SessionsArgs),
    /// Export and count identity proofing results
    #[command(visible_alias = "i")]
    Idproofing(IdproofingArgs),
    /// Manage and run advanced searches
    #[command(visible_alias = "a")]
    Advsearch(AdvsearchArgs),
}

#[derive(clap::Args)]
pub struct EnvironmentArgs {
    #[command(subcommand)]
    pub command: EnvironmentCommands,
}

#[derive(Subcommand)]
pub enum EnvironmentCommands {
    /// Register a new environment
    #[command(visible_alias = "c")]
    Create(EnvCreateArgs),
    /// List registered environments
    #[command(visible_alias = "ls")]
    List,
    /// Show one environment (the current one by default)
    Show(EnvNameArgs),
    /// Change tenant, base URL or token of an environment
    Update(EnvUpdateArgs),
    /// Remove an environment
    Delete(EnvDeleteArgs),
    /// Make an environment the current one
    Use(EnvUseArgs),
}

#[derive(clap::Args)]
pub struct EnvCreateArgs {
    /// Environment name (stored lower-cased)
    pub name: String,
    /// Tenant subdomain (defaults to the environment name)
    #[arg(long)]
    pub tenant: Option<String>,
    /// Base URL override for this environment
    #[arg(long)]
    pub base_url: Option<String>,
    /// API token (prompted for when omitted)
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(clap::Args)]
pub struct EnvNameArgs {
    /// Environment name
    pub name: Option<String>,
}

#[derive(clap::Args)]
pub struct EnvUpdateArgs {
    /// Environment name
    pub name: Option<String>,
    #[arg(long)]
    pub tenant: Option<String>,
    #[arg(long)]
    pub base_url: Option<String>,
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(clap::Args)]
pub struct EnvDeleteArgs {
    /// Environment name
    pub name: Option<String>,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(clap::Args)]
pub struct EnvUseArgs {
    /// Environment name
    pub name: String,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (output_folder, limit, base_url)
    pub key: String,
    /// Value
    pub value: String,
}

#[derive(clap::Args)]
pub struct HealthArgs {
    /// Environments to check (the current one when empty)
    pub names: Vec<String>,
}

/// Page size and record ceiling shared by every export command.
#[derive(clap::Args)]
pub struct PageArgs {
    /// Records per request (defaults to the configured limit)
    #[arg(short, long)]
    pub limit: Option<u32>,
    /// Stop after this many records (default: all)
    #[arg(short, long)]
    pub get_limit: Option<u64>,
}

#[derive(clap::Args)]
pub struct ConvertArgs {
    /// JSON export to convert into CSV
    #[arg(short, long)]
    pub file: PathBuf,
}

#[derive(clap::Args)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    pub command: ProfilesCommands,
}

#[derive(Subcommand)]
pub enum ProfilesCommands {
    /// Export profiles to JSON and CSV
    #[command(visible_alias = "g")]
    Get(ProfilesGetArgs),
    /// Count profiles per profile type and status
    #[command(visible_alias = "c")]
    Count,
    /// Compare totals between the two storage backends
    #[command(visible_alias = "d")]
    Diff(DiffArgs),
    /// Convert a profile JSON export into CSV
    Convert(ConvertArgs),
}

#[derive(clap::Args)]
pub struct ProfilesGetArgs {
    /// ID of a specific profile
    #[arg(short, long)]
    pub id: Option<String>,
    /// Exclude attributes from the response
    #[arg(short = 'x', long)]
    pub exclude: Option<String>,
    /// Profile type ID
    #[arg(short = 't', long)]
    pub profile_type: Option<String>,
    /// Profile status
    #[arg(short, long)]
    pub status: Option<String>,
    /// Profile name
    #[arg(short, long)]
    pub name: Option<String>,
    /// Force the suite or profile_service backend
    #[arg(short = 'b', long)]
    pub force_backend: Option<String>,
    #[command(flatten)]
    pub page: PageArgs,
    /// Page with after_id cursors, optionally starting after the given id
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    pub after_id: Option<String>,
    /// Keep archived profiles instead of live ones
    #[arg(long)]
    pub keep_archived: bool,
}

#[derive(clap::Args)]
pub struct DiffArgs {
    /// Compare every registered environment
    #[arg(long)]
    pub all_envs: bool,
}

#[derive(clap::Args)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionsCommands,
}

#[derive(Subcommand)]
pub enum SessionsCommands {
    /// Export workflow sessions to JSON and CSV
    #[command(visible_alias = "g")]
    Get(SessionsGetArgs),
    /// Convert a session JSON export into CSV
    Convert(ConvertArgs),
}

#[derive(clap::Args)]
pub struct SessionsGetArgs {
    /// ID of a specific workflow session
    #[arg(short, long)]
    pub id: Option<String>,
    /// UID of a specific workflow session
    #[arg(short, long)]
    pub uid: Option<String>,
    /// Sessions run for this profile
    #[arg(short, long)]
    pub profile_id: Option<String>,
    /// Session status
    #[arg(short, long)]
    pub status: Option<String>,
    /// Sessions of this workflow
    #[arg(short, long)]
    pub workflow_id: Option<String>,
    /// Sessions started by this user
    #[arg(short, long)]
    pub requester_id: Option<String>,
    #[command(flatten)]
    pub page: PageArgs,
    /// Only sessions created during the last N days
    #[arg(short, long)]
    pub days: Option<u32>,
}

#[derive(clap::Args)]
pub struct IdproofingArgs {
    #[command(subcommand)]
    pub command: IdproofingCommands,
}

#[derive(Subcommand)]
pub enum IdproofingCommands {
    /// Export identity proofing results to JSON and CSV
    #[command(visible_alias = "g")]
    Get(IdproofingGetArgs),
    /// Count passed and failed results
    #[command(visible_alias = "c")]
    Count,
    /// Convert an identity proofing JSON export into CSV
    Convert(ConvertArgs),
}

#[derive(clap::Args)]
pub struct IdproofingGetArgs {
    /// Results for this profile
    #[arg(short, long)]
    pub profile_id: Option<String>,
    /// Results for this workflow session
    #[arg(short, long)]
    pub workflow_session_id: Option<String>,
    /// pass or fail
    #[arg(short, long)]
    pub result: Option<String>,
    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(clap::Args)]
pub struct AdvsearchArgs {
    #[command(subcommand)]
    pub command: AdvsearchCommands,
}

#[derive(Subcommand)]
pub enum AdvsearchCommands {
    /// List stored advanced searches
    #[command(visible_alias = "l")]
    List,
    /// Print the configuration of an advanced search
    Show(SearchIdArgs),
    /// Save the configuration of an advanced search to a file
    Download(SearchIdArgs),
    /// Export the profiles an advanced search matches
    #[command(visible_alias = "r")]
    Run(SearchRunArgs),
    /// Create an advanced search from a file or from rules
    #[command(visible_alias = "c")]
    Create(SearchCreateArgs),
}

#[derive(clap::Args)]
pub struct SearchIdArgs {
    /// Advanced search ID
    #[arg(short, long)]
    pub id: String,
}

#[derive(clap::Args)]
pub struct SearchRunArgs {
    /// Advanced search ID
    #[arg(short, long)]
    pub id: String,
    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(clap::Args)]
pub struct SearchCreateArgs {
    /// Downloaded configuration to upload
    #[arg(short, long, conflicts_with = "label")]
    pub file: Option<PathBuf>,
    /// Label of the new search
    #[arg(long, required_unless_present = "file")]
    pub label: Option<String>,
    /// Profile status rule (repeatable)
    #[arg(long = "status")]
    pub statuses: Vec<String>,
    /// Profile type rule (repeatable)
    #[arg(long = "profile-type")]
    pub profile_types: Vec<String>,
    /// Risk level rule (repeatable)
    #[arg(long = "risk-level")]
    pub risk_levels: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_aliases_and_after_id() {
        let cli = Cli::try_parse_from(["nerm", "p", "get", "--after-id", "--keep-archived"]).unwrap();
        match cli.command {
            Commands::Profiles(ProfilesArgs {
                command: ProfilesCommands::Get(args),
            }) => {
                assert_eq!(args.after_id.as_deref(), Some(""));
                assert!(args.keep_archived);
            }
            _ => panic!("expected profiles get"),
        }

        let cli = Cli::try_parse_from(["nerm", "a", "run", "--id", "s1", "-g", "10"]).unwrap();
        match cli.command {
            Commands::Advsearch(AdvsearchArgs {
                command: AdvsearchCommands::Run(args),
            }) => {
                assert_eq!(args.id, "s1");
                assert_eq!(args.page.get_limit, Some(10));
            }
            _ => panic!("expected advsearch run"),
        }
    }

    #[test]
    fn test_keep_archived_without_after_id() {
        let cli = Cli::try_parse_from(["nerm", "profiles", "get", "--keep-archived"]).unwrap();
        match cli.command {
            Commands::Profiles(ProfilesArgs {
                command: ProfilesCommands::Get(args),
            }) => {
                assert!(args.after_id.is_none());
                assert!(args.keep_archived);
            }
            _ => panic!("expected profiles get"),
        }
    }

    #[test]
    fn test_create_needs_label_or_file() {
        assert!(Cli::try_parse_from(["nerm", "advsearch", "create"]).is_err());
        assert!(Cli::try_parse_from(["nerm", "advsearch", "create", "--label", "x", "--status", "Active"]).is_ok());
    }
}
