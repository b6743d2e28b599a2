pub mod advanced_search;
pub mod environment;
pub mod health;
pub mod idproofing;
pub mod profiles;
pub mod sessions;

use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use nerm_core::ResourceKind;
use nerm_export::{ApiClient, CsvProjector, ExportOutcome, ExportRequest, csv_path_for, run_export};

use crate::cli::PageArgs;
use crate::config::ActiveEnvironment;
use crate::output::print_success;
use crate::progress::BarProgress;

pub fn make_client(env: &ActiveEnvironment<'_>) -> Result<ApiClient> {
    ApiClient::new(env.tenant(), env.base_url(), env.token())
        .with_context(|| format!("Cannot build a client for {}", env.host()))
}

impl PageArgs {
    fn apply(&self, request: &mut ExportRequest) {
        request.page_limit = self.limit;
        request.ceiling = self.get_limit;
    }
}

/// Run one export against `env` and print where the files went.
pub async fn export(env: &ActiveEnvironment<'_>, request: ExportRequest, unit: &'static str) -> Result<()> {
    let client = make_client(env)?;
    let progress = BarProgress::new(unit);
    let outcome = run_export(&client, env, request, &progress)
        .await
        .with_context(|| format!("Exporting {unit} from {} failed", env.host()))?;
    report(&outcome, unit);
    Ok(())
}

fn report(outcome: &ExportOutcome, unit: &str) {
    print_success(&format!(
        "Exported {} {unit} in {} pages",
        outcome.summary.written, outcome.summary.pages
    ));
    println!("  {}: {}", "JSON".cyan(), outcome.target.json_path().display());
    println!("  {}: {}", "CSV".cyan(), outcome.target.csv_path().display());
}

/// Rebuild the CSV of an earlier JSON export.
pub fn convert(kind: ResourceKind, file: &Path) -> Result<()> {
    let csv_path = csv_path_for(file);
    if csv_path == file {
        bail!("{} has no 'json' in its name, cannot derive a CSV path", file.display());
    }
    let summary = CsvProjector::new(kind.schema())
        .project(file, &csv_path)
        .with_context(|| format!("Cannot convert {}", file.display()))?;
    print_success(&format!(
        "Wrote {} rows and {} columns to {}",
        summary.rows,
        summary.columns,
        csv_path.display()
    ));
    Ok(())
}
