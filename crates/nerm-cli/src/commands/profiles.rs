use anyhow::{Context, Result};
use colored::Colorize;
use nerm_core::ResourceKind;
use nerm_export::counts::{self, PROFILE_STATUSES};
use nerm_export::{ExportRequest, Pagination, QueryParams};

use crate::cli::{DiffArgs, ProfilesGetArgs};
use crate::config::{ActiveEnvironment, NermConfig};
use crate::output::print_table;
use crate::progress::BarProgress;

use super::{export, make_client};

pub async fn get(env: &ActiveEnvironment<'_>, args: &ProfilesGetArgs) -> Result<()> {
    export(env, get_request(args), "profiles").await
}

fn get_request(args: &ProfilesGetArgs) -> ExportRequest {
    let mut request = ExportRequest::new(ResourceKind::Profiles);
    request.filters = filters(args);
    args.page.apply(&mut request);
    request.keep_archived = Some(args.keep_archived);
    if let Some(after_id) = &args.after_id {
        request.pagination = Pagination::Cursor {
            start_after: Some(after_id.clone()).filter(|id| !id.is_empty()),
        };
    }
    request
}

fn filters(args: &ProfilesGetArgs) -> QueryParams {
    let mut filters = QueryParams::new();
    filters.set_opt("id", args.id.as_deref());
    filters.set_opt("exclude_attributes", args.exclude.as_deref());
    filters.set_opt("profile_type_id", args.profile_type.as_deref());
    filters.set_opt("status", args.status.as_deref());
    filters.set_opt("name", args.name.as_deref());
    filters.set_opt("force_backend", args.force_backend.as_deref());
    filters
}

pub async fn count(env: &ActiveEnvironment<'_>) -> Result<()> {
    let client = make_client(env)?;
    let progress = BarProgress::new("profile types");
    let per_type = counts::profile_type_counts(&client, &progress)
        .await
        .with_context(|| format!("Counting profiles on {} failed", env.host()))?;

    let mut headers = vec!["Profile Type"];
    headers.extend(PROFILE_STATUSES);
    headers.push("Total");

    let rows = per_type.iter().map(|c| {
        let mut row = vec![c.name.clone()];
        row.extend(c.by_status.iter().map(u64::to_string));
        row.push(c.total().to_string());
        row
    });
    print_table(&headers, rows);

    let grand_total: u64 = per_type.iter().map(|c| c.total()).sum();
    println!("{}: {}", "Total profiles".cyan(), grand_total);
    Ok(())
}

pub async fn diff(cfg: &NermConfig, override_name: Option<&str>, args: &DiffArgs) -> Result<()> {
    let names: Vec<String> = if args.all_envs {
        cfg.environments.keys().cloned().collect()
    } else {
        vec![cfg.resolve_name(override_name)?]
    };

    let mut rows = Vec::new();
    for name in &names {
        let env = cfg.named(name)?;
        let client = make_client(&env)?;
        let totals = counts::backend_totals(&client)
            .await
            .with_context(|| format!("Reading backend totals from {} failed", env.host()))?;
        for (backend, total) in totals {
            rows.push(vec![env.tenant().to_string(), backend.to_string(), total.to_string()]);
        }
    }
    print_table(&["Tenant", "Backend", "Total"], rows);
    Ok(())
}
