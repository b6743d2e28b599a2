use anyhow::{Context, Result};
use nerm_core::ResourceKind;
use nerm_export::counts;
use nerm_export::{ExportRequest, QueryParams};

use crate::cli::IdproofingGetArgs;
use crate::config::ActiveEnvironment;
use crate::output::print_table;

use super::{export, make_client};

pub async fn get(env: &ActiveEnvironment<'_>, args: &IdproofingGetArgs) -> Result<()> {
    let mut filters = QueryParams::new();
    filters.set_opt("profile_id", args.profile_id.as_deref());
    filters.set_opt("workflow_session_id", args.workflow_session_id.as_deref());
    filters.set_opt("result", args.result.as_deref());

    let mut request = ExportRequest::new(ResourceKind::IdentityProofing);
    request.filters = filters;
    args.page.apply(&mut request);
    export(env, request, "identity proofing results").await
}

pub async fn count(env: &ActiveEnvironment<'_>) -> Result<()> {
    let client = make_client(env)?;
    let totals = counts::proofing_result_totals(&client)
        .await
        .with_context(|| format!("Counting identity proofing results on {} failed", env.host()))?;
    print_table(
        &["Pass", "Fail"],
        [vec![totals.pass.to_string(), totals.fail.to_string()]],
    );
    Ok(())
}
