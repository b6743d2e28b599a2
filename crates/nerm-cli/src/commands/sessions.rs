use anyhow::Result;
use nerm_core::ResourceKind;
use nerm_export::{ExportRequest, QueryParams};

use crate::cli::SessionsGetArgs;
use crate::config::ActiveEnvironment;

use super::export;

pub async fn get(env: &ActiveEnvironment<'_>, args: &SessionsGetArgs) -> Result<()> {
    export(env, get_request(args), "workflow sessions").await
}

fn get_request(args: &SessionsGetArgs) -> ExportRequest {
    let mut filters = QueryParams::new();
    filters.set_opt("id", args.id.as_deref());
    filters.set_opt("uid", args.uid.as_deref());
    filters.set_opt("profile_id", args.profile_id.as_deref());
    filters.set_opt("status", args.status.as_deref());
    filters.set_opt("workflow_id", args.workflow_id.as_deref());
    filters.set_opt("requester_id", args.requester_id.as_deref());
    // newest first, so a day window covers the leading pages
    if args.days.is_some() {
        filters.set("order", "created_at DESC");
    }

    let mut request = ExportRequest::new(ResourceKind::WorkflowSessions);
    request.filters = filters;
    request.recent_days = args.days;
    args.page.apply(&mut request);
    request
}
