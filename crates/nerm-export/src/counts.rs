//! Totals read from `_metadata` without downloading the records.

use nerm_core::ResourceKind;
use tracing::debug;

use crate::driver::{ExportJob, ProgressReporter, collect_all};
use crate::error::Result;
use crate::fetcher::{PageFetcher, Position};
use crate::transport::{QueryParams, Transport};

pub const PROFILE_STATUSES: [&str; 4] = ["Active", "Inactive", "On Leave", "Terminated"];

pub const BACKENDS: [&str; 2] = ["suite", "profile_service"];

/// Remote total for `kind` under `filters`, from a one-record probe.
///
/// A response without a total counts as zero.
pub async fn metadata_total(
    transport: &dyn Transport,
    kind: ResourceKind,
    filters: QueryParams,
) -> Result<u64> {
    let fetcher = PageFetcher::new(transport, kind, filters);
    let page = fetcher.fetch(1, &Position::Offset(0), true).await?;
    let total = page.reported_total().unwrap_or(0);
    debug!(kind = %fetcher.kind(), total, "metadata total");
    Ok(total)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileTypeCount {
    pub name: String,
    /// One entry per [`PROFILE_STATUSES`] value, same order.
    pub by_status: Vec<u64>,
}

impl ProfileTypeCount {
    pub fn total(&self) -> u64 {
        self.by_status.iter().sum()
    }
}

/// Profile totals per profile type and status.
pub async fn profile_type_counts(
    transport: &dyn Transport,
    progress: &dyn ProgressReporter,
) -> Result<Vec<ProfileTypeCount>> {
    let types = collect_all(transport, &ExportJob::new(ResourceKind::ProfileTypes, 100)).await?;
    progress.start(Some(types.len() as u64));

    let mut counts = Vec::with_capacity(types.len());
    for (done, profile_type) in types.iter().enumerate() {
        let type_id = profile_type.id().unwrap_or_default();
        let mut by_status = Vec::with_capacity(PROFILE_STATUSES.len());
        for status in PROFILE_STATUSES {
            let filters = QueryParams::new()
                .with("profile_type_id", type_id)
                .with("status", status)
                .with("exclude_attributes", true);
            by_status.push(metadata_total(transport, ResourceKind::Profiles, filters).await?);
        }
        counts.push(ProfileTypeCount {
            name: profile_type.text("name").unwrap_or_default().to_string(),
            by_status,
        });
        progress.advance(done as u64 + 1);
    }
    progress.finish(counts.len() as u64);
    Ok(counts)
}

/// Profile totals as seen by each storage backend, in [`BACKENDS`] order.
pub async fn backend_totals(transport: &dyn Transport) -> Result<Vec<(&'static str, u64)>> {
    let mut totals = Vec::with_capacity(BACKENDS.len());
    for backend in BACKENDS {
        let filters = QueryParams::new()
            .with("exclude_attributes", true)
            .with("force_backend", backend);
        totals.push((
            backend,
            metadata_total(transport, ResourceKind::Profiles, filters).await?,
        ));
    }
    Ok(totals)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofingTotals {
    pub pass: u64,
    pub fail: u64,
}

pub async fn proofing_result_totals(transport: &dyn Transport) -> Result<ProofingTotals> {
    let total = |result: &'static str| {
        metadata_total(
            transport,
            ResourceKind::IdentityProofing,
            QueryParams::new().with("result", result),
        )
    };
    Ok(ProofingTotals {
        pass: total("pass").await?,
        fail: total("fail").await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NoProgress;
    use crate::testing::FakeTransport;
    use serde_json::json;
    use tokio_test::block_on;

    #[test]
    fn test_metadata_total_defaults_to_zero() {
        let transport = FakeTransport::from_bodies(vec![json!({"profiles": []}).to_string()]);
        let total = block_on(metadata_total(
            &transport,
            ResourceKind::Profiles,
            QueryParams::new(),
        ))
        .unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_profile_type_counts() {
        let mut bodies = vec![
            json!({"profile_types": [{"id": "t1"}], "_metadata": {"total": 1}}).to_string(),
            json!({"profile_types": [{"id": "t1", "name": "Contractor"}]}).to_string(),
        ];
        for total in [5, 2, 0, 1] {
            bodies.push(json!({"profiles": [], "_metadata": {"total": total}}).to_string());
        }
        let transport = FakeTransport::from_bodies(bodies);

        let counts = block_on(profile_type_counts(&transport, &NoProgress)).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].name, "Contractor");
        assert_eq!(counts[0].by_status, [5, 2, 0, 1]);
        assert_eq!(counts[0].total(), 8);

        let log = transport.log();
        let status_call = &log[3];
        assert_eq!(status_call.path, "profiles");
        assert_eq!(status_call.query.get("profile_type_id"), Some("t1"));
        assert_eq!(status_call.query.get("status"), Some("Inactive"));
        assert_eq!(status_call.query.get("exclude_attributes"), Some("true"));
        assert_eq!(status_call.query.get("limit"), Some("1"));
    }

    #[test]
    fn test_backend_and_proofing_totals() {
        let bodies = [10, 12, 7, 3]
            .iter()
            .map(|t| json!({"_metadata": {"total": t}}).to_string())
            .collect();
        let transport = FakeTransport::from_bodies(bodies);

        let totals = block_on(backend_totals(&transport)).unwrap();
        assert_eq!(totals, [("suite", 10), ("profile_service", 12)]);

        let idp = block_on(proofing_result_totals(&transport)).unwrap();
        assert_eq!(idp, ProofingTotals { pass: 7, fail: 3 });
        assert_eq!(transport.log()[3].query.get("result"), Some("fail"));
    }
}
