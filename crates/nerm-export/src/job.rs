//! Export job entry point: paginate into a JSON file, then project a CSV.

use std::path::{Path, PathBuf};

use nerm_core::{CreatedSince, ResourceKind};
use tracing::{debug, info};

use crate::driver::{ExportJob, JobSummary, Pagination, PaginationDriver, ProgressReporter};
use crate::error::{ExportError, Result};
use crate::projector::{CsvProjector, ProjectionSummary};
use crate::sink::JsonArraySink;
use crate::transport::{QueryParams, Transport};

/// Settings an export reads from the active environment.
pub trait ExportConfig {
    /// Directory for export files; empty means the working directory.
    fn output_folder(&self) -> PathBuf;

    fn environment_name(&self) -> &str;

    fn default_page_limit(&self) -> u32;
}

/// What the caller asks for. Unset values fall back to [`ExportConfig`].
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub kind: ResourceKind,
    pub filters: QueryParams,
    pub page_limit: Option<u32>,
    pub ceiling: Option<u64>,
    pub pagination: Pagination,
    pub recent_days: Option<u32>,
    pub keep_archived: Option<bool>,
}

impl ExportRequest {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            filters: QueryParams::new(),
            page_limit: None,
            ceiling: None,
            pagination: Pagination::Offset,
            recent_days: None,
            keep_archived: None,
        }
    }

    /// Resolve defaults against `config` into a runnable job.
    pub fn into_job(self, config: &dyn ExportConfig) -> Result<ExportJob> {
        let created_since = self
            .recent_days
            .map(CreatedSince::last_days)
            .transpose()?;
        if let Some(since) = &created_since {
            debug!(kind = %self.kind, boundary = %since.boundary(), "keeping records created after boundary");
        }
        Ok(ExportJob {
            kind: self.kind,
            filters: self.filters,
            page_limit: self.page_limit.unwrap_or_else(|| config.default_page_limit()),
            ceiling: self.ceiling,
            pagination: self.pagination,
            created_since,
            keep_archived: self.keep_archived,
        })
    }
}

/// Base path shared by the JSON and CSV outputs of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    base: PathBuf,
}

impl OutputTarget {
    /// `<output_folder>/<env>_<label>_Export<timestamp>`
    pub fn new(config: &dyn ExportConfig, label: &str, timestamp: i64) -> Self {
        let name = format!("{}_{label}_Export{timestamp}", config.environment_name());
        Self {
            base: config.output_folder().join(name),
        }
    }

    pub fn now(config: &dyn ExportConfig, label: &str) -> Self {
        Self::new(config, label, chrono::Utc::now().timestamp())
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn json_path(&self) -> PathBuf {
        self.with_suffix(".json")
    }

    pub fn csv_path(&self) -> PathBuf {
        self.with_suffix(".csv")
    }

    // Environment names may contain dots, so never use `with_extension`.
    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut path = self.base.clone().into_os_string();
        path.push(suffix);
        PathBuf::from(path)
    }
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub target: OutputTarget,
    pub summary: JobSummary,
    pub projection: ProjectionSummary,
}

/// Run one export into `config`'s output folder.
pub async fn run_export(
    transport: &dyn Transport,
    config: &dyn ExportConfig,
    request: ExportRequest,
    progress: &dyn ProgressReporter,
) -> Result<ExportOutcome> {
    let target = OutputTarget::now(config, request.kind.export_label());
    run_export_to(transport, config, request, progress, target).await
}

/// Same as [`run_export`] with an explicit output location.
pub async fn run_export_to(
    transport: &dyn Transport,
    config: &dyn ExportConfig,
    request: ExportRequest,
    progress: &dyn ProgressReporter,
    target: OutputTarget,
) -> Result<ExportOutcome> {
    let job = request.into_job(config)?;

    if let Some(dir) = target.base().parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir).map_err(|e| ExportError::io(dir, e))?;
    }

    let json_path = target.json_path();
    let mut sink = JsonArraySink::open(&json_path)?;
    let summary = PaginationDriver::new(transport, &job, progress)
        .run(&mut sink)
        .await?;
    debug!(path = %json_path.display(), records = sink.written(), "json export closed");
    drop(sink);

    let projection = CsvProjector::new(job.kind.schema()).project(&json_path, &target.csv_path())?;
    info!(
        base = %target.base().display(),
        records = summary.written,
        columns = projection.columns,
        "export written"
    );

    Ok(ExportOutcome {
        target,
        summary,
        projection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use serde_json::json;

    struct TestConfig {
        folder: PathBuf,
    }

    impl ExportConfig for TestConfig {
        fn output_folder(&self) -> PathBuf {
            self.folder.clone()
        }
        fn environment_name(&self) -> &str {
            "dev"
        }
        fn default_page_limit(&self) -> u32 {
            2
        }
    }

    #[test]
    fn test_output_names() {
        let config = TestConfig {
            folder: PathBuf::from("exports"),
        };
        let target = OutputTarget::new(&config, "Sessions", 1_700_000_000);
        assert_eq!(
            target.json_path(),
            PathBuf::from("exports/dev_Sessions_Export1700000000.json")
        );
        assert_eq!(
            target.csv_path(),
            PathBuf::from("exports/dev_Sessions_Export1700000000.csv")
        );

        let config = TestConfig {
            folder: PathBuf::new(),
        };
        let target = OutputTarget::new(&config, "IDP", 5);
        assert_eq!(target.base(), Path::new("dev_IDP_Export5"));
    }

    #[test]
    fn test_request_defaults_from_config() {
        let config = TestConfig {
            folder: PathBuf::new(),
        };
        let job = ExportRequest::new(ResourceKind::Profiles)
            .into_job(&config)
            .unwrap();
        assert_eq!(job.page_limit, 2);
        assert!(job.created_since.is_none());

        let mut request = ExportRequest::new(ResourceKind::WorkflowSessions);
        request.page_limit = Some(50);
        request.recent_days = Some(3);
        let job = request.into_job(&config).unwrap();
        assert_eq!(job.page_limit, 50);
        assert!(job.created_since.is_some());
    }

    #[tokio::test]
    async fn test_run_export_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = TestConfig {
            folder: dir.path().join("out"),
        };
        let transport = FakeTransport::offset_collection(
            "profiles",
            vec![
                json!({"id": "1", "attributes": {"team": "red"}}),
                json!({"id": "2", "attributes": {"badge": "b-2"}}),
                json!({"id": "3"}),
            ],
        );

        let outcome = run_export(
            &transport,
            &config,
            ExportRequest::new(ResourceKind::Profiles),
            &crate::driver::NoProgress,
        )
        .await
        .unwrap();

        let json = std::fs::read_to_string(outcome.target.json_path()).unwrap();
        let values: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0]["archived"], false);

        let csv = std::fs::read_to_string(outcome.target.csv_path()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("ID,UID,Name,ProfileTypeID,Status,IDProofingStatus,UpdatedAt,CreatedAt,badge,team")
        );
        assert_eq!(lines.next(), Some("1,,,,,,,,,red"));
        assert_eq!(lines.next(), Some("2,,,,,,,,b-2,"));
        assert_eq!(lines.next(), Some("3,,,,,,,,,"));
        assert_eq!(outcome.projection.dynamic_keys, ["badge", "team"]);
        assert!(
            outcome
                .target
                .base()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("dev_Profile_Export")
        );
    }

    #[tokio::test]
    async fn test_failed_export_skips_csv() {
        let dir = tempfile::tempdir().unwrap();
        let config = TestConfig {
            folder: dir.path().to_path_buf(),
        };
        let transport =
            FakeTransport::offset_collection("profiles", vec![json!({"id": "1"})]).fail_at_call(2);
        let target = OutputTarget::new(&config, "Profile", 1);

        let err = run_export_to(
            &transport,
            &config,
            ExportRequest::new(ResourceKind::Profiles),
            &crate::driver::NoProgress,
            target.clone(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExportError::Http { .. }));
        assert_eq!(std::fs::read_to_string(target.json_path()).unwrap(), "[]");
        assert!(!target.csv_path().exists());
    }
}
