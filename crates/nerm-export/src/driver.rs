//! Pagination driver: walks a collection page by page and feeds a sink.
//!
//! A run moves through [`JobState`]s. Offset jobs first probe the remote
//! total with a one-record page and stop at the smaller of that total and
//! the caller's ceiling. Cursor jobs follow `after_id` until an empty page,
//! the ceiling, or a cursor that no longer advances. Advanced-search runs
//! skip the probe and read until an empty page.
//!
//! The driver always holds back the latest non-empty batch so the sink can
//! be told which batch is final, and it closes the sink on every exit path.

use std::fmt;

use nerm_core::{CreatedSince, Record, ResourceKind};
use tracing::{debug, error, info, warn};

use crate::error::{ExportError, Result};
use crate::fetcher::{Page, PageFetcher, Position};
use crate::sink::RecordSink;
use crate::transport::{QueryParams, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Init,
    Probing,
    Fetching,
    Filtering,
    Draining,
    Done,
    Aborted,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Init => "init",
            JobState::Probing => "probing",
            JobState::Fetching => "fetching",
            JobState::Filtering => "filtering",
            JobState::Draining => "draining",
            JobState::Done => "done",
            JobState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Pagination {
    #[default]
    Offset,
    /// Follow `after_id` cursors, optionally resuming after a known id.
    Cursor { start_after: Option<String> },
}

/// Fully resolved description of one pagination run.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub kind: ResourceKind,
    pub filters: QueryParams,
    pub page_limit: u32,
    pub ceiling: Option<u64>,
    pub pagination: Pagination,
    pub created_since: Option<CreatedSince>,
    pub keep_archived: Option<bool>,
}

impl ExportJob {
    pub fn new(kind: ResourceKind, page_limit: u32) -> Self {
        Self {
            kind,
            filters: QueryParams::new(),
            page_limit,
            ceiling: None,
            pagination: Pagination::Offset,
            created_since: None,
            keep_archived: None,
        }
    }

    pub fn with_filters(mut self, filters: QueryParams) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_ceiling(mut self, ceiling: Option<u64>) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_created_since(mut self, created_since: Option<CreatedSince>) -> Self {
        self.created_since = created_since;
        self
    }

    pub fn with_keep_archived(mut self, keep_archived: Option<bool>) -> Self {
        self.keep_archived = keep_archived;
        self
    }
}

/// Receives cumulative progress from a run. All methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    /// `total` is `None` when the run has no known bound.
    fn start(&self, _total: Option<u64>) {}

    fn advance(&self, _position: u64) {}

    fn finish(&self, _position: u64) {}
}

/// Progress reporter that discards everything.
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub pages: u64,
    pub fetched: u64,
    pub written: u64,
    pub effective_ceiling: Option<u64>,
    pub reported_total: Option<u64>,
}

pub struct PaginationDriver<'a> {
    fetcher: PageFetcher<'a>,
    job: &'a ExportJob,
    progress: &'a dyn ProgressReporter,
    state: JobState,
    pending: Option<Vec<Record>>,
    progress_cap: Option<u64>,
    summary: JobSummary,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        job: &'a ExportJob,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            fetcher: PageFetcher::new(transport, job.kind.clone(), job.filters.clone()),
            job,
            progress,
            state: JobState::Init,
            pending: None,
            progress_cap: None,
            summary: JobSummary::default(),
        }
    }

    /// Run to completion, writing every kept record to `sink`.
    ///
    /// The sink is closed whether or not the run succeeds. On failure the
    /// held-back batch is still written as the final one so the output
    /// stays a complete array of everything fetched so far.
    pub async fn run<S>(mut self, sink: &mut S) -> Result<JobSummary>
    where
        S: RecordSink + ?Sized,
    {
        match self.pump(sink).await {
            Ok(()) => {
                self.drain_pending(sink)?;
                sink.close()?;
                self.transition(JobState::Done);
                let final_position = match self.progress_cap {
                    Some(cap) if self.effective_is_exact() => cap,
                    Some(cap) => self.summary.fetched.min(cap),
                    None => self.summary.fetched,
                };
                self.progress.finish(final_position);
                info!(
                    kind = %self.job.kind,
                    pages = self.summary.pages,
                    fetched = self.summary.fetched,
                    written = self.summary.written,
                    "export finished"
                );
                Ok(self.summary)
            }
            Err(err) => {
                self.transition(JobState::Aborted);
                error!(
                    kind = %self.job.kind,
                    category = %err.category(),
                    fetched = self.summary.fetched,
                    "export aborted: {err}"
                );
                if let Err(close_err) = self.drain_pending(sink).and_then(|_| sink.close()) {
                    warn!("could not finish partial output: {close_err}");
                }
                Err(err)
            }
        }
    }

    async fn pump<S>(&mut self, sink: &mut S) -> Result<()>
    where
        S: RecordSink + ?Sized,
    {
        let job = self.job;
        let limit = self.page_limit()?;
        let user_ceiling = job.ceiling.unwrap_or(u64::MAX);

        if job.kind.completes_on_empty_page() {
            self.progress_cap = job.ceiling;
            self.summary.effective_ceiling = job.ceiling;
            self.progress.start(job.ceiling);
            self.transition(JobState::Fetching);
            return self.offset_loop(sink, limit, user_ceiling).await;
        }

        let first = match &job.pagination {
            Pagination::Offset => Position::Offset(0),
            Pagination::Cursor { start_after } => Position::After(start_after.clone()),
        };

        self.transition(JobState::Probing);
        let probe = self.fetcher.fetch(1, &first, true).await?;
        let reported_total = probe.reported_total().unwrap_or_else(|| {
            warn!(kind = %job.kind, "probe response carried no total, assuming 0");
            0
        });
        self.summary.reported_total = Some(reported_total);
        let bounded = user_ceiling.min(reported_total);
        self.progress_cap = Some(bounded);
        self.progress.start(Some(bounded));
        debug!(kind = %job.kind, reported_total, ceiling = bounded, "probed collection");

        self.transition(JobState::Fetching);
        match &job.pagination {
            Pagination::Offset => {
                self.summary.effective_ceiling = Some(bounded);
                self.offset_loop(sink, limit, bounded).await
            }
            Pagination::Cursor { .. } => {
                self.summary.effective_ceiling = job.ceiling;
                self.cursor_loop(sink, limit, first, user_ceiling).await
            }
        }
    }

    async fn offset_loop<S>(&mut self, sink: &mut S, limit: u32, bound: u64) -> Result<()>
    where
        S: RecordSink + ?Sized,
    {
        let mut offset = 0u64;
        while offset < bound {
            let page = self.fetcher.fetch(limit, &Position::Offset(offset), false).await?;
            if page.is_empty() {
                debug!(kind = %self.job.kind, offset, "empty page, stopping");
                break;
            }
            self.handle_page(sink, page)?;
            offset += u64::from(limit);
        }
        Ok(())
    }

    async fn cursor_loop<S>(
        &mut self,
        sink: &mut S,
        limit: u32,
        mut position: Position,
        bound: u64,
    ) -> Result<()>
    where
        S: RecordSink + ?Sized,
    {
        while self.summary.fetched < bound {
            let page = self.fetcher.fetch(limit, &position, true).await?;
            if page.is_empty() {
                debug!(kind = %self.job.kind, %position, "empty page, stopping");
                break;
            }
            let next = page.next_cursor();
            self.handle_page(sink, page)?;

            let current = match &position {
                Position::After(id) => id.as_deref(),
                Position::Offset(_) => None,
            };
            match next {
                Some(next) if Some(next.as_str()) != current => {
                    position = Position::After(Some(next));
                }
                Some(next) => {
                    warn!(kind = %self.job.kind, cursor = %next, "cursor did not advance, stopping");
                    break;
                }
                None => {
                    warn!(kind = %self.job.kind, "no cursor for the next page, stopping");
                    break;
                }
            }
        }
        Ok(())
    }

    fn handle_page<S>(&mut self, sink: &mut S, page: Page) -> Result<()>
    where
        S: RecordSink + ?Sized,
    {
        self.summary.pages += 1;
        self.summary.fetched += page.len() as u64;

        self.transition(JobState::Filtering);
        let kept = self.filter(page.records)?;
        let position = match self.progress_cap {
            Some(cap) => self.summary.fetched.min(cap),
            None => self.summary.fetched,
        };
        self.progress.advance(position);

        self.transition(JobState::Draining);
        if !kept.is_empty()
            && let Some(previous) = self.pending.replace(kept)
        {
            self.summary.written += previous.len() as u64;
            sink.append(previous, false)?;
        }
        self.transition(JobState::Fetching);
        Ok(())
    }

    fn filter(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if let Some(since) = &self.job.created_since
                && !since.matches(&record)?
            {
                continue;
            }
            if let Some(keep) = self.job.keep_archived
                && record.flag("archived") != keep
            {
                continue;
            }
            kept.push(record);
        }
        Ok(kept)
    }

    fn drain_pending<S>(&mut self, sink: &mut S) -> Result<()>
    where
        S: RecordSink + ?Sized,
    {
        if let Some(last) = self.pending.take() {
            self.summary.written += last.len() as u64;
            sink.append(last, true)?;
        }
        Ok(())
    }

    fn page_limit(&self) -> Result<u32> {
        let requested = self.job.page_limit;
        if requested == 0 {
            return Err(ExportError::invalid_request("page limit must be at least 1"));
        }
        let max = self.job.kind.max_page_limit();
        if requested > max {
            warn!(kind = %self.job.kind, requested, max, "page limit too large, clamping");
            return Ok(max);
        }
        Ok(requested)
    }

    /// Offset jobs report their bound exactly when done.
    fn effective_is_exact(&self) -> bool {
        matches!(self.job.pagination, Pagination::Offset) && !self.job.kind.completes_on_empty_page()
    }

    fn transition(&mut self, next: JobState) {
        if self.state != next {
            debug!(kind = %self.job.kind, from = %self.state, to = %next, "export state");
            self.state = next;
        }
    }
}

/// Collect every record of `job` in memory.
pub async fn collect_all(transport: &dyn Transport, job: &ExportJob) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    PaginationDriver::new(transport, job, &NoProgress)
        .run(&mut records)
        .await?;
    Ok(records)
}
