use chrono::{DateTime, Days, FixedOffset, Local, NaiveTime, TimeZone};

use crate::error::{CoreError, Result};
use crate::record::Record;

/// Midnight (in `now`'s time zone) of the day `days` days before `now`.
///
/// When that midnight does not exist locally (a DST gap) the wall-clock
/// time is read as UTC instead.
pub fn day_boundary<Tz: TimeZone>(now: &DateTime<Tz>, days: u32) -> Result<DateTime<FixedOffset>> {
    let date = now
        .date_naive()
        .checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| CoreError::invalid_date_time(format!("{days} days before {}", now.date_naive())))?;
    let midnight = date.and_time(NaiveTime::MIN);
    let tz = now.timezone();
    let boundary = tz
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight));
    Ok(boundary.fixed_offset())
}

/// Keeps records created strictly after a boundary instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedSince {
    boundary: DateTime<FixedOffset>,
}

impl CreatedSince {
    pub fn new(boundary: DateTime<FixedOffset>) -> Self {
        Self { boundary }
    }

    /// Records from the last `days` days, counted from local midnight.
    pub fn last_days(days: u32) -> Result<Self> {
        day_boundary(&Local::now(), days).map(Self::new)
    }

    pub fn boundary(&self) -> DateTime<FixedOffset> {
        self.boundary
    }

    /// Fails when `created_at` is missing or not RFC 3339.
    pub fn matches(&self, record: &Record) -> Result<bool> {
        let raw = record.text("created_at").unwrap_or_default();
        let created = DateTime::parse_from_rfc3339(raw).map_err(|e| {
            CoreError::invalid_date_time(format!(
                "created_at '{raw}' on record '{}': {e}",
                record.id().unwrap_or("?")
            ))
        })?;
        Ok(created > self.boundary)
    }
}
