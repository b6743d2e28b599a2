//! Single-page retrieval for one collection.

use std::fmt;

use nerm_core::{Record, ResourceKind};
use serde::Deserialize;
use serde_json::Value;
use tracing::{trace, warn};

use crate::error::{ExportError, Result};
use crate::transport::{Method, QueryParams, Transport};

/// Where the next page starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Offset(u64),
    /// Cursor pagination; `None` requests the first page.
    After(Option<String>),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Offset(offset) => write!(f, "offset={offset}"),
            Position::After(Some(id)) => write!(f, "after_id={id}"),
            Position::After(None) => write!(f, "after_id=<start>"),
        }
    }
}

/// The `_metadata` block the remote attaches when asked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageMetadata {
    pub total: Option<u64>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub next: Option<String>,
    pub after_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub metadata: Option<PageMetadata>,
}

impl Page {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn reported_total(&self) -> Option<u64> {
        self.metadata.as_ref().and_then(|m| m.total)
    }

    /// Cursor for the page after this one.
    ///
    /// Prefers `_metadata.after_id`; falls back to the last record's id when
    /// the remote leaves it blank or sends the string `"null"`.
    pub fn next_cursor(&self) -> Option<String> {
        let last = self.records.last()?;
        let reported = self
            .metadata
            .as_ref()
            .and_then(|m| m.after_id.as_deref())
            .filter(|id| !id.is_empty() && *id != "null");
        if let Some(id) = reported {
            return Some(id.to_string());
        }
        let fallback = last.id().map(str::to_string);
        warn!(
            fallback = fallback.as_deref().unwrap_or(""),
            "page carried no usable after_id, continuing from the last record id"
        );
        fallback
    }

    /// Decode a response body for the given collection.
    ///
    /// An empty or whitespace-only body reads as an empty page.
    pub fn parse(kind: &ResourceKind, body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::empty());
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ExportError::decode(format!("{kind}: {e}")))?;
        let Value::Object(mut obj) = value else {
            return Err(ExportError::decode(format!(
                "{kind}: expected a JSON object response"
            )));
        };

        let schema = kind.schema();
        let records = match obj.remove(schema.collection) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => Record::from_values(schema, &items)?,
            Some(_) => {
                return Err(ExportError::decode(format!(
                    "{kind}: '{}' is not an array",
                    schema.collection
                )));
            }
        };

        let metadata = match obj.remove("_metadata") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(
                serde_json::from_value(raw)
                    .map_err(|e| ExportError::decode(format!("{kind}: _metadata: {e}")))?,
            ),
        };

        Ok(Self { records, metadata })
    }
}

/// Fetches pages of one collection under a fixed filter set.
pub struct PageFetcher<'a> {
    transport: &'a dyn Transport,
    kind: ResourceKind,
    filters: QueryParams,
}

impl<'a> PageFetcher<'a> {
    pub fn new(transport: &'a dyn Transport, kind: ResourceKind, filters: QueryParams) -> Self {
        Self {
            transport,
            kind,
            filters,
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn query(&self, limit: u32, position: &Position, with_metadata: bool) -> QueryParams {
        let mut query = QueryParams::new();
        for (key, value) in self.filters.iter() {
            query.set_opt(key, Some(value));
        }
        query.set("limit", limit);
        match position {
            Position::Offset(offset) => query.set("offset", offset),
            Position::After(id) => query.set_opt("after_id", id.as_deref()),
        }
        if with_metadata {
            query.set("metadata", "true");
        }
        query
    }

    pub async fn fetch(&self, limit: u32, position: &Position, with_metadata: bool) -> Result<Page> {
        let query = self.query(limit, position, with_metadata);
        let path = self.kind.path();
        let body = self
            .transport
            .request(Method::Get, &path, None, &query, None)
            .await?;
        let page = Page::parse(&self.kind, &body)?;
        trace!(kind = %self.kind, %position, records = page.len(), "fetched page");
        Ok(page)
    }
}
