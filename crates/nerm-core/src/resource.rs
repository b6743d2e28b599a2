use std::fmt;

use crate::schema::{
    ADVANCED_SEARCH, IDENTITY_PROOFING_RESULT, PROFILE, PROFILE_TYPE, RecordSchema,
    WORKFLOW_SESSION,
};

/// A remote collection the client can page through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Profiles,
    WorkflowSessions,
    IdentityProofing,
    /// Results of running one stored advanced search.
    AdvancedSearchRun { search_id: String },
    /// The stored advanced-search configurations themselves.
    AdvancedSearches,
    ProfileTypes,
}

impl ResourceKind {
    /// Path under `/api/` for listing this collection.
    pub fn path(&self) -> String {
        match self {
            Self::Profiles => "profiles".to_string(),
            Self::WorkflowSessions => "workflow_sessions".to_string(),
            Self::IdentityProofing => "identity_proofing_results".to_string(),
            Self::AdvancedSearchRun { search_id } => format!("advanced_search/{search_id}/run"),
            Self::AdvancedSearches => "advanced_search".to_string(),
            Self::ProfileTypes => "profile_types".to_string(),
        }
    }

    pub fn schema(&self) -> &'static RecordSchema {
        match self {
            Self::Profiles | Self::AdvancedSearchRun { .. } => &PROFILE,
            Self::WorkflowSessions => &WORKFLOW_SESSION,
            Self::IdentityProofing => &IDENTITY_PROOFING_RESULT,
            Self::AdvancedSearches => &ADVANCED_SEARCH,
            Self::ProfileTypes => &PROFILE_TYPE,
        }
    }

    /// Largest page size the remote accepts for this collection.
    pub fn max_page_limit(&self) -> u32 {
        match self {
            Self::Profiles | Self::WorkflowSessions => 500,
            Self::IdentityProofing
            | Self::AdvancedSearchRun { .. }
            | Self::AdvancedSearches
            | Self::ProfileTypes => 100,
        }
    }

    /// Label used in export file names.
    pub fn export_label(&self) -> &'static str {
        match self {
            Self::Profiles => "Profile",
            Self::WorkflowSessions => "Sessions",
            Self::IdentityProofing => "IDP",
            Self::AdvancedSearchRun { .. } => "AdvancedSearch",
            Self::AdvancedSearches => "AdvancedSearchConfig",
            Self::ProfileTypes => "ProfileTypes",
        }
    }

    /// Search runs have no metadata total; an empty page ends the run.
    pub fn completes_on_empty_page(&self) -> bool {
        matches!(self, Self::AdvancedSearchRun { .. })
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
