//! Static record shapes for every collection the client reads.
//!
//! A schema lists the fixed fields of a record in output order, the CSV
//! header label for each, and the key (if any) holding the per-record
//! attribute map that gets flattened into extra CSV columns.

/// Value type of a fixed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Flag,
}

/// One fixed field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// JSON key in the API response and in the exported JSON file.
    pub key: &'static str,
    /// Column label in the CSV header.
    pub header: &'static str,
    pub kind: FieldKind,
    /// Every field is written to JSON; only these become CSV columns.
    pub in_csv: bool,
}

impl FieldSpec {
    pub const fn text(key: &'static str, header: &'static str) -> Self {
        Self {
            key,
            header,
            kind: FieldKind::Text,
            in_csv: true,
        }
    }

    /// A boolean kept in the JSON export but left out of the CSV.
    pub const fn json_flag(key: &'static str) -> Self {
        Self {
            key,
            header: key,
            kind: FieldKind::Flag,
            in_csv: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    /// Response key holding the page of records.
    pub collection: &'static str,
    pub fields: &'static [FieldSpec],
    pub attributes_key: Option<&'static str>,
}

impl RecordSchema {
    /// Fixed fields that become CSV columns, in order.
    pub fn csv_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.in_csv)
    }

    pub fn fixed_headers(&self) -> Vec<&'static str> {
        self.csv_fields().map(|f| f.header).collect()
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }
}

pub const PROFILE: RecordSchema = RecordSchema {
    collection: "profiles",
    fields: &[
        FieldSpec::text("id", "ID"),
        FieldSpec::text("uid", "UID"),
        FieldSpec::text("name", "Name"),
        FieldSpec::text("profile_type_id", "ProfileTypeID"),
        FieldSpec::text("status", "Status"),
        FieldSpec::text("id_proofing_status", "IDProofingStatus"),
        FieldSpec::text("updated_at", "UpdatedAt"),
        FieldSpec::text("created_at", "CreatedAt"),
        FieldSpec::json_flag("archived"),
    ],
    attributes_key: Some("attributes"),
};

pub const WORKFLOW_SESSION: RecordSchema = RecordSchema {
    collection: "workflow_sessions",
    fields: &[
        FieldSpec::text("id", "ID"),
        FieldSpec::text("uid", "UID"),
        FieldSpec::text("workflow_id", "WorkflowID"),
        FieldSpec::text("requester_type", "RequesterType"),
        FieldSpec::text("requester_id", "RequesterID"),
        FieldSpec::text("profile_id", "ProfileID"),
        FieldSpec::text("status", "Status"),
        FieldSpec::text("updated_at", "UpdatedAt"),
        FieldSpec::text("created_at", "CreatedAt"),
    ],
    attributes_key: Some("attributes"),
};

pub const IDENTITY_PROOFING_RESULT: RecordSchema = RecordSchema {
    collection: "identity_proofing_results",
    fields: &[
        FieldSpec::text("id", "ID"),
        FieldSpec::text("identity_proofing_action_id", "IdentityProofingActionID"),
        FieldSpec::text("workflow_session_id", "WorkflowSessionID"),
        FieldSpec::text("profile_id", "ProfileID"),
        FieldSpec::text("proofing_workflow", "IdentityProofingWorkflow"),
        FieldSpec::text("result", "Result"),
        FieldSpec::text("updated_at", "UpdatedAt"),
        FieldSpec::text("created_at", "CreatedAt"),
    ],
    attributes_key: Some("proofing_attributes"),
};

pub const ADVANCED_SEARCH: RecordSchema = RecordSchema {
    collection: "advanced_search",
    fields: &[
        FieldSpec::text("id", "ID"),
        FieldSpec::text("uid", "UID"),
        FieldSpec::text("label", "Label"),
    ],
    attributes_key: None,
};

pub const PROFILE_TYPE: RecordSchema = RecordSchema {
    collection: "profile_types",
    fields: &[
        FieldSpec::text("id", "ID"),
        FieldSpec::text("uid", "UID"),
        FieldSpec::text("name", "Name"),
        FieldSpec::text("category", "Category"),
    ],
    attributes_key: None,
};
