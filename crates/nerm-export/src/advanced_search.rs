//! Stored advanced-search configurations: list, inspect, download, create.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use nerm_core::{Record, ResourceKind};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::counts::PROFILE_STATUSES;
use crate::driver::{ExportJob, collect_all};
use crate::error::{ExportError, Result};
use crate::job::ExportConfig;
use crate::transport::{Method, QueryParams, Transport};

const COLLECTION: &str = "advanced_search";

/// Every stored advanced search, in remote order.
pub async fn list(transport: &dyn Transport) -> Result<Vec<Record>> {
    collect_all(transport, &ExportJob::new(ResourceKind::AdvancedSearches, 100)).await
}

/// Full configuration of one advanced search, rules included.
pub async fn show(transport: &dyn Transport, id: &str) -> Result<Value> {
    let query = QueryParams::new().with("id", id);
    let body = transport
        .request(Method::Get, COLLECTION, None, &query, None)
        .await?;
    let mut value: Value = serde_json::from_slice(&body)
        .map_err(|e| ExportError::decode(format!("{COLLECTION}: {e}")))?;
    match value.get_mut(COLLECTION).map(Value::take) {
        Some(Value::Null) | None => Err(ExportError::decode(format!(
            "no advanced search returned for id '{id}'"
        ))),
        Some(found) => Ok(found),
    }
}

/// Label of a configuration returned by [`show`], which may be a list.
pub fn config_label(config: &Value) -> Option<&str> {
    match config {
        Value::Array(items) => items.first().and_then(config_label),
        Value::Object(obj) => obj.get("label").and_then(Value::as_str),
        _ => None,
    }
}

/// Write the configuration of `id` under the output folder; returns the file.
///
/// The file holds `{"advanced_search": ...}` and can be fed back to
/// [`create_from_file`].
pub async fn download(
    transport: &dyn Transport,
    config: &dyn ExportConfig,
    id: &str,
) -> Result<PathBuf> {
    let search = show(transport, id).await?;
    let label = file_label(config_label(&search).unwrap_or(id));
    let name = format!(
        "{}_{label}_AdvancedSearch_Config{}.json",
        config.environment_name(),
        chrono::Utc::now().timestamp()
    );
    let folder = config.output_folder();
    if !folder.as_os_str().is_empty() {
        std::fs::create_dir_all(&folder).map_err(|e| ExportError::io(&folder, e))?;
    }
    let path = folder.join(name);
    write_config(&path, &search)?;
    info!(path = %path.display(), "saved advanced search configuration");
    Ok(path)
}

/// Labels are free text; keep the download inside the output folder.
fn file_label(label: &str) -> String {
    label.replace(['/', '\\'], "_")
}

fn write_config(path: &Path, search: &Value) -> Result<()> {
    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &json!({ COLLECTION: search }))
        .map_err(|e| ExportError::io(path, e.into()))?;
    writer.flush().map_err(|e| ExportError::io(path, e))
}

/// Upload the configuration stored in a downloaded file.
pub async fn create_from_file(transport: &dyn Transport, path: &Path) -> Result<Value> {
    let file = File::open(path).map_err(|e| ExportError::io(path, e))?;
    let mut stored: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ExportError::decode(format!("{}: {e}", path.display())))?;
    let search = match stored.get_mut(COLLECTION).map(Value::take) {
        Some(Value::Null) | None => {
            return Err(ExportError::invalid_request(format!(
                "{} has no '{COLLECTION}' key",
                path.display()
            )));
        }
        Some(search) => search,
    };
    post(transport, json!({ COLLECTION: search })).await
}

/// One condition attached to a new advanced search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionRule {
    ProfileStatus(String),
    ProfileType(String),
    Risk(String),
}

impl ConditionRule {
    /// Status rules only accept the statuses profiles can have.
    pub fn profile_status(status: &str) -> Result<Self> {
        PROFILE_STATUSES
            .iter()
            .find(|s| s.eq_ignore_ascii_case(status))
            .map(|s| Self::ProfileStatus((*s).to_string()))
            .ok_or_else(|| {
                ExportError::invalid_request(format!(
                    "unknown profile status '{status}', expected one of {}",
                    PROFILE_STATUSES.join(", ")
                ))
            })
    }

    pub fn rule_type(&self) -> &'static str {
        match self {
            Self::ProfileStatus(_) => "ProfileStatusRule",
            Self::ProfileType(_) => "ProfileTypeRule",
            Self::Risk(_) => "RiskRule",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::ProfileStatus(v) | Self::ProfileType(v) | Self::Risk(v) => v,
        }
    }

    fn to_patch(&self) -> Value {
        json!({
            COLLECTION: {
                "condition_rules_attributes": [{
                    "type": self.rule_type(),
                    "comparison_operator": "==",
                    "value": self.value(),
                }]
            }
        })
    }
}

/// Create a labelled advanced search, then attach each rule in turn.
///
/// Returns the id of the new search.
pub async fn create_with_rules(
    transport: &dyn Transport,
    label: &str,
    rules: &[ConditionRule],
) -> Result<String> {
    let created = post(transport, json!({ COLLECTION: { "label": label } })).await?;
    let id = created
        .get(COLLECTION)
        .and_then(|s| s.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ExportError::decode("create response carried no advanced search id"))?
        .to_string();
    debug!(%id, label, "created advanced search");

    for rule in rules {
        let body = serde_json::to_vec(&rule.to_patch()).map_err(|e| ExportError::decode(e.to_string()))?;
        transport
            .request(Method::Patch, COLLECTION, Some(&id), &QueryParams::new(), Some(body))
            .await?;
        debug!(%id, rule = rule.rule_type(), value = rule.value(), "added condition rule");
    }
    Ok(id)
}

async fn post(transport: &dyn Transport, body: Value) -> Result<Value> {
    let body = serde_json::to_vec(&body).map_err(|e| ExportError::decode(e.to_string()))?;
    let resp = transport
        .request(Method::Post, COLLECTION, None, &QueryParams::new(), Some(body))
        .await?;
    if resp.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&resp).map_err(|e| ExportError::decode(format!("{COLLECTION}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;

    struct Folder(PathBuf);

    impl ExportConfig for Folder {
        fn output_folder(&self) -> PathBuf {
            self.0.clone()
        }
        fn environment_name(&self) -> &str {
            "qa"
        }
        fn default_page_limit(&self) -> u32 {
            100
        }
    }

    fn config_body() -> String {
        json!({"advanced_search": [{
            "id": "s1",
            "label": "Leavers",
            "condition_rules_attributes": [{"type": "ProfileStatusRule", "value": "Terminated"}]
        }]})
        .to_string()
    }

    #[tokio::test]
    async fn test_show_returns_configuration() {
        let transport = FakeTransport::from_bodies(vec![config_body()]);
        let search = show(&transport, "s1").await.unwrap();
        assert_eq!(config_label(&search), Some("Leavers"));

        let call = &transport.log()[0];
        assert_eq!(call.path, "advanced_search");
        assert_eq!(call.query.get("id"), Some("s1"));
    }

    #[tokio::test]
    async fn test_show_unknown_id() {
        let transport = FakeTransport::from_bodies(vec![json!({}).to_string()]);
        assert!(show(&transport, "nope").await.is_err());
    }

    #[tokio::test]
    async fn test_download_then_create_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::from_bodies(vec![config_body()]);
        let path = download(&transport, &Folder(dir.path().to_path_buf()), "s1")
            .await
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("qa_Leavers_AdvancedSearch_Config"));
        assert!(name.ends_with(".json"));

        let upload = FakeTransport::from_bodies(vec![json!({"advanced_search": {"id": "s2"}}).to_string()]);
        create_from_file(&upload, &path).await.unwrap();
        let call = &upload.log()[0];
        assert_eq!(call.method, Method::Post);
        assert_eq!(
            call.body.as_ref().unwrap()["advanced_search"][0]["label"],
            "Leavers"
        );
    }

    #[tokio::test]
    async fn test_download_label_with_separators_stays_in_folder() {
        let dir = tempfile::tempdir().unwrap();
        let body = json!({"advanced_search": [{"id": "s1", "label": "Leavers/2024\\Q1"}]}).to_string();
        let transport = FakeTransport::from_bodies(vec![body]);
        let path = download(&transport, &Folder(dir.path().to_path_buf()), "s1")
            .await
            .unwrap();

        assert_eq!(path.parent(), Some(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("qa_Leavers_2024_Q1_AdvancedSearch_Config"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_create_from_file_requires_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        std::fs::write(&path, r#"{"label": "x"}"#).unwrap();
        let transport = FakeTransport::from_bodies(Vec::new());
        let err = create_from_file(&transport, &path).await.unwrap_err();
        assert!(matches!(err, ExportError::InvalidRequest(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_with_rules_patches_each_rule() {
        let transport = FakeTransport::from_bodies(vec![
            json!({"advanced_search": {"id": "new-1", "label": "Leavers"}}).to_string(),
        ]);
        let rules = [
            ConditionRule::profile_status("terminated").unwrap(),
            ConditionRule::ProfileType("t-9".to_string()),
        ];

        let id = create_with_rules(&transport, "Leavers", &rules).await.unwrap();
        assert_eq!(id, "new-1");

        let log = transport.log();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].body.as_ref().unwrap()["advanced_search"]["label"], "Leavers");
        assert_eq!(log[1].method, Method::Patch);
        assert_eq!(log[1].record_id.as_deref(), Some("new-1"));
        let rule = &log[1].body.as_ref().unwrap()["advanced_search"]["condition_rules_attributes"][0];
        assert_eq!(rule["type"], "ProfileStatusRule");
        assert_eq!(rule["value"], "Terminated");
        assert_eq!(rule["comparison_operator"], "==");
    }

    #[test]
    fn test_status_validation() {
        assert!(ConditionRule::profile_status("On Leave").is_ok());
        assert!(ConditionRule::profile_status("Retired").is_err());
    }
}
