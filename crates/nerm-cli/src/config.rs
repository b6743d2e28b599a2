use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use nerm_export::ExportConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "nonemployee.com";
pub const DEFAULT_LIMIT: u32 = 100;

/// Keys accepted by `nerm config set`.
pub const SETTABLE_KEYS: [&str; 3] = ["output_folder", "limit", "base_url"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Environment {
    pub tenant: String,
    pub token: String,
    /// Overrides the global base URL for this environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NermConfig {
    pub current_environment: Option<String>,
    pub base_url: String,
    pub output_folder: String,
    pub limit: u32,
    pub environments: BTreeMap<String, Environment>,
}

impl Default for NermConfig {
    fn default() -> Self {
        Self {
            current_environment: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            output_folder: String::new(),
            limit: DEFAULT_LIMIT,
            environments: BTreeMap::new(),
        }
    }
}

fn config_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("NERM_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => dirs::home_dir()
            .context("Cannot determine home directory")?
            .join(".nerm"),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Cannot create config directory {}", dir.display()))?;
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

impl NermConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let cfg: Self =
            toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(cfg)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Cannot write {}", path.display()))?;
        Ok(())
    }

    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.environments.get(&name.to_lowercase())
    }

    pub fn add_environment(&mut self, name: &str, env: Environment) -> Result<String> {
        let key = normalize_name(name)?;
        if self.environments.contains_key(&key) {
            bail!("Environment '{key}' already exists, use `nerm env update {key}` to change it");
        }
        self.environments.insert(key.clone(), env);
        if self.current_environment.is_none() {
            self.current_environment = Some(key.clone());
        }
        Ok(key)
    }

    pub fn environment_mut(&mut self, name: &str) -> Result<&mut Environment> {
        let key = name.to_lowercase();
        self.environments
            .get_mut(&key)
            .with_context(|| format!("Unknown environment '{key}'"))
    }

    pub fn remove_environment(&mut self, name: &str) -> Result<Environment> {
        let key = name.to_lowercase();
        let removed = self
            .environments
            .remove(&key)
            .with_context(|| format!("Unknown environment '{key}'"))?;
        if self.current_environment.as_deref() == Some(key.as_str()) {
            self.current_environment = None;
        }
        Ok(removed)
    }

    pub fn use_environment(&mut self, name: &str) -> Result<()> {
        let key = name.to_lowercase();
        if !self.environments.contains_key(&key) {
            bail!("Unknown environment '{key}'");
        }
        self.current_environment = Some(key);
        Ok(())
    }

    /// Name of the environment a command targets: the override, else the current one.
    pub fn resolve_name(&self, override_name: Option<&str>) -> Result<String> {
        match override_name.or(self.current_environment.as_deref()) {
            Some(name) if !name.is_empty() => Ok(name.to_lowercase()),
            _ => bail!(
                "No environment selected. Create one with `nerm env create <name>` or pass --env"
            ),
        }
    }

    pub fn active(&self, override_name: Option<&str>) -> Result<ActiveEnvironment<'_>> {
        self.named(&self.resolve_name(override_name)?)
    }

    pub fn named(&self, name: &str) -> Result<ActiveEnvironment<'_>> {
        let key = name.to_lowercase();
        let (name, env) = self
            .environments
            .get_key_value(&key)
            .with_context(|| format!("Unknown environment '{key}'"))?;
        Ok(ActiveEnvironment {
            name,
            env,
            config: self,
        })
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "output_folder" => self.output_folder = value.to_string(),
            "base_url" => {
                if value.is_empty() {
                    bail!("base_url cannot be empty");
                }
                self.base_url = value.to_string();
            }
            "limit" => {
                let limit: u32 = value
                    .parse()
                    .with_context(|| format!("limit must be a positive number, got '{value}'"))?;
                if limit == 0 {
                    bail!("limit must be a positive number, got '{value}'");
                }
                self.limit = limit;
            }
            other => bail!(
                "Unknown config key: {other}. Valid keys: {}",
                SETTABLE_KEYS.join(", ")
            ),
        }
        Ok(())
    }
}

fn normalize_name(name: &str) -> Result<String> {
    let key = name.trim().to_lowercase();
    if key.is_empty() {
        bail!("Environment name cannot be empty");
    }
    Ok(key)
}

/// One registered environment together with the global settings it inherits.
#[derive(Debug, Clone, Copy)]
pub struct ActiveEnvironment<'a> {
    name: &'a str,
    env: &'a Environment,
    config: &'a NermConfig,
}

impl ActiveEnvironment<'_> {
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn tenant(&self) -> &str {
        &self.env.tenant
    }

    pub fn token(&self) -> &str {
        &self.env.token
    }

    pub fn base_url(&self) -> &str {
        self.env.base_url.as_deref().unwrap_or(&self.config.base_url)
    }

    /// `tenant.base_url`, as shown to the user.
    pub fn host(&self) -> String {
        format!("{}.{}", self.tenant(), self.base_url())
    }
}

impl ExportConfig for ActiveEnvironment<'_> {
    fn output_folder(&self) -> PathBuf {
        PathBuf::from(&self.config.output_folder)
    }

    fn environment_name(&self) -> &str {
        self.name
    }

    fn default_page_limit(&self) -> u32 {
        self.config.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(tenant: &str) -> Environment {
        Environment {
            tenant: tenant.to_string(),
            token: "secret".to_string(),
            base_url: None,
        }
    }

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = NermConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg.base_url, "nonemployee.com");
        assert_eq!(cfg.limit, 100);
        assert!(cfg.output_folder.is_empty());
        assert!(cfg.current_environment.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = NermConfig::default();
        cfg.add_environment("Sandbox", env("acme-sb")).unwrap();
        cfg.set_value("limit", "250").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = NermConfig::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.current_environment.as_deref(), Some("sandbox"));
        assert_eq!(loaded.environment("SANDBOX").unwrap().tenant, "acme-sb");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "output_folder = \"exports\"\n").unwrap();
        let cfg = NermConfig::load_from(&path).unwrap();
        assert_eq!(cfg.output_folder, "exports");
        assert_eq!(cfg.limit, 100);
    }

    #[test]
    fn test_duplicate_environment_rejected() {
        let mut cfg = NermConfig::default();
        cfg.add_environment("prod", env("acme")).unwrap();
        assert!(cfg.add_environment("PROD", env("other")).is_err());
        assert!(cfg.add_environment("  ", env("x")).is_err());
    }

    #[test]
    fn test_active_environment_resolution() {
        let mut cfg = NermConfig::default();
        cfg.add_environment("prod", env("acme")).unwrap();
        let mut staging = env("acme-stg");
        staging.base_url = Some("nonemployee-stg.com".to_string());
        cfg.add_environment("staging", staging).unwrap();

        let active = cfg.active(None).unwrap();
        assert_eq!(active.name(), "prod");
        assert_eq!(active.host(), "acme.nonemployee.com");
        assert_eq!(active.default_page_limit(), 100);

        let active = cfg.active(Some("Staging")).unwrap();
        assert_eq!(active.environment_name(), "staging");
        assert_eq!(active.host(), "acme-stg.nonemployee-stg.com");

        assert!(cfg.active(Some("missing")).is_err());
        assert!(NermConfig::default().active(None).is_err());
    }

    #[test]
    fn test_remove_clears_current() {
        let mut cfg = NermConfig::default();
        cfg.add_environment("prod", env("acme")).unwrap();
        cfg.add_environment("dev", env("acme-dev")).unwrap();
        cfg.use_environment("DEV").unwrap();
        assert_eq!(cfg.current_environment.as_deref(), Some("dev"));

        cfg.remove_environment("dev").unwrap();
        assert!(cfg.current_environment.is_none());
        assert!(cfg.use_environment("dev").is_err());
    }

    #[test]
    fn test_set_value_validation() {
        let mut cfg = NermConfig::default();
        cfg.set_value("output_folder", "/tmp/out").unwrap();
        cfg.add_environment("x", env("x")).unwrap();
        let active = cfg.active(None).unwrap();
        assert_eq!(active.output_folder(), PathBuf::from("/tmp/out"));

        assert!(cfg.set_value("limit", "0").is_err());
        assert!(cfg.set_value("limit", "ten").is_err());
        assert!(cfg.set_value("colour", "blue").is_err());
    }
}
