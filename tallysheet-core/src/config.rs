//! Configuration management
//!
//! Settings live in `settings.json` inside the tally directory:
//! ```json
//! {
//!   "source": { "kind": "google", "spreadsheetId": "...", "sheetName": "2026" },
//!   "demoMode": false,
//!   "valueInputMode": "userEntered",
//!   "rescheduleColumn": null,
//!   "choices": { "Modalidade": ["Presencial", "Remoto"] }
//! }
//! ```
//! Keys this crate does not know about are kept as-is on save.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::Choices;
use crate::ports::ValueInputMode;

pub const SETTINGS_FILE: &str = "settings.json";

/// Which adapter backs the sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Google,
    Csv,
}

/// Source section of settings.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    source: SourceConfig,
    #[serde(default)]
    demo_mode: bool,
    #[serde(default)]
    value_input_mode: ValueInputMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reschedule_column: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    choices: BTreeMap<String, Vec<String>>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Tally configuration (resolved view of settings plus environment)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub source: SourceConfig,
    pub demo_mode: bool,
    pub value_input_mode: ValueInputMode,
    pub reschedule_column: Option<String>,
    /// Overrides for the allowed enumerated values, by column
    pub choices: BTreeMap<String, Vec<String>>,
    /// Credentials taken from the environment; never written to disk
    pub(crate) env_credentials: EnvCredentials,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct EnvCredentials {
    access_token: Option<String>,
    api_key: Option<String>,
}

/// Value to persist for a credential: the file's own value when the current
/// one is still the environment override
fn persisted(
    current: &Option<String>,
    from_env: &Option<String>,
    on_disk: Option<String>,
) -> Option<String> {
    match from_env {
        Some(env) if current.as_ref() == Some(env) => on_disk,
        _ => current.clone(),
    }
}

impl Config {
    /// Load config from the tally directory
    ///
    /// A missing or unreadable settings file yields defaults. Environment
    /// variables win over the file:
    /// `TALLY_SPREADSHEET_ID`, `TALLY_SHEET_NAME`, `TALLY_ACCESS_TOKEN`,
    /// `TALLY_API_KEY`, `TALLY_SHEETS_BASE_URL`, `TALLY_CSV_PATH` (switches
    /// the source to csv) and `TALLY_DEMO_MODE`.
    pub fn load(tally_dir: &Path) -> Result<Self> {
        let mut config = Self::from_settings(read_settings(tally_dir)?);
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_settings(raw: SettingsFile) -> Self {
        Self {
            source: raw.source,
            demo_mode: raw.demo_mode,
            value_input_mode: raw.value_input_mode,
            reschedule_column: raw.reschedule_column,
            choices: raw.choices,
            env_credentials: EnvCredentials::default(),
        }
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = var("TALLY_SPREADSHEET_ID") {
            self.source.spreadsheet_id = Some(id);
        }
        if let Some(name) = var("TALLY_SHEET_NAME") {
            self.source.sheet_name = Some(name);
        }
        if let Some(token) = var("TALLY_ACCESS_TOKEN") {
            self.source.access_token = Some(token.clone());
            self.env_credentials.access_token = Some(token);
        }
        if let Some(key) = var("TALLY_API_KEY") {
            self.source.api_key = Some(key.clone());
            self.env_credentials.api_key = Some(key);
        }
        if let Some(url) = var("TALLY_SHEETS_BASE_URL") {
            self.source.base_url = Some(url);
        }
        if let Some(path) = var("TALLY_CSV_PATH") {
            self.source.kind = SourceKind::Csv;
            self.source.path = Some(PathBuf::from(path));
        }
        match var("TALLY_DEMO_MODE").as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => self.demo_mode = true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => self.demo_mode = false,
            _ => {}
        }
    }

    /// Save config to the tally directory
    /// Preserves settings this crate doesn't manage. Credentials that came
    /// from the environment keep their on-disk value.
    pub fn save(&self, tally_dir: &Path) -> Result<()> {
        let settings_path = tally_dir.join(SETTINGS_FILE);
        let mut settings = read_settings(tally_dir)?;

        let other = std::mem::take(&mut settings.source.other);
        let access_token = persisted(
            &self.source.access_token,
            &self.env_credentials.access_token,
            settings.source.access_token.take(),
        );
        let api_key = persisted(
            &self.source.api_key,
            &self.env_credentials.api_key,
            settings.source.api_key.take(),
        );
        settings.source = SourceConfig {
            access_token,
            api_key,
            other,
            ..self.source.clone()
        };
        settings.demo_mode = self.demo_mode;
        settings.value_input_mode = self.value_input_mode;
        settings.reschedule_column = self.reschedule_column.clone();
        settings.choices = self.choices.clone();

        std::fs::create_dir_all(tally_dir)
            .with_context(|| format!("Failed to create {}", tally_dir.display()))?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }

    /// Allowed values for enumerated fields, defaults merged with overrides
    pub fn choices(&self) -> Choices {
        Choices::default().merged(&self.choices)
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

fn read_settings(tally_dir: &Path) -> Result<SettingsFile> {
    let settings_path = tally_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Field;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn load_without_env(dir: &Path) -> Config {
        let mut config = Config::from_settings(read_settings(dir).unwrap());
        config.apply_env(no_env);
        config
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = load_without_env(dir.path());
        assert_eq!(config.source.kind, SourceKind::Google);
        assert!(!config.demo_mode);
        assert_eq!(config.value_input_mode, ValueInputMode::UserEntered);
    }

    #[test]
    fn test_parse_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{
                "source": { "kind": "csv", "path": "/tmp/relatorio.csv", "sheetName": "2026" },
                "demoMode": true,
                "valueInputMode": "raw",
                "rescheduleColumn": "Reagendou",
                "choices": { "Modalidade": ["Presencial", "Remoto", "Híbrido"] }
            }"#,
        )
        .unwrap();

        let config = load_without_env(dir.path());
        assert_eq!(config.source.kind, SourceKind::Csv);
        assert_eq!(config.source.path, Some(PathBuf::from("/tmp/relatorio.csv")));
        assert_eq!(config.source.sheet_name.as_deref(), Some("2026"));
        assert!(config.demo_mode);
        assert_eq!(config.value_input_mode, ValueInputMode::Raw);
        assert_eq!(config.reschedule_column.as_deref(), Some("Reagendou"));
        assert_eq!(
            config.choices().for_field(Field::Modality).map(|c| c.len()),
            Some(3)
        );
    }

    #[test]
    fn test_invalid_json_is_default() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();
        assert!(!load_without_env(dir.path()).demo_mode);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "TALLY_SPREADSHEET_ID" => Some("abc".into()),
            "TALLY_CSV_PATH" => Some("data.csv".into()),
            "TALLY_DEMO_MODE" => Some("yes".into()),
            "TALLY_API_KEY" => Some("  ".into()),
            _ => None,
        });
        assert_eq!(config.source.spreadsheet_id.as_deref(), Some("abc"));
        assert_eq!(config.source.kind, SourceKind::Csv);
        assert_eq!(config.source.path, Some(PathBuf::from("data.csv")));
        assert!(config.demo_mode);
        assert_eq!(config.source.api_key, None);
    }

    #[test]
    fn test_save_skips_credentials_from_env() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "source": { "apiKey": "file-key" } }"#,
        )
        .unwrap();

        let mut config = Config::from_settings(read_settings(dir.path()).unwrap());
        config.apply_env(|key| match key {
            "TALLY_ACCESS_TOKEN" => Some("env-token".into()),
            "TALLY_API_KEY" => Some("env-key".into()),
            _ => None,
        });
        assert_eq!(config.source.access_token.as_deref(), Some("env-token"));
        config.enable_demo_mode();
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        assert!(!content.contains("env-token"));
        assert!(!content.contains("env-key"));
        assert!(content.contains("file-key"));

        // a token set explicitly after loading is saved
        config.source.access_token = Some("typed-token".into());
        config.save(dir.path()).unwrap();
        let saved = load_without_env(dir.path());
        assert_eq!(saved.source.access_token.as_deref(), Some("typed-token"));
        assert_eq!(saved.source.api_key.as_deref(), Some("file-key"));
        assert!(saved.demo_mode);
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "theme": "dark", "source": { "kind": "google", "scopes": ["a"] } }"#,
        )
        .unwrap();

        let mut config = load_without_env(dir.path());
        config.enable_demo_mode();
        config.source.spreadsheet_id = Some("sheet-1".into());
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["demoMode"], true);
        assert_eq!(value["source"]["spreadsheetId"], "sheet-1");
        assert_eq!(value["source"]["scopes"][0], "a");

        let reloaded = load_without_env(dir.path());
        assert!(reloaded.demo_mode);
        assert_eq!(reloaded.source.spreadsheet_id.as_deref(), Some("sheet-1"));
    }
}
