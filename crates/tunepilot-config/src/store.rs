//! The configuration store.
//!
//! One settings document per provider, persisted as pretty JSON under
//! `base_path/providers/`. Mutations are serialized through a mutex and
//! follow a write-then-commit order: the new document is persisted to
//! disk first and only then swapped into memory, so a failed write
//! leaves the in-memory state untouched.
//!
//! Backups are full document copies named by timestamp under
//! `base_path/backups/{provider}/`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tunepilot_models::{BackupId, ConfigValue, Provider, SettingsSnapshot};
use tunepilot_persistence::{atomic_write_json, read_json, read_json_optional, PersistenceError};

use crate::error::{ConfigError, Result};
use crate::presets;
use crate::schema;

/// The persisted settings document for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub values: BTreeMap<String, ConfigValue>,
    /// Name of the last applied preset, cleared by any direct edit.
    pub active_preset: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProviderConfig {
    fn defaults() -> Self {
        Self {
            values: schema::default_settings(),
            active_preset: None,
            updated_at: Utc::now(),
        }
    }
}

/// A validation finding from [`ConfigStore::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub key: String,
    pub reason: String,
}

/// One section of the grouped settings view.
#[derive(Debug, Clone)]
pub struct SummarySection {
    pub name: &'static str,
    pub entries: Vec<(String, ConfigValue)>,
}

/// Stores and mutates per-provider settings.
pub struct ConfigStore {
    base_path: PathBuf,
    inner: Mutex<HashMap<Provider, ProviderConfig>>,
}

impl ConfigStore {
    /// Opens the store rooted at `base_path`, loading any persisted
    /// documents. Providers without a document on disk start from
    /// defaults.
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        let mut configs = HashMap::new();

        for provider in Provider::ALL {
            let path = provider_path(&base_path, provider);
            let config = match read_json_optional::<ProviderConfig>(&path)? {
                Some(config) => {
                    debug!(provider = %provider, path = %path.display(), "loaded provider config");
                    config
                }
                None => ProviderConfig::defaults(),
            };
            configs.insert(provider, config);
        }

        Ok(Self {
            base_path,
            inner: Mutex::new(configs),
        })
    }

    fn provider_path(&self, provider: Provider) -> PathBuf {
        provider_path(&self.base_path, provider)
    }

    fn backup_dir(&self, provider: Provider) -> PathBuf {
        self.base_path.join("backups").join(provider.as_str())
    }

    fn backup_path(&self, provider: Provider, id: &BackupId) -> PathBuf {
        self.backup_dir(provider).join(format!("{}.json", id))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Provider, ProviderConfig>>> {
        self.inner
            .lock()
            .map_err(|e| ConfigError::LockPoisoned(e.to_string()))
    }

    /// Reads a single setting.
    pub fn get(&self, provider: Provider, key: &str) -> Result<ConfigValue> {
        let spec = schema::spec_for(key).ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let configs = self.lock()?;
        let config = &configs[&provider];
        // Fall back to the default when a document predates the key.
        Ok(config
            .values
            .get(key)
            .cloned()
            .unwrap_or_else(|| spec.default.clone()))
    }

    /// Sets a single setting after validating it, returning the previous
    /// value. Clears the active preset marker.
    pub fn set(&self, provider: Provider, key: &str, value: ConfigValue) -> Result<ConfigValue> {
        let spec = schema::spec_for(key).ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        spec.rule.check(&value).map_err(|reason| ConfigError::Validation {
            key: key.to_string(),
            reason,
        })?;

        let mut configs = self.lock()?;
        let config = configs.get_mut(&provider).ok_or_else(|| {
            ConfigError::LockPoisoned("provider map missing entry".to_string())
        })?;

        let old = config
            .values
            .get(key)
            .cloned()
            .unwrap_or_else(|| spec.default.clone());

        let mut next = config.clone();
        next.values.insert(key.to_string(), value.clone());
        next.active_preset = None;
        next.updated_at = Utc::now();

        atomic_write_json(&self.provider_path(provider), &next)?;
        *config = next;

        info!(provider = %provider, key, old = %old, new = %value, "setting changed");
        Ok(old)
    }

    /// Parses raw user input against the key's expected type, then sets
    /// it. Returns the previous value.
    pub fn set_raw(&self, provider: Provider, key: &str, raw: &str) -> Result<ConfigValue> {
        let spec = schema::spec_for(key).ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let value = ConfigValue::parse_as(spec.rule.type_name(), raw).ok_or_else(|| {
            ConfigError::Validation {
                key: key.to_string(),
                reason: format!("expected {} value, got {:?}", spec.rule.type_name(), raw),
            }
        })?;
        self.set(provider, key, value)
    }

    /// Flips a boolean setting, returning the new value.
    pub fn toggle(&self, provider: Provider, key: &str) -> Result<bool> {
        let current = self.get(provider, key)?;
        let flipped = match current.as_bool() {
            Some(b) => !b,
            None => {
                return Err(ConfigError::Validation {
                    key: key.to_string(),
                    reason: format!("not a boolean setting ({})", current.type_name()),
                })
            }
        };
        self.set(provider, key, ConfigValue::Bool(flipped))?;
        Ok(flipped)
    }

    /// Applies a named preset as an overlay: keys the preset names are
    /// overwritten, everything else is kept. The whole overlay is
    /// applied as one atomic document swap.
    pub fn apply_preset(&self, provider: Provider, name: &str) -> Result<()> {
        let preset =
            presets::preset(name).ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))?;

        let mut configs = self.lock()?;
        let config = configs.get_mut(&provider).ok_or_else(|| {
            ConfigError::LockPoisoned("provider map missing entry".to_string())
        })?;

        let mut next = config.clone();
        for (key, value) in &preset.values {
            next.values.insert(key.clone(), value.clone());
        }
        next.active_preset = Some(preset.name.to_string());
        next.updated_at = Utc::now();

        atomic_write_json(&self.provider_path(provider), &next)?;
        *config = next;

        info!(provider = %provider, preset = preset.name, "preset applied");
        Ok(())
    }

    /// Resets a provider to schema defaults.
    pub fn reset(&self, provider: Provider) -> Result<()> {
        let mut configs = self.lock()?;
        let config = configs.get_mut(&provider).ok_or_else(|| {
            ConfigError::LockPoisoned("provider map missing entry".to_string())
        })?;

        let next = ProviderConfig::defaults();
        atomic_write_json(&self.provider_path(provider), &next)?;
        *config = next;

        info!(provider = %provider, "settings reset to defaults");
        Ok(())
    }

    /// Snapshots the current document into the backup directory.
    pub fn backup(&self, provider: Provider) -> Result<BackupId> {
        let configs = self.lock()?;
        let config = &configs[&provider];

        let id = BackupId::now();
        atomic_write_json(&self.backup_path(provider, &id), config)?;

        info!(provider = %provider, backup = %id, "configuration backed up");
        Ok(id)
    }

    /// Restores a provider from a named backup as one atomic swap.
    pub fn restore(&self, provider: Provider, id: &BackupId) -> Result<()> {
        let path = self.backup_path(provider, id);
        if !path.exists() {
            return Err(ConfigError::UnknownBackup(id.to_string()));
        }
        let mut restored: ProviderConfig = read_json(&path)?;
        restored.updated_at = Utc::now();

        let mut configs = self.lock()?;
        let config = configs.get_mut(&provider).ok_or_else(|| {
            ConfigError::LockPoisoned("provider map missing entry".to_string())
        })?;

        atomic_write_json(&self.provider_path(provider), &restored)?;
        *config = restored;

        info!(provider = %provider, backup = %id, "configuration restored");
        Ok(())
    }

    /// Lists available backups for a provider, newest first.
    pub fn list_backups(&self, provider: Provider) -> Result<Vec<BackupId>> {
        let dir = self.backup_dir(provider);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|source| PersistenceError::Read {
            path: dir.clone(),
            source,
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| PersistenceError::Read {
                path: dir.clone(),
                source,
            })?;
            let name = entry.file_name();
            let Some(stem) = Path::new(&name).file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match BackupId::parse(stem) {
                Some(id) => ids.push(id),
                None => {
                    warn!(file = %entry.path().display(), "skipping unrecognized backup file");
                }
            }
        }

        ids.sort();
        ids.reverse();
        Ok(ids)
    }

    /// Deletes backups beyond the newest `keep`, returning how many were
    /// removed.
    pub fn cleanup_backups(&self, provider: Provider, keep: usize) -> Result<usize> {
        let ids = self.list_backups(provider)?;
        let mut removed = 0;
        for id in ids.iter().skip(keep) {
            let path = self.backup_path(provider, id);
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove old backup");
            } else {
                removed += 1;
            }
        }
        if removed > 0 {
            info!(provider = %provider, removed, "old backups cleaned up");
        }
        Ok(removed)
    }

    /// Checks every stored key against its rule without modifying
    /// anything. Unknown stored keys are reported as drift.
    pub fn validate(&self, provider: Provider) -> Result<Vec<ValidationIssue>> {
        let configs = self.lock()?;
        let config = &configs[&provider];

        let mut issues = Vec::new();
        for (key, value) in &config.values {
            match schema::spec_for(key) {
                Some(spec) => {
                    if let Err(reason) = spec.rule.check(value) {
                        issues.push(ValidationIssue {
                            key: key.clone(),
                            reason,
                        });
                    }
                }
                None => issues.push(ValidationIssue {
                    key: key.clone(),
                    reason: "not a registered setting".to_string(),
                }),
            }
        }
        Ok(issues)
    }

    /// Freezes the provider's current settings for a new task. Keys the
    /// document is missing are filled from defaults.
    pub fn snapshot(&self, provider: Provider) -> Result<SettingsSnapshot> {
        let configs = self.lock()?;
        let config = &configs[&provider];

        let mut values = schema::default_settings();
        for (key, value) in &config.values {
            values.insert(key.clone(), value.clone());
        }
        Ok(SettingsSnapshot::new(values))
    }

    /// The name of the last applied preset, if no direct edit happened
    /// since.
    pub fn active_preset(&self, provider: Provider) -> Result<Option<String>> {
        let configs = self.lock()?;
        Ok(configs[&provider].active_preset.clone())
    }

    /// Grouped view of all settings for display.
    pub fn summary(&self, provider: Provider) -> Result<Vec<SummarySection>> {
        let configs = self.lock()?;
        let config = &configs[&provider];

        let mut sections: Vec<SummarySection> = schema::sections()
            .into_iter()
            .map(|name| SummarySection {
                name,
                entries: Vec::new(),
            })
            .collect();

        for spec in schema::registry() {
            let value = config
                .values
                .get(spec.key)
                .cloned()
                .unwrap_or_else(|| spec.default.clone());
            if let Some(section) = sections.iter_mut().find(|s| s.name == spec.section) {
                section.entries.push((spec.key.to_string(), value));
            }
        }
        Ok(sections)
    }
}

fn provider_path(base: &Path, provider: Provider) -> PathBuf {
    base.join("providers")
        .join(format!("{}.json", provider.as_str()))
}
