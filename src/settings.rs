use log::info;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::{RelicError, Result};

/// Application settings: one record covering the tracking API, the local
/// model endpoint, and generation preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub jira_org_url: String,
    pub jira_auth_user_email: String,
    pub jira_api_key: String,
    pub llama_api_url: String,
    pub llama_model: String,
    #[serde(default)]
    pub preferred_project: String,
    #[serde(default)]
    pub preferred_users: Vec<String>,
}

impl Settings {
    /// Validate the fields required before anything can talk to the
    /// tracking API.
    pub fn validate(&self) -> Result<()> {
        if self.jira_org_url.trim().is_empty() {
            return Err(RelicError::Validation(
                "The JIRA organization URL is required.".to_string(),
            ));
        }
        if self.jira_api_key.trim().is_empty() {
            return Err(RelicError::Validation(
                "The JIRA API key is required.".to_string(),
            ));
        }
        if !self.jira_org_url.starts_with("https://") && !self.jira_org_url.starts_with("http://") {
            return Err(RelicError::Validation(
                "The JIRA organization URL must start with http:// or https://.".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("RELIC_JIRA_ORG_URL") {
            self.jira_org_url = url;
        }
        if let Ok(email) = env::var("RELIC_JIRA_AUTH_USER_EMAIL") {
            self.jira_auth_user_email = email;
        }
        if let Ok(key) = env::var("RELIC_JIRA_API_KEY") {
            self.jira_api_key = key;
        }
        if let Ok(url) = env::var("RELIC_LLAMA_API_URL") {
            self.llama_api_url = url;
        }
        if let Ok(model) = env::var("RELIC_LLAMA_MODEL") {
            self.llama_model = model;
        }
    }

    fn is_configured(&self) -> bool {
        !self.jira_org_url.trim().is_empty() || !self.jira_api_key.trim().is_empty()
    }

    /// Placeholder settings written by `relic config init`.
    pub fn sample() -> Self {
        Self {
            jira_org_url: "https://your-domain.atlassian.net".to_string(),
            jira_auth_user_email: "you@example.com".to_string(),
            jira_api_key: "your-api-token".to_string(),
            llama_api_url: "http://localhost:11434".to_string(),
            llama_model: "llama3".to_string(),
            preferred_project: String::new(),
            preferred_users: Vec::new(),
        }
    }

    /// Set a settings value by key, as exposed by `relic config set`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "jira.org_url" => self.jira_org_url = value.to_string(),
            "jira.email" => self.jira_auth_user_email = value.to_string(),
            "jira.api_key" => self.jira_api_key = value.to_string(),
            "llama.api_url" => self.llama_api_url = value.to_string(),
            "llama.model" => self.llama_model = value.to_string(),
            "preferred.project" => self.preferred_project = value.to_string(),
            "preferred.users" => {
                self.preferred_users = if value.trim().is_empty() {
                    Vec::new()
                } else {
                    value.split(',').map(|user| user.trim().to_string()).collect()
                };
            }
            _ => {
                return Err(RelicError::Validation(format!(
                    "Unknown configuration key: {}. Available keys: {}",
                    key,
                    Self::available_keys().join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "jira.org_url",
            "jira.email",
            "jira.api_key",
            "llama.api_url",
            "llama.model",
            "preferred.project",
            "preferred.users",
        ]
    }

    /// Settings summary for display, without the API key.
    pub fn summary(&self) -> String {
        format!(
            "JIRA org URL: {}\nJIRA auth email: {}\nJIRA API key: {}\nLLAMA API URL: {}\n\
             LLAMA model: {}\nPreferred project: {}\nPreferred users: {}",
            self.jira_org_url,
            self.jira_auth_user_email,
            if self.jira_api_key.is_empty() { "(not set)" } else { "(set)" },
            self.llama_api_url,
            self.llama_model,
            self.preferred_project,
            self.preferred_users.join(", ")
        )
    }
}

/// Single-row settings store backed by a TOML file, with an in-process
/// cache and an explicit invalidation hook.
pub struct SettingsStore {
    path: PathBuf,
    cached: RwLock<Option<Settings>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::with_path(Self::default_path())
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            cached: RwLock::new(None),
        }
    }

    /// Settings file lives at ~/.config/relic/config.toml consistently
    /// across platforms.
    fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("relic");
        path.push("config.toml");
        path
    }

    /// Return the current settings, loading them on first access.
    ///
    /// Fails with an actionable message when no settings have been saved
    /// and nothing is provided through the environment.
    pub fn get(&self) -> Result<Settings> {
        if let Some(settings) = self.cached.read().unwrap_or_else(|e| e.into_inner()).clone() {
            return Ok(settings);
        }

        let mut settings = self.load_from_file()?.unwrap_or_default();
        settings.apply_env_overrides();

        if !settings.is_configured() {
            return Err(RelicError::ConfigurationMissing(
                "Settings not found. Run `relic config init` and fill in the JIRA organization \
                 URL, user email and API key."
                    .to_string(),
            ));
        }

        *self.cached.write().unwrap_or_else(|e| e.into_inner()) = Some(settings.clone());
        Ok(settings)
    }

    /// Drop the cached settings so the next read hits the file again.
    pub fn invalidate(&self) {
        *self.cached.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Validate and persist the settings, refreshing the cache.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RelicError::upstream("create settings directory", e))?;
        }

        let contents = toml::to_string_pretty(settings)
            .map_err(|e| RelicError::upstream("serialize settings", e))?;
        fs::write(&self.path, contents).map_err(|e| RelicError::upstream("write settings", e))?;

        info!("Settings saved to {}", self.path.display());
        *self.cached.write().unwrap_or_else(|e| e.into_inner()) = Some(settings.clone());
        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn load_from_file(&self) -> Result<Option<Settings>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents =
            fs::read_to_string(&self.path).map_err(|e| RelicError::upstream("read settings", e))?;
        let settings = toml::from_str(&contents)
            .map_err(|e| RelicError::upstream("parse settings file", e))?;
        Ok(Some(settings))
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}
