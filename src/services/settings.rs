//! Operator console preferences.
//!
//! Loaded once at startup from a JSON file, held behind a shared handle and
//! written back after every change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServiceError;

pub const IMPORT_FAILED_MESSAGE: &str = "Failed to import settings. Please check the file format.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub emergency_alerts: bool,
    pub bed_updates: bool,
    pub system_maintenance: bool,
    pub weekly_reports: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            emergency_alerts: true,
            bed_updates: true,
            system_maintenance: false,
            weekly_reports: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemSettings {
    pub auto_refresh: bool,
    /// Seconds between console refreshes.
    #[validate(range(min = 5, max = 3600))]
    pub refresh_interval: u32,
    pub dark_mode: bool,
    pub sound_alerts: bool,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            refresh_interval: 30,
            dark_mode: false,
            sound_alerts: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleSettings {
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub system_settings: SystemSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_api_key: Option<String>,
}

/// What the console shows; the key itself never leaves the server.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub notifications: NotificationSettings,
    pub system_settings: SystemSettings,
    pub ai_api_key_configured: bool,
}

impl From<&ConsoleSettings> for SettingsView {
    fn from(settings: &ConsoleSettings) -> Self {
        Self {
            notifications: settings.notifications,
            system_settings: settings.system_settings,
            ai_api_key_configured: settings.ai_api_key.is_some(),
        }
    }
}

/// Portable settings file. Carries no API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsExport {
    pub notifications: NotificationSettings,
    pub system_settings: SystemSettings,
    pub export_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsImport {
    notifications: Option<NotificationSettings>,
    system_settings: Option<SystemSettings>,
}

#[derive(Clone)]
pub struct SettingsStore {
    path: Arc<PathBuf>,
    state: Arc<RwLock<ConsoleSettings>>,
}

impl SettingsStore {
    /// Reads the settings file; a missing file yields defaults.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref().to_path_buf();
        let settings = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<ConsoleSettings>(&bytes).map_err(|e| {
                error!(path = %path.display(), "Settings file is not valid JSON: {}", e);
                ServiceError::SerializationError(format!(
                    "Invalid settings file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No settings file, using defaults");
                ConsoleSettings::default()
            }
            Err(e) => {
                return Err(ServiceError::InternalError(format!(
                    "Cannot read settings file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Self {
            path: Arc::new(path),
            state: Arc::new(RwLock::new(settings)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn current(&self) -> ConsoleSettings {
        self.state.read().await.clone()
    }

    pub async fn view(&self) -> SettingsView {
        SettingsView::from(&*self.state.read().await)
    }

    pub async fn api_key(&self) -> Option<String> {
        self.state.read().await.ai_api_key.clone()
    }

    /// Applies `change` and writes the result while holding the lock, so
    /// concurrent edits reach the file in order.
    async fn modify<F>(&self, change: F) -> Result<ConsoleSettings, ServiceError>
    where
        F: FnOnce(&mut ConsoleSettings),
    {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        change(&mut next);
        self.persist(&next).await?;
        *guard = next.clone();
        Ok(next)
    }

    async fn persist(&self, settings: &ConsoleSettings) -> Result<(), ServiceError> {
        let bytes = serde_json::to_vec_pretty(settings)?;
        let tmp = self.path.with_extension("json.tmp");
        let write = async {
            tokio::fs::write(&tmp, &bytes).await?;
            tokio::fs::rename(&tmp, self.path.as_ref()).await
        };
        write.await.map_err(|e| {
            error!(path = %self.path.display(), "Failed to persist settings: {}", e);
            ServiceError::InternalError(format!("Failed to save settings: {}", e))
        })
    }

    #[instrument(skip(self))]
    pub async fn update_notifications(
        &self,
        notifications: NotificationSettings,
    ) -> Result<SettingsView, ServiceError> {
        let saved = self.modify(|s| s.notifications = notifications).await?;
        info!("Notification settings saved");
        Ok(SettingsView::from(&saved))
    }

    #[instrument(skip(self))]
    pub async fn update_system(&self, system: SystemSettings) -> Result<SettingsView, ServiceError> {
        system.validate()?;
        let saved = self.modify(|s| s.system_settings = system).await?;
        info!("System settings saved");
        Ok(SettingsView::from(&saved))
    }

    #[instrument(skip(self, key))]
    pub async fn set_api_key(&self, key: &str) -> Result<SettingsView, ServiceError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ServiceError::ValidationError("API key must not be blank".to_string()));
        }
        let key = key.to_string();
        let saved = self.modify(|s| s.ai_api_key = Some(key)).await?;
        info!("AI API key saved");
        Ok(SettingsView::from(&saved))
    }

    /// Resets everything to defaults, API key included.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<SettingsView, ServiceError> {
        let saved = self.modify(|s| *s = ConsoleSettings::default()).await?;
        warn!("Console settings cleared");
        Ok(SettingsView::from(&saved))
    }

    pub async fn export_document(&self) -> SettingsExport {
        let settings = self.state.read().await;
        SettingsExport {
            notifications: settings.notifications,
            system_settings: settings.system_settings,
            export_date: Utc::now(),
        }
    }

    /// Applies each section present in `document`; absent sections stay as they are.
    #[instrument(skip(self, document), fields(len = document.len()))]
    pub async fn import_document(&self, document: &[u8]) -> Result<SettingsView, ServiceError> {
        let import: SettingsImport = serde_json::from_slice(document).map_err(|e| {
            warn!("Rejected settings import: {}", e);
            ServiceError::ValidationError(IMPORT_FAILED_MESSAGE.to_string())
        })?;
        if let Some(system) = &import.system_settings {
            system.validate().map_err(|e| {
                warn!("Rejected settings import: {}", e);
                ServiceError::ValidationError(IMPORT_FAILED_MESSAGE.to_string())
            })?;
        }

        let saved = self
            .modify(|s| {
                if let Some(notifications) = import.notifications {
                    s.notifications = notifications;
                }
                if let Some(system) = import.system_settings {
                    s.system_settings = system;
                }
            })
            .await?;
        info!("Settings imported");
        Ok(SettingsView::from(&saved))
    }
}
