use std::sync::Arc;

use tracing::warn;

use super::kv::KeyValueStore;
use super::subject::{Subject, SubscriptionId};
use crate::meals::model::UserSettings;

pub const USER_SETTINGS_KEY: &str = "dietllm-user-settings";

pub struct UserSettingsStore {
    kv: Arc<dyn KeyValueStore>,
    settings: Subject<Option<UserSettings>>,
}

impl UserSettingsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        let initial = read_settings(kv.as_ref());
        Self {
            kv,
            settings: Subject::new(initial),
        }
    }

    pub fn get(&self) -> Option<UserSettings> {
        read_settings(self.kv.as_ref())
    }

    pub fn save(&self, settings: UserSettings) -> anyhow::Result<()> {
        self.kv
            .set(USER_SETTINGS_KEY, &serde_json::to_string(&settings)?)?;
        self.settings.publish(Some(settings));
        Ok(())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        self.kv.remove(USER_SETTINGS_KEY)?;
        self.settings.publish(None);
        Ok(())
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Option<UserSettings>) + Send + Sync + 'static,
    {
        self.settings.subscribe(listener)
    }
}

fn read_settings(kv: &dyn KeyValueStore) -> Option<UserSettings> {
    let saved = kv.get(USER_SETTINGS_KEY)?;
    match serde_json::from_str(&saved) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "saved user settings are unreadable; ignoring");
            None
        }
    }
}
