// The persisted settings record. Same shape the web build kept in local storage, so a record
// copied across still loads.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::{InstrumentRole, InstrumentState, RoleTable};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings aren't valid json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("settings rejected: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSetting {
    pub id: String,
    pub active: bool,
    pub volume: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub mood: String,
    pub tempo: f64,
    pub master_volume: f32,
    pub instruments: Vec<InstrumentSetting>,
    #[serde(default, alias = "lastSaved", skip_serializing_if = "Option::is_none")]
    pub last_saved_timestamp: Option<DateTime<Utc>>,
}

impl UserSettings {
    pub fn from_session(
        mood: &str,
        tempo: f64,
        master_volume: f32,
        instruments: &RoleTable<InstrumentState>,
    ) -> Self {
        Self {
            mood: mood.to_string(),
            tempo,
            master_volume,
            instruments: instruments
                .values()
                .map(|s| InstrumentSetting { id: s.role.id().to_string(), active: s.active, volume: s.volume })
                .collect(),
            last_saved_timestamp: None,
        }
    }

    /// Parses and validates. A record that fails either is rejected whole.
    pub fn parse(json: &str) -> Result<Self, SettingsError> {
        let settings: UserSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.tempo.is_finite() || self.tempo <= 0.0 {
            return Err(SettingsError::Invalid(format!("tempo {}", self.tempo)));
        }
        if !in_unit_range(self.master_volume) {
            return Err(SettingsError::Invalid(format!("master volume {}", self.master_volume)));
        }
        if let Some(bad) = self.instruments.iter().find(|i| !in_unit_range(i.volume)) {
            return Err(SettingsError::Invalid(format!("{} volume {}", bad.id, bad.volume)));
        }
        Ok(())
    }

    /// Overlays the saved instruments onto `instruments`. Unknown ids are skipped and roles
    /// missing from the record keep what they had.
    pub fn apply_instruments(&self, instruments: &mut RoleTable<InstrumentState>) {
        for saved in &self.instruments {
            let Some(role) = InstrumentRole::from_id(&saved.id) else {
                continue;
            };
            let slot = &mut instruments[role];
            slot.active = saved.active;
            slot.volume = saved.volume;
        }
    }
}

fn in_unit_range(v: f32) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}
