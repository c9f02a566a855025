use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Storage key under which the whole settings blob is persisted.
pub const SETTINGS_STORAGE_KEY: &str = "fiscus.settings";

const DEFAULTS: [(&str, bool); 8] = [
    ("push_notifications", true),
    ("email_notifications", true),
    ("sms_notifications", false),
    ("transaction_alerts", true),
    ("security_alerts", true),
    ("marketing_emails", false),
    ("low_balance_alerts", true),
    ("card_activity", true),
];

/// Flat map of preference name to on/off.
///
/// Serialized as a plain JSON object. Keys not in the defaults are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, bool>);

impl Settings {
    pub fn defaults() -> Self {
        Self(
            DEFAULTS
                .iter()
                .map(|(key, value)| (key.to_string(), *value))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        self.0.get(key).copied()
    }

    /// Set a preference, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: bool) -> Option<bool> {
        self.0.insert(key.into(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl FromIterator<(String, bool)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
