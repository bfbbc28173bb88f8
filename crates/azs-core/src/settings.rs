//! Feature flags, the settings-change message and the store/channel seams.
//!
//! The page agent never persists anything itself. It resolves a complete
//! [`FeatureFlags`] set from whatever the store returns and then only mutates
//! its in-memory copy from inbound [`Message`]s.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::error::{ChannelError, MessageError, StoreError};

// =============================================================================
// Features
// =============================================================================

/// A user-toggleable protection. Keys match the persisted storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
pub enum Feature {
    /// Scroll gating and Shorts suppression on YouTube.
    #[serde(rename = "youtube")]
    YouTube,
    /// Hide the YouTube home feed grid entirely.
    #[serde(rename = "youtube-feed-hidden")]
    YouTubeFeedHidden,
    /// Scroll gating and Reels/Explore suppression on Instagram.
    #[serde(rename = "instagram")]
    Instagram,
    /// Timeline scroll gating on X.
    #[serde(rename = "x")]
    X,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::YouTube,
        Feature::YouTubeFeedHidden,
        Feature::Instagram,
        Feature::X,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Feature::YouTube => "youtube",
            Feature::YouTubeFeedHidden => "youtube-feed-hidden",
            Feature::Instagram => "instagram",
            Feature::X => "x",
        }
    }

    pub fn from_key(key: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.key() == key)
    }

    pub const fn default_value(self) -> bool {
        match self {
            Feature::YouTubeFeedHidden => false,
            Feature::YouTube | Feature::Instagram | Feature::X => true,
        }
    }

    /// Every flag guards the user against the feed, so switching any of them
    /// off goes through the verification challenge.
    pub const fn is_protection(self) -> bool {
        true
    }

    const fn index(self) -> usize {
        self as usize
    }
}

// =============================================================================
// Flag Set
// =============================================================================

/// Complete flag set. Every feature always resolves to a bool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    values: [bool; Feature::ALL.len()],
}

impl Default for FeatureFlags {
    fn default() -> Self {
        let mut values = [false; Feature::ALL.len()];
        for feature in Feature::ALL {
            values[feature.index()] = feature.default_value();
        }
        Self { values }
    }
}

impl FeatureFlags {
    #[inline]
    pub fn get(&self, feature: Feature) -> bool {
        self.values[feature.index()]
    }

    /// Returns the previous value.
    #[inline]
    pub fn set(&mut self, feature: Feature, value: bool) -> bool {
        std::mem::replace(&mut self.values[feature.index()], value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, bool)> + '_ {
        Feature::ALL.into_iter().map(|f| (f, self.get(f)))
    }

    /// Merge a stored object over the default table.
    ///
    /// Unknown keys and non-boolean values are ignored.
    pub fn from_stored(stored: &Map<String, Value>) -> Self {
        let mut flags = Self::default();
        for (key, value) in stored {
            let Some(feature) = Feature::from_key(key) else {
                log::warn!("ignoring unknown stored setting {key:?}");
                continue;
            };
            match value.as_bool() {
                Some(v) => {
                    flags.set(feature, v);
                }
                None => log::warn!("ignoring non-boolean value for {key:?}: {value}"),
            }
        }
        flags
    }

    /// Resolve a store read into a flag set, falling back to defaults.
    pub fn resolve(result: Result<Map<String, Value>, StoreError>) -> Self {
        match result {
            Ok(stored) => Self::from_stored(&stored),
            Err(e) => {
                log::warn!("settings unavailable, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// The flag set as a storage object (also the `get` defaults argument).
    pub fn to_stored(&self) -> Map<String, Value> {
        self.iter()
            .map(|(f, v)| (f.key().to_string(), Value::Bool(v)))
            .collect()
    }

    /// Features whose value differs between `self` and `other`.
    pub fn diff<'a>(&'a self, other: &'a FeatureFlags) -> impl Iterator<Item = Feature> + 'a {
        Feature::ALL
            .into_iter()
            .filter(move |f| self.get(*f) != other.get(*f))
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Notification sent from the popup to the active page agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "SETTING_CHANGED")]
    SettingChanged { feature: String, value: bool },
}

impl Message {
    pub fn setting_changed(feature: Feature, value: bool) -> Self {
        Message::SettingChanged {
            feature: feature.key().to_string(),
            value,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Value {
        match self {
            Message::SettingChanged { feature, value } => serde_json::json!({
                "type": "SETTING_CHANGED",
                "feature": feature,
                "value": value,
            }),
        }
    }

    /// The recognised feature this message changes.
    pub fn feature(&self) -> Result<(Feature, bool), MessageError> {
        match self {
            Message::SettingChanged { feature, value } => Feature::from_key(feature)
                .map(|f| (f, *value))
                .ok_or_else(|| MessageError::UnknownFeature(feature.clone())),
        }
    }
}

// =============================================================================
// External collaborators
// =============================================================================

/// Persisted key-value store (browser sync storage in production).
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    /// Read every stored key. Missing keys are filled in by the caller.
    async fn load(&self) -> Result<Map<String, Value>, StoreError>;
    async fn save(&self, feature: Feature, value: bool) -> Result<(), StoreError>;
    async fn save_all(&self, flags: &FeatureFlags) -> Result<(), StoreError>;
}

/// Best-effort popup → page notification channel.
#[allow(async_fn_in_trait)]
pub trait NotifyChannel {
    async fn send(&self, message: &Message) -> Result<(), ChannelError>;
}

/// Load the flag set. Never fails; store errors resolve to the defaults.
pub async fn load_flags<S: SettingsStore>(store: &S) -> FeatureFlags {
    FeatureFlags::resolve(store.load().await)
}
