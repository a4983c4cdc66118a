/// User configuration record, its transitions and stored-value validation
use crate::clock::{self, iso_millis};
use crate::search::SearchEngineId;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

pub const KEY_THEME: &str = "theme";
pub const KEY_THEME_COLOR: &str = "themeColor";
pub const KEY_CHOOSE_ENGINE: &str = "chooseEngine";
pub const KEY_IS_DIRECT_LINK: &str = "isDirectLink";
pub const KEY_UPDATED_AT: &str = "updatedAt";

/// Flat key space shared by the extension store and the fast cache
pub const PERSISTED_KEYS: [&str; 5] = [
    KEY_THEME,
    KEY_THEME_COLOR,
    KEY_CHOOSE_ENGINE,
    KEY_IS_DIRECT_LINK,
    KEY_UPDATED_AT,
];

pub const DEFAULT_THEME_COLOR: &str = "#667eea";

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("hex color pattern"));

pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

/// The persisted user configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// false = light, true = dark
    pub theme: bool,
    pub theme_color: String,
    pub choose_engine: SearchEngineId,
    /// Open results in the current tab instead of a new one
    pub is_direct_link: bool,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

impl ConfigState {
    /// Defaults used when nothing has been persisted yet
    pub fn new(now: DateTime<Utc>) -> ConfigState {
        ConfigState {
            theme: false,
            theme_color: DEFAULT_THEME_COLOR.to_string(),
            choose_engine: SearchEngineId::Default,
            is_direct_link: false,
            updated_at: now,
        }
    }

    pub fn is_dark(&self) -> bool {
        self.theme
    }

    /// Apply one transition. Setters stamp `updated_at`; loads only merge.
    pub fn apply(&mut self, transition: Transition, now: DateTime<Utc>) {
        match transition {
            Transition::SetTheme(theme) => {
                self.theme = theme;
                self.touch(now);
            }
            Transition::SetChooseEngine(engine) => {
                self.choose_engine = engine;
                self.touch(now);
            }
            Transition::SetIsDirectLink(is_direct_link) => {
                self.is_direct_link = is_direct_link;
                self.touch(now);
            }
            Transition::SetThemeColor(color) => {
                self.theme_color = color;
                self.touch(now);
            }
            Transition::LoadConfig(patch) => patch.merge_into(self),
        }
    }

    // Never moves backwards within a session, even if the wall clock does.
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.updated_at);
    }

    /// The stored representation: one entry per persisted key
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert(KEY_THEME.to_string(), Value::Bool(self.theme));
        record.insert(KEY_THEME_COLOR.to_string(), Value::String(self.theme_color.clone()));
        record.insert(
            KEY_CHOOSE_ENGINE.to_string(),
            Value::String(self.choose_engine.key().to_string()),
        );
        record.insert(KEY_IS_DIRECT_LINK.to_string(), Value::Bool(self.is_direct_link));
        record.insert(
            KEY_UPDATED_AT.to_string(),
            Value::String(clock::to_iso_string(&self.updated_at)),
        );
        record
    }
}

/// A partial record merged by `Transition::LoadConfig`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choose_engine: Option<SearchEngineId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_direct_link: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }

    pub fn field_count(&self) -> usize {
        [
            self.theme.is_some(),
            self.theme_color.is_some(),
            self.choose_engine.is_some(),
            self.is_direct_link.is_some(),
            self.updated_at.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    fn merge_into(self, state: &mut ConfigState) {
        if let Some(theme) = self.theme {
            state.theme = theme;
        }
        if let Some(color) = self.theme_color {
            state.theme_color = color;
        }
        if let Some(engine) = self.choose_engine {
            state.choose_engine = engine;
        }
        if let Some(is_direct_link) = self.is_direct_link {
            state.is_direct_link = is_direct_link;
        }
        if let Some(updated_at) = self.updated_at {
            state.updated_at = updated_at;
        }
    }
}

/// The closed set of state changes
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    SetTheme(bool),
    SetChooseEngine(SearchEngineId),
    SetIsDirectLink(bool),
    SetThemeColor(String),
    /// Rehydration merge; never persisted
    LoadConfig(ConfigPatch),
}

impl Transition {
    /// Whether this transition is a user change that must be written back
    pub fn is_qualifying(&self) -> bool {
        !matches!(self, Transition::LoadConfig(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transition::SetTheme(_) => "config/setTheme",
            Transition::SetChooseEngine(_) => "config/setChooseEngine",
            Transition::SetIsDirectLink(_) => "config/setIsDirectLink",
            Transition::SetThemeColor(_) => "config/setThemeColor",
            Transition::LoadConfig(_) => "config/loadConfig",
        }
    }
}

/// Result of checking a stored record field by field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedRecord {
    /// Fields that survived, ready for `LoadConfig`
    pub patch: ConfigPatch,
    /// Replacement values for fields that were fixed up (bad timestamps)
    pub repaired: Map<String, Value>,
    /// Keys whose stored value was unusable and was dropped
    pub discarded: Vec<&'static str>,
}

/// Validate a stored record. Unknown keys are ignored, bad values discarded,
/// and an unparseable `updatedAt` is replaced with `now`. A parseable one in
/// another form (date only, epoch millis) is kept and rewritten canonically.
pub fn validate_record(record: &Map<String, Value>, now: DateTime<Utc>) -> ValidatedRecord {
    let mut result = ValidatedRecord::default();

    for key in PERSISTED_KEYS {
        let Some(value) = record.get(key) else {
            continue;
        };

        let accepted = match key {
            KEY_THEME => value.as_bool().map(|theme| result.patch.theme = Some(theme)),
            KEY_IS_DIRECT_LINK => value
                .as_bool()
                .map(|direct| result.patch.is_direct_link = Some(direct)),
            KEY_THEME_COLOR => value
                .as_str()
                .filter(|color| is_hex_color(color))
                .map(|color| result.patch.theme_color = Some(color.to_string())),
            KEY_CHOOSE_ENGINE => value
                .as_str()
                .and_then(SearchEngineId::from_key)
                .map(|engine| result.patch.choose_engine = Some(engine)),
            KEY_UPDATED_AT => {
                match clock::parse_stored(value) {
                    Some(updated_at) => {
                        result.patch.updated_at = Some(updated_at);
                        // Dates and epoch millis are rewritten in the stored format
                        let canonical = clock::to_iso_string(&updated_at);
                        if value.as_str() != Some(canonical.as_str()) {
                            result.repaired.insert(key.to_string(), Value::String(canonical));
                        }
                    }
                    None => {
                        log::warn!("Invalid stored {}: {}, resetting to now", key, value);
                        result.patch.updated_at = Some(now);
                        result
                            .repaired
                            .insert(key.to_string(), Value::String(clock::to_iso_string(&now)));
                    }
                }
                Some(())
            }
            _ => None,
        };

        if accepted.is_none() {
            log::warn!("Discarding malformed stored {}: {}", key, value);
            result.discarded.push(key);
        }
    }

    result
}
