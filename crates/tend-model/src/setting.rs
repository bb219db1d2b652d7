use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Names of the settings the agent reconciles.
///
/// The string form is what the settings store and change notifications carry;
/// it round-trips through [`FromStr`] / [`fmt::Display`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub enum SettingName {
    /// Boolean flag controlling whether the remote upgrade check runs.
    UpgradeChecker,
    /// Cached version string produced by the last successful upgrade check.
    LatestVersion,
}

impl SettingName {
    /// Get the canonical string form of the name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SettingName::UpgradeChecker => "upgrade-checker",
            SettingName::LatestVersion => "latest-version",
        }
    }
}

impl fmt::Display for SettingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upgrade-checker" => Ok(SettingName::UpgradeChecker),
            "latest-version" => Ok(SettingName::LatestVersion),
            other => Err(ModelError::UnknownSetting(other.to_string())),
        }
    }
}

impl TryFrom<String> for SettingName {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SettingName> for String {
    fn from(name: SettingName) -> Self {
        name.as_str().to_string()
    }
}

/// A single named configuration entry.
///
/// `value` is an opaque string interpreted contextually: as a boolean flag
/// (see [`Setting::as_bool`]) or as a cached version string. Settings are
/// last-writer-wins; the store applies no versioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub name: SettingName,
    pub value: String,
}

impl Setting {
    /// Create a new setting.
    pub fn new<V>(name: SettingName, value: V) -> Self
    where
        V: Into<String>,
    {
        Self {
            name,
            value: value.into(),
        }
    }

    /// Interpret the value as a boolean flag.
    ///
    /// Accepts `true`/`false` in any case; anything else is an error.
    pub fn as_bool(&self) -> ModelResult<bool> {
        if self.value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if self.value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ModelError::InvalidBool {
                name: self.name.to_string(),
                value: self.value.clone(),
            })
        }
    }
}
