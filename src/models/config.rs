use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Default video resolution shown when `resolution` is absent
pub const DEFAULT_RESOLUTION: &str = "1080p";

/// Default Dolphin video backend shown when `video_backend` is absent
pub const DEFAULT_VIDEO_BACKEND: &str = "OGL";

/// Default encoder bitrate shown when `bitrateKbps` is absent
pub const DEFAULT_BITRATE_KBPS: u32 = 16000;

/// Default parallelism policy shown when `parallel_games` is absent
pub const DEFAULT_PARALLEL_GAMES: &str = "recommended";

/// Converter settings from `config.json`
///
/// The file is shared with the slp2mp4 converter, so every key is optional and
/// absent keys stay absent when the config is written back. Keys this shell
/// does not know about are kept in `extra` in their original order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub melee_iso: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dolphin_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_backend: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widescreen: Option<bool>,

    /// `None` when the key is absent, `Some(None)` when it is `null`
    #[serde(
        rename = "bitrateKbps",
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub bitrate_kbps: Option<Option<u32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_games: Option<ParallelGames>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_short: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combine: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_slps: Option<bool>,

    /// Keys owned by the converter that the settings window does not edit
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// Deserialize a present key, keeping an explicit `null` as `Some(None)`
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// How many games the converter records at once
///
/// Either an explicit count or a named policy such as `"recommended"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParallelGames {
    Count(u32),
    Policy(String),
}

impl ParallelGames {
    /// Parse the text of the settings field
    ///
    /// Whole numbers become [`ParallelGames::Count`]; anything else is kept as a
    /// policy name.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.parse::<u32>() {
            Ok(count) => Self::Count(count),
            Err(_) => Self::Policy(text.to_string()),
        }
    }
}

impl fmt::Display for ParallelGames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(count) => write!(f, "{}", count),
            Self::Policy(name) => f.write_str(name),
        }
    }
}

/// The settings window's view of [`AppConfig`]
///
/// Defaults for absent keys are applied here, by the consumer, never in the
/// stored file. Empty strings, a zero bitrate and an empty policy fall back to
/// their defaults as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    pub melee_iso: String,
    pub dolphin_dir: String,
    pub ffmpeg: String,
    pub resolution: String,
    pub video_backend: String,
    pub widescreen: bool,
    /// Raw text of the bitrate field
    pub bitrate_kbps: String,
    pub parallel_games: String,
    pub remove_short: bool,
    pub combine: bool,
    pub remove_slps: bool,
}

impl Default for SettingsForm {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl SettingsForm {
    /// Populate the form from a loaded config
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            melee_iso: non_empty_or(&config.melee_iso, ""),
            dolphin_dir: non_empty_or(&config.dolphin_dir, ""),
            ffmpeg: non_empty_or(&config.ffmpeg, ""),
            resolution: non_empty_or(&config.resolution, DEFAULT_RESOLUTION),
            video_backend: non_empty_or(&config.video_backend, DEFAULT_VIDEO_BACKEND),
            widescreen: config.widescreen.unwrap_or(false),
            bitrate_kbps: config
                .bitrate_kbps
                .flatten()
                .filter(|kbps| *kbps != 0)
                .unwrap_or(DEFAULT_BITRATE_KBPS)
                .to_string(),
            parallel_games: config
                .parallel_games
                .as_ref()
                .map(ParallelGames::to_string)
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| DEFAULT_PARALLEL_GAMES.to_string()),
            remove_short: config.remove_short.unwrap_or(false),
            combine: config.combine.unwrap_or(false),
            remove_slps: config.remove_slps.unwrap_or(false),
        }
    }

    /// Build the config to save
    ///
    /// Every key edited by the form is written. Converter-owned keys are carried
    /// over from `base`. A bitrate that is not a whole number is stored as `null`.
    pub fn into_config(self, base: &AppConfig) -> AppConfig {
        AppConfig {
            melee_iso: Some(self.melee_iso),
            dolphin_dir: Some(self.dolphin_dir),
            ffmpeg: Some(self.ffmpeg),
            resolution: Some(self.resolution),
            video_backend: Some(self.video_backend),
            widescreen: Some(self.widescreen),
            bitrate_kbps: Some(self.bitrate_kbps.trim().parse().ok()),
            parallel_games: Some(ParallelGames::parse(&self.parallel_games)),
            remove_short: Some(self.remove_short),
            combine: Some(self.combine),
            remove_slps: Some(self.remove_slps),
            extra: base.extra.clone(),
        }
    }
}

fn non_empty_or(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .filter(|text| !text.is_empty())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_form_defaults() {
        let form = SettingsForm::default();
        assert_eq!(form.melee_iso, "");
        assert_eq!(form.resolution, "1080p");
        assert_eq!(form.video_backend, "OGL");
        assert_eq!(form.bitrate_kbps, "16000");
        assert_eq!(form.parallel_games, "recommended");
        assert!(!form.widescreen);
        assert!(!form.remove_slps);
    }

    #[test]
    fn test_zero_bitrate_and_empty_strings_fall_back() {
        let config = AppConfig {
            resolution: Some(String::new()),
            bitrate_kbps: Some(Some(0)),
            ..AppConfig::default()
        };

        let form = SettingsForm::from_config(&config);
        assert_eq!(form.resolution, "1080p");
        assert_eq!(form.bitrate_kbps, "16000");
    }

    #[test]
    fn test_invalid_bitrate_saved_as_null() {
        let form = SettingsForm {
            bitrate_kbps: "fast".to_string(),
            ..SettingsForm::default()
        };

        let config = form.into_config(&AppConfig::default());
        assert_eq!(config.bitrate_kbps, Some(None));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json.get("bitrateKbps"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_absent_and_null_bitrate_differ() {
        let absent: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.bitrate_kbps, None);
        assert!(serde_json::to_value(&absent).unwrap().get("bitrateKbps").is_none());

        let null: AppConfig = serde_json::from_str(r#"{"bitrateKbps": null}"#).unwrap();
        assert_eq!(null.bitrate_kbps, Some(None));
        assert_eq!(
            serde_json::to_value(&null).unwrap().get("bitrateKbps"),
            Some(&serde_json::Value::Null)
        );
    }

    #[test]
    fn test_form_writes_every_key() {
        let config = SettingsForm::default().into_config(&AppConfig::default());
        let json = serde_json::to_value(&config).unwrap();
        let object = json.as_object().unwrap();

        for key in [
            "melee_iso",
            "dolphin_dir",
            "ffmpeg",
            "resolution",
            "video_backend",
            "widescreen",
            "bitrateKbps",
            "parallel_games",
            "remove_short",
            "combine",
            "remove_slps",
        ] {
            assert!(object.contains_key(key), "missing key {}", key);
        }
    }

    #[test]
    fn test_parallel_games_parse() {
        assert_eq!(ParallelGames::parse("4"), ParallelGames::Count(4));
        assert_eq!(
            ParallelGames::parse(" recommended "),
            ParallelGames::Policy("recommended".to_string())
        );
    }

    #[test]
    fn test_parallel_games_accepts_number_or_string() {
        let config: AppConfig =
            serde_json::from_str(r#"{"parallel_games": 2, "bitrateKbps": null}"#).unwrap();
        assert_eq!(config.parallel_games, Some(ParallelGames::Count(2)));
        assert_eq!(config.bitrate_kbps, Some(None));

        let config: AppConfig = serde_json::from_str(r#"{"parallel_games": "recommended"}"#).unwrap();
        assert_eq!(
            config.parallel_games,
            Some(ParallelGames::Policy("recommended".to_string()))
        );
    }

    #[test]
    fn test_unknown_keys_preserved_on_save() {
        let config: AppConfig =
            serde_json::from_str(r#"{"ffmpeg": "ffmpeg", "youtube_client": "secret.json"}"#)
                .unwrap();
        assert_eq!(
            config.extra.get("youtube_client"),
            Some(&serde_json::Value::from("secret.json"))
        );

        let saved = SettingsForm::from_config(&config).into_config(&config);
        assert_eq!(saved.extra, config.extra);
    }
}
