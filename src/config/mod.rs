use crate::models::AppConfig;
use crate::services::ConverterCommand;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "SLP2MP4_CONFIG";

/// File name of the settings file
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Configuration manager for loading and saving the JSON settings file.
///
/// The file belongs to the slp2mp4 converter; this shell only edits the keys
/// shown in the settings window and writes everything else back as it found it.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager for the given settings file
    ///
    /// The file does not need to exist yet.
    pub fn new<P: AsRef<Utf8Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Load the settings file.
    ///
    /// # Returns
    /// The loaded AppConfig, or an empty one if the file doesn't exist
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                self.config_path
            );
            return Ok(AppConfig::default());
        }

        let file_contents = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: AppConfig = serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!("Loaded config from {}", self.config_path);
        Ok(config)
    }

    /// Save the settings file, replacing its previous contents.
    ///
    /// # Arguments
    /// * `config` - The AppConfig to save
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        let json_string =
            serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")?;

        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {}", parent))?;
            }
        }

        fs::write(&self.config_path, json_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Get the settings file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}

/// Where the converter and its settings file live
///
/// A packaged build ships the converter executable next to the GUI binary
/// with `config.json` beside it. A development checkout runs the converter's
/// Python entry point from the `slp2mp4/` directory under the working
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLayout {
    pub packaged: bool,
    pub config_path: Utf8PathBuf,
    pub converter: ConverterCommand,
}

impl ResourceLayout {
    /// Detect the layout from the executable's directory and the working directory
    pub fn detect(exe_dir: &Utf8Path, working_dir: &Utf8Path) -> Self {
        let bundled = ["slp2mp4", "slp2mp4.exe"]
            .iter()
            .map(|name| exe_dir.join(name))
            .find(|candidate| candidate.is_file());

        match bundled {
            Some(converter) => Self {
                packaged: true,
                config_path: exe_dir.join(CONFIG_FILE_NAME),
                converter: ConverterCommand::new(converter.as_str()),
            },
            None => {
                let source_dir = working_dir.join("slp2mp4");
                Self {
                    packaged: false,
                    config_path: source_dir.join("data").join(CONFIG_FILE_NAME),
                    converter: ConverterCommand::script(
                        "python",
                        source_dir.join("slp2mp4.py").as_str(),
                    ),
                }
            }
        }
    }

    /// Detect the layout for the running process
    ///
    /// `SLP2MP4_CONFIG`, when set, replaces the detected config path.
    pub fn from_environment() -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate the running executable")?;
        let exe = Utf8PathBuf::try_from(exe).context("Executable path is not valid UTF-8")?;
        let exe_dir = exe
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        let working_dir = std::env::current_dir().context("Failed to read working directory")?;
        let working_dir =
            Utf8PathBuf::try_from(working_dir).context("Working directory is not valid UTF-8")?;

        let mut layout = Self::detect(&exe_dir, &working_dir);

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                tracing::info!("Using config path from {}: {}", CONFIG_PATH_ENV, path);
                layout.config_path = Utf8PathBuf::from(path);
            }
        }

        tracing::info!(
            "Resource layout: packaged={}, config={}, converter={}",
            layout.packaged,
            layout.config_path,
            layout.converter.program()
        );

        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(dir.join("data").join(CONFIG_FILE_NAME));
        (manager, temp_dir)
    }

    #[test]
    fn test_missing_config_loads_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert_eq!(manager.load_config().unwrap(), AppConfig::default());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let (manager, _temp_dir) = create_test_config_manager();

        let config = AppConfig {
            ffmpeg: Some("/usr/bin/ffmpeg".to_string()),
            ..AppConfig::default()
        };
        manager.save_config(&config).unwrap();

        assert!(manager.config_path().exists());
        assert_eq!(manager.load_config().unwrap(), config);
    }

    #[test]
    fn test_saved_json_uses_two_space_indent() {
        let (manager, _temp_dir) = create_test_config_manager();

        let config = AppConfig {
            combine: Some(true),
            ..AppConfig::default()
        };
        manager.save_config(&config).unwrap();

        let text = fs::read_to_string(manager.config_path()).unwrap();
        assert_eq!(text, "{\n  \"combine\": true\n}");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::create_dir_all(manager.config_path().parent().unwrap()).unwrap();
        fs::write(manager.config_path(), "{ not json").unwrap();

        assert!(manager.load_config().is_err());
    }

    #[test]
    fn test_detect_development_layout() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

        let layout = ResourceLayout::detect(&root.join("bin"), &root);

        assert!(!layout.packaged);
        assert_eq!(layout.config_path, root.join("slp2mp4/data/config.json"));
        assert_eq!(layout.converter.program(), "python");
        assert_eq!(
            layout.converter.leading_args(),
            [root.join("slp2mp4").join("slp2mp4.py").to_string()]
        );
    }

    #[test]
    fn test_detect_packaged_layout() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        fs::write(root.join("slp2mp4"), "").unwrap();

        let layout = ResourceLayout::detect(&root, Utf8Path::new("/elsewhere"));

        assert!(layout.packaged);
        assert_eq!(layout.config_path, root.join("config.json"));
        assert_eq!(layout.converter.program(), root.join("slp2mp4").as_str());
        assert!(layout.converter.leading_args().is_empty());
    }
}
