//! Application Configuration
//!
//! User settings stored in TOML format under the platform config directory.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vision::OcrBackend;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// OCR settings
    pub ocr: OcrSettings,
    /// Capture settings
    pub capture: CaptureSettings,
    /// Troubleshooting settings
    pub debug: DebugSettings,
}

/// OCR-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSettings {
    /// Recognizer backend
    pub backend: OcrBackend,
    /// Directory holding `<language>.traineddata`
    pub tessdata_dir: PathBuf,
    /// Language model trained on the breach screen font
    pub language: String,
    /// Worker pool size (pooled backend only)
    pub workers: usize,
    /// Downscale high-resolution captures before recognition
    pub downscale: bool,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            backend: OcrBackend::default(),
            tessdata_dir: PathBuf::from("tessdata"),
            language: "breach".to_string(),
            workers: crate::vision::OcrPool::DEFAULT_WORKERS,
            downscale: true,
        }
    }
}

/// Capture-related settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Display index to capture; `None` picks the first available display
    pub display: Option<usize>,
}

/// Troubleshooting settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugSettings {
    /// Save processed fragment images next to each solve cycle
    pub dump_fragments: bool,
    /// Where to write fragment dumps; `None` uses the data directory
    pub dump_dir: Option<PathBuf>,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get the application configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "breachsolve", "BreachSolve")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Get the application data directory (fragment dumps land here by default)
pub fn get_data_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "breachsolve", "BreachSolve")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.ocr.backend, OcrBackend::Pooled);
        assert_eq!(config.ocr.language, "breach");
        assert_eq!(config.ocr.workers, 2);
        assert!(config.ocr.downscale);

        assert!(config.capture.display.is_none());
        assert!(!config.debug.dump_fragments);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.ocr.backend, parsed.ocr.backend);
        assert_eq!(config.ocr.workers, parsed.ocr.workers);
        assert_eq!(config.ocr.downscale, parsed.ocr.downscale);
        assert_eq!(config.capture.display, parsed.capture.display);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.ocr.backend = OcrBackend::External;
        config.ocr.workers = 4;
        config.capture.display = Some(1);

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.ocr.backend, OcrBackend::External);
        assert_eq!(parsed.ocr.workers, 4);
        assert_eq!(parsed.capture.display, Some(1));
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config.ocr.language, loaded.ocr.language);
        assert_eq!(config.ocr.tessdata_dir, loaded.ocr.tessdata_dir);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
